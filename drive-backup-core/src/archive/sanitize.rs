//! Archive-safe entry names.

use crate::drive::{mime, FileRecord};

/// Characters rejected by common filesystems and archive tools.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derive the entry name for `file`.
///
/// Invalid characters become `_`. Native documents get the extension of their
/// export format unless the name already carries it (case-insensitive).
pub fn sanitize(file: &FileRecord) -> String {
    let mut name: String = file
        .name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if name.is_empty() {
        name = file.id.replace(INVALID_CHARS, "_");
    }

    if let Some(format) = mime::export_format(&file.mime_type) {
        let suffix = format!(".{}", format.extension);
        if !name.to_lowercase().ends_with(&suffix) {
            name.push_str(&suffix);
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_gets_docx() {
        let file = FileRecord::new("1", "Report", mime::NATIVE_DOCUMENT);
        assert_eq!(sanitize(&file), "Report.docx");
    }

    #[test]
    fn test_existing_extension_is_kept_case_insensitive() {
        let file = FileRecord::new("1", "Budget.XLSX", mime::NATIVE_SPREADSHEET);
        assert_eq!(sanitize(&file), "Budget.XLSX");

        let file = FileRecord::new("2", "Deck.pptx", mime::NATIVE_PRESENTATION);
        assert_eq!(sanitize(&file), "Deck.pptx");
    }

    #[test]
    fn test_wrong_extension_gets_export_extension() {
        let file = FileRecord::new("1", "Diagram.png", mime::NATIVE_DRAWING);
        assert_eq!(sanitize(&file), "Diagram.png.pdf");
    }

    #[test]
    fn test_invalid_characters_replaced() {
        let file = FileRecord::new("1", r#"a<b>c:d"e/f\g|h?i*j.txt"#, "text/plain");
        assert_eq!(sanitize(&file), "a_b_c_d_e_f_g_h_i_j.txt");
    }

    #[test]
    fn test_clean_name_unchanged() {
        let file = FileRecord::new("1", "holiday photo (1).jpg", "image/jpeg");
        assert_eq!(sanitize(&file), "holiday photo (1).jpg");

        let doc = FileRecord::new("2", "Minutes.docx", mime::NATIVE_DOCUMENT);
        assert_eq!(sanitize(&doc), "Minutes.docx");
    }

    #[test]
    fn test_ordinary_file_gets_no_extension() {
        let file = FileRecord::new("1", "Makefile", "text/plain");
        assert_eq!(sanitize(&file), "Makefile");
    }

    #[test]
    fn test_empty_name_falls_back_to_id() {
        let file = FileRecord::new("1AbC", "", mime::NATIVE_DOCUMENT);
        assert_eq!(sanitize(&file), "1AbC.docx");
    }

    #[test]
    fn test_deterministic() {
        let file = FileRecord::new("1", "q?.csv", "text/csv");
        assert_eq!(sanitize(&file), sanitize(&file));
    }
}
