//! Native-document MIME types and their export formats.

pub const FOLDER: &str = "application/vnd.google-apps.folder";

pub const NATIVE_DOCUMENT: &str = "application/vnd.google-apps.document";
pub const NATIVE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const NATIVE_PRESENTATION: &str = "application/vnd.google-apps.presentation";
pub const NATIVE_DRAWING: &str = "application/vnd.google-apps.drawing";

pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const PDF: &str = "application/pdf";

/// Target format for a native document, paired with the file extension it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Export format for `mime_type`, or `None` when the file downloads as-is.
pub fn export_format(mime_type: &str) -> Option<ExportFormat> {
    let (mime_type, extension) = match mime_type {
        NATIVE_DOCUMENT => (DOCX, "docx"),
        NATIVE_SPREADSHEET => (XLSX, "xlsx"),
        NATIVE_PRESENTATION => (PPTX, "pptx"),
        NATIVE_DRAWING => (PDF, "pdf"),
        _ => return None,
    };
    Some(ExportFormat { mime_type, extension })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_mapping() {
        assert_eq!(export_format(NATIVE_DOCUMENT).map(|f| f.extension), Some("docx"));
        assert_eq!(export_format(NATIVE_SPREADSHEET).map(|f| f.mime_type), Some(XLSX));
        assert_eq!(export_format(NATIVE_PRESENTATION).map(|f| f.extension), Some("pptx"));
        assert_eq!(export_format(NATIVE_DRAWING).map(|f| f.mime_type), Some(PDF));
    }

    #[test]
    fn test_ordinary_and_other_native_types_are_not_exported() {
        assert!(export_format("image/jpeg").is_none());
        assert!(export_format(FOLDER).is_none());
        assert!(export_format("application/vnd.google-apps.form").is_none());
    }
}
