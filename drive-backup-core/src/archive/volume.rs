//! Size-bounded ZIP volumes.
//!
//! A [`VolumeWriter`] owns at most one open volume at a time. Before each
//! entry the caller asks [`VolumeWriter::needs_rollover`] with the file's
//! declared size; when the entry would push the running uncompressed total
//! over the ceiling, the open volume is finalized and the next one started.

use crate::config::ArchiveConfig;
use crate::utils::errors::Result;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::progress::format_bytes;

#[derive(Debug, Clone, Copy)]
pub struct VolumeSettings {
    /// Uncompressed byte ceiling per volume
    pub size_limit: u64,
    pub compression_level: i32,
    /// Declared size assumed for files whose size is unknown
    pub unknown_size_placeholder: u64,
}

impl From<&ArchiveConfig> for VolumeSettings {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            size_limit: config.volume_size_limit,
            compression_level: config.compression_level,
            unknown_size_placeholder: config.unknown_size_placeholder,
        }
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

/// `drive_backup_NNN.zip`, 1-based and zero-padded to three digits.
pub fn volume_file_name(index: usize) -> String {
    format!("drive_backup_{:03}.zip", index)
}

/// Rollover rule: start a volume when none is open or when `declared` bytes
/// would take the running total past `limit`.
pub fn needs_new_volume(open: bool, running_total: u64, declared: u64, limit: u64) -> bool {
    !open || running_total.saturating_add(declared) > limit
}

/// Statistics of a finalized volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedVolume {
    pub name: String,
    pub entries: usize,
    /// Uncompressed bytes written
    pub bytes: u64,
}

struct OpenVolume {
    name: String,
    path: PathBuf,
    writer: ZipWriter<File>,
    bytes: u64,
    entries: usize,
    names: HashSet<String>,
}

pub struct VolumeWriter {
    dir: PathBuf,
    settings: VolumeSettings,
    next_index: usize,
    current: Option<OpenVolume>,
    closed: Vec<ClosedVolume>,
}

impl VolumeWriter {
    /// Volumes are created inside `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>, settings: VolumeSettings) -> Self {
        Self {
            dir: dir.into(),
            settings,
            next_index: 1,
            current: None,
            closed: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Uncompressed bytes written to the open volume.
    fn running_total(&self) -> u64 {
        self.current.as_ref().map_or(0, |v| v.bytes)
    }

    pub fn needs_rollover(&self, declared_size: Option<u64>) -> bool {
        // A zero size is reported for some files the provider cannot measure
        let declared = declared_size
            .filter(|size| *size > 0)
            .unwrap_or(self.settings.unknown_size_placeholder);
        needs_new_volume(self.is_open(), self.running_total(), declared, self.settings.size_limit)
    }

    /// Finalize the open volume (if any) and open the next one. Returns its file name.
    pub fn roll_over(&mut self) -> Result<String> {
        self.close_current()?;
        let volume = self.open_next()?;
        let name = volume.name.clone();
        self.current = Some(volume);
        Ok(name)
    }

    /// Write `content` as one deflated entry of the open volume, opening the
    /// first volume if needed. Returns the entry name actually used, which
    /// differs from `name` when the volume already holds an entry by that name.
    pub fn add_entry(&mut self, name: &str, content: &[u8]) -> Result<String> {
        let mut volume = match self.current.take() {
            Some(volume) => volume,
            None => self.open_next()?,
        };
        let result = self.write_entry(&mut volume, name, content);
        self.current = Some(volume);
        result
    }

    fn write_entry(&self, volume: &mut OpenVolume, name: &str, content: &[u8]) -> Result<String> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.settings.compression_level))
            .large_file(content.len() as u64 >= u32::MAX as u64);

        let entry_name = unique_entry_name(&volume.names, name);
        volume.writer.start_file(entry_name.as_str(), options)?;
        volume.writer.write_all(content)?;

        volume.names.insert(entry_name.clone());
        volume.bytes += content.len() as u64;
        volume.entries += 1;

        debug!(volume = %volume.name, entry = %entry_name, bytes = content.len(), "Added entry");
        Ok(entry_name)
    }

    fn open_next(&mut self) -> Result<OpenVolume> {
        let name = volume_file_name(self.next_index);
        let path = self.dir.join(&name);
        let file = File::create(&path)?;
        self.next_index += 1;

        info!(volume = %name, "Created new volume");
        Ok(OpenVolume {
            name,
            path,
            writer: ZipWriter::new(file),
            bytes: 0,
            entries: 0,
            names: HashSet::new(),
        })
    }

    /// Finalize the open volume. Safe to call repeatedly.
    pub fn finish(&mut self) -> Result<()> {
        self.close_current()
    }

    /// Volumes finalized so far, in creation order.
    pub fn closed_volumes(&self) -> &[ClosedVolume] {
        &self.closed
    }

    fn close_current(&mut self) -> Result<()> {
        let Some(mut volume) = self.current.take() else {
            return Ok(());
        };

        let file = volume.writer.finish()?;
        file.sync_all()?;

        info!(
            volume = %volume.name,
            entries = volume.entries,
            size = %format_bytes(volume.bytes),
            path = %volume.path.display(),
            "Closed volume"
        );
        self.closed.push(ClosedVolume {
            name: volume.name,
            entries: volume.entries,
            bytes: volume.bytes,
        });
        Ok(())
    }
}

/// `name`, or `stem (n).ext` with the smallest free `n`.
fn unique_entry_name(taken: &HashSet<String>, name: &str) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    (1..)
        .map(|n| format!("{} ({}){}", stem, n, ext))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
