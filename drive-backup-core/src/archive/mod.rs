//! ZIP volume output: entry naming and size-bounded volume rotation.

pub mod sanitize;
pub mod volume;

pub use sanitize::sanitize;
pub use volume::{volume_file_name, VolumeSettings, VolumeWriter};
