//! Content-addressed storage for generated artifacts.
//!
//! One directory per artifact class, files named `{key}.{ext}`, writes
//! staged through `{key}_temp.{ext}` and promoted by rename.

mod disk;
mod path;
mod types;

pub use disk::ArtifactStore;
pub use path::{artifact_path, class_directory, is_temp_file_name, temp_path, TEMP_SUFFIX};
pub use types::{
    content_type_for_extension, ArtifactClass, ArtifactLocation, ClassStats, ClipFormat,
    StoreError,
};
