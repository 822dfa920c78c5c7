//! Artifact path construction and filename handling.

use super::types::ArtifactClass;
use crate::key::CacheKey;
use std::path::{Path, PathBuf};

/// Suffix appended to the key for in-progress writes.
pub const TEMP_SUFFIX: &str = "_temp";

/// Construct the final path for a committed artifact.
///
/// ```text
/// <root>/<class dir>/<key>.<ext>
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use artcache::key::derive_key;
/// use artcache::store::{artifact_path, ArtifactClass};
///
/// let key = derive_key("");
/// let path = artifact_path(&PathBuf::from("/cache"), ArtifactClass::CompositeSquare, &key, "jpg");
///
/// assert_eq!(
///     path,
///     PathBuf::from("/cache/artist-squares/d41d8cd98f00b204e9800998ecf8427e.jpg")
/// );
/// ```
pub fn artifact_path(root: &Path, class: ArtifactClass, key: &CacheKey, ext: &str) -> PathBuf {
    class_directory(root, class).join(format!("{}.{}", key, ext))
}

/// Construct the temporary path used while an artifact is being written.
///
/// Lives in the same directory as the final path so the promoting rename
/// never crosses a filesystem boundary.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use artcache::key::derive_key;
/// use artcache::store::{temp_path, ArtifactClass};
///
/// let key = derive_key("");
/// let path = temp_path(&PathBuf::from("/cache"), ArtifactClass::AnimatedClip, &key, "gif");
///
/// assert_eq!(
///     path,
///     PathBuf::from("/cache/animated-art/d41d8cd98f00b204e9800998ecf8427e_temp.gif")
/// );
/// ```
pub fn temp_path(root: &Path, class: ArtifactClass, key: &CacheKey, ext: &str) -> PathBuf {
    class_directory(root, class).join(format!("{}{}.{}", key, TEMP_SUFFIX, ext))
}

/// Directory holding all artifacts of a class.
pub fn class_directory(root: &Path, class: ArtifactClass) -> PathBuf {
    root.join(class.directory_name())
}

/// Returns true if `file_name` names an in-progress temporary file.
pub fn is_temp_file_name(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => stem.ends_with(TEMP_SUFFIX),
        None => file_name.ends_with(TEMP_SUFFIX),
    }
}
