//! Core types for the artifact store.

use crate::key::CacheKey;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Kind of derived artifact. Each class lives in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactClass {
    /// Looping animation transcoded from an HLS stream
    AnimatedClip,
    /// 500×500 JPEG mosaic of 2-4 images
    CompositeSquare,
    /// 1024×1024 copy of a single image in its original format
    ResizedCopy,
}

impl ArtifactClass {
    /// All classes, in directory bootstrap order.
    pub const ALL: [ArtifactClass; 3] = [
        ArtifactClass::AnimatedClip,
        ArtifactClass::CompositeSquare,
        ArtifactClass::ResizedCopy,
    ];

    /// Directory name under the store root.
    pub fn directory_name(&self) -> &'static str {
        match self {
            ArtifactClass::AnimatedClip => "animated-art",
            ArtifactClass::CompositeSquare => "artist-squares",
            ArtifactClass::ResizedCopy => "icloud-art",
        }
    }

    /// Allowed file extensions, in lookup priority order.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ArtifactClass::AnimatedClip => &["gif", "webp"],
            ArtifactClass::CompositeSquare => &["jpg"],
            ArtifactClass::ResizedCopy => &["jpg", "jpeg", "png", "gif"],
        }
    }

    /// Returns true if `ext` may be stored for this class.
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.extensions().contains(&ext)
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactClass::AnimatedClip => "animated_clip",
            ArtifactClass::CompositeSquare => "composite_square",
            ArtifactClass::ResizedCopy => "resized_copy",
        };
        f.write_str(name)
    }
}

/// Output container for animated clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipFormat {
    #[default]
    Gif,
    Webp,
}

impl ClipFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ClipFormat::Gif => "gif",
            ClipFormat::Webp => "webp",
        }
    }
}

impl FromStr for ClipFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gif" => Ok(ClipFormat::Gif),
            "webp" => Ok(ClipFormat::Webp),
            other => Err(format!("unknown clip format '{}'", other)),
        }
    }
}

/// Where a committed artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub key: CacheKey,
    pub class: ArtifactClass,
    pub extension: String,
    pub path: PathBuf,
}

impl ArtifactLocation {
    /// File name (`{key}.{ext}`).
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.key, self.extension)
    }

    /// MIME type matching the extension.
    pub fn content_type(&self) -> &'static str {
        content_type_for_extension(&self.extension)
    }
}

/// Maps a stored extension to the MIME type it is served with.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Per-class file statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub class: ArtifactClass,
    pub files: u64,
    pub bytes: u64,
}

/// Store-related errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No committed artifact for the key
    #[error("No {class} artifact for key {key}")]
    NotFound { key: CacheKey, class: ArtifactClass },

    /// I/O error during store operations
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
