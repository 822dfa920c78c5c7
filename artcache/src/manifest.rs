//! HLS master playlist rendition selection.
//!
//! A master playlist announces each rendition with an `#EXT-X-STREAM-INF`
//! line followed by the rendition's URI. The selector picks the widest
//! rendition that an H.264 decoder can consume and resolves its URI against
//! the playlist URL.
//!
//! # Example
//!
//! ```
//! use artcache::manifest::{select_rendition, SelectionPolicy};
//!
//! let playlist = "\
//! #EXTM3U
//! #EXT-X-STREAM-INF:BANDWIDTH=800000,CODECS=\"avc1.64001f\",RESOLUTION=480x480
//! v480/index.m3u8
//! #EXT-X-STREAM-INF:BANDWIDTH=900000,CODECS=\"hvc1.2.4.L123\",RESOLUTION=720x720
//! v720/index.m3u8
//! ";
//!
//! let url = select_rendition(
//!     playlist,
//!     "https://video.apple.com/a/master.m3u8",
//!     &SelectionPolicy::default(),
//! )
//! .unwrap();
//! assert_eq!(url, "https://video.apple.com/a/v480/index.m3u8");
//! ```

use crate::error::ArtworkError;
use crate::provider::{AsyncHttpClient, Downloader};
use tracing::{debug, instrument};

/// Tag that starts a rendition's metadata line.
pub const STREAM_INF_PREFIX: &str = "#EXT-X-STREAM-INF:";

/// Default minimum rendition width in pixels.
pub const DEFAULT_MIN_WIDTH: u32 = 450;

/// Codec tag a rendition must carry.
pub const REQUIRED_CODEC: &str = "avc1";

/// Codec tag that disqualifies a rendition.
pub const EXCLUDED_CODEC: &str = "hvc1";

/// One parsed `#EXT-X-STREAM-INF` line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendition {
    pub average_bandwidth: u64,
    pub bandwidth: u64,
    pub codecs: String,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

impl Rendition {
    /// Parses the attribute list of a stream-info line.
    ///
    /// Accepts the line with or without the `#EXT-X-STREAM-INF:` prefix.
    /// Attributes that are not `KEY=VALUE`, or whose value does not parse,
    /// are skipped individually.
    pub fn parse(line: &str) -> Self {
        let attrs = line.strip_prefix(STREAM_INF_PREFIX).unwrap_or(line);
        let mut rendition = Self::default();

        for part in split_attributes(attrs) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "AVERAGE-BANDWIDTH" => {
                    if let Ok(v) = value.parse() {
                        rendition.average_bandwidth = v;
                    }
                }
                "BANDWIDTH" => {
                    if let Ok(v) = value.parse() {
                        rendition.bandwidth = v;
                    }
                }
                "CODECS" => rendition.codecs = value.to_string(),
                "FRAME-RATE" => {
                    if let Ok(v) = value.parse() {
                        rendition.frame_rate = v;
                    }
                }
                "RESOLUTION" => {
                    if let Some((w, h)) = value.split_once('x') {
                        if let (Ok(w), Ok(h)) = (w.trim().parse(), h.trim().parse()) {
                            rendition.width = w;
                            rendition.height = h;
                        }
                    }
                }
                _ => {}
            }
        }

        rendition
    }
}

/// Splits an attribute list on commas outside double quotes.
fn split_attributes(attrs: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in attrs.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&attrs[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&attrs[start..]);
    parts
}

/// Admissibility rules for renditions.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    min_width: u32,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
        }
    }
}

impl SelectionPolicy {
    /// Creates a policy with the given minimum width.
    pub fn new(min_width: u32) -> Self {
        Self { min_width }
    }

    pub fn min_width(&self) -> u32 {
        self.min_width
    }

    /// Returns true if the rendition can be transcoded.
    pub fn is_admissible(&self, rendition: &Rendition) -> bool {
        !rendition.codecs.contains(EXCLUDED_CODEC)
            && rendition.codecs.contains(REQUIRED_CODEC)
            && rendition.width >= self.min_width
    }
}

/// Selects the best rendition from playlist text and resolves its URI.
///
/// Single forward pass: a rendition replaces the current choice only if it
/// is admissible and strictly wider, so the earliest of equally wide
/// renditions wins. The URI is the first non-blank, non-tag line after the
/// stream-info line.
pub fn select_rendition(
    playlist: &str,
    manifest_url: &str,
    policy: &SelectionPolicy,
) -> Result<String, ArtworkError> {
    let mut best_width = 0u32;
    let mut best_uri: Option<&str> = None;
    let mut awaiting_uri = false;

    for line in playlist.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(STREAM_INF_PREFIX) {
            let rendition = Rendition::parse(line);
            awaiting_uri = policy.is_admissible(&rendition) && rendition.width > best_width;
            if awaiting_uri {
                best_width = rendition.width;
            }
        } else if line.starts_with('#') {
            continue;
        } else if awaiting_uri {
            best_uri = Some(line);
            awaiting_uri = false;
        }
    }

    let uri = best_uri.ok_or_else(|| ArtworkError::NoSuitableRendition {
        url: manifest_url.to_string(),
    })?;

    debug!(width = best_width, uri = uri, "Selected rendition");
    Ok(resolve_url(manifest_url, uri))
}

/// Resolves `reference` against `base`, falling back to `reference` as-is
/// when either side does not parse.
pub fn resolve_url(base: &str, reference: &str) -> String {
    match reqwest::Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(url) => url.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Fetches a master playlist and selects the best rendition.
pub struct StreamSelector<'a, C> {
    downloader: &'a Downloader<C>,
    policy: &'a SelectionPolicy,
}

impl<'a, C: AsyncHttpClient> StreamSelector<'a, C> {
    pub fn new(downloader: &'a Downloader<C>, policy: &'a SelectionPolicy) -> Self {
        Self { downloader, policy }
    }

    /// Fetches `manifest_url` and returns the resolved URL of its best rendition.
    #[instrument(skip(self))]
    pub async fn select_best_rendition(&self, manifest_url: &str) -> Result<String, ArtworkError> {
        let playlist = self.downloader.fetch_text(manifest_url).await?;
        select_rendition(&playlist, manifest_url, self.policy)
    }
}
