//! External video transcoding via ffmpeg.

use crate::error::ArtworkError;
use crate::store::ClipFormat;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Filter graph for GIF output: scale to 486px wide, then build and apply
/// a per-clip palette.
pub const GIF_FILTER: &str =
    "scale=486:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";

/// Filter graph for WebP output.
pub const WEBP_FILTER: &str = "scale=486:-1:flags=lanczos";

/// Default ffmpeg thread count.
pub const DEFAULT_TRANSCODE_THREADS: u32 = 8;

/// Turns a stream URL into an animated file on disk.
pub trait Transcoder: Send + Sync {
    /// Transcodes `source_url` into `output`.
    ///
    /// The output path's extension matches `format`. An `Ok` return does not
    /// guarantee a non-empty file; the store checks that on promotion.
    fn transcode(
        &self,
        source_url: &str,
        output: &Path,
        format: ClipFormat,
    ) -> impl Future<Output = Result<(), ArtworkError>> + Send;
}

/// [`Transcoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    threads: u32,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", DEFAULT_TRANSCODE_THREADS)
    }
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, threads: u32) -> Self {
        Self {
            binary: binary.into(),
            threads: threads.max(1),
        }
    }

    /// Returns true if the configured binary runs.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Builds the ffmpeg argument list.
    pub fn args(&self, source_url: &str, output: &Path, format: ClipFormat) -> Vec<String> {
        let filter = match format {
            ClipFormat::Gif => GIF_FILTER,
            ClipFormat::Webp => WEBP_FILTER,
        };
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "panic",
            "-y",
            "-multiple_requests",
            "1",
            "-i",
            source_url,
            "-vf",
            filter,
            "-loop",
            "0",
            "-threads",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.threads.to_string());
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source_url: &str,
        output: &Path,
        format: ClipFormat,
    ) -> Result<(), ArtworkError> {
        let args = self.args(source_url, output, format);
        debug!(binary = %self.binary.display(), args = ?args, "Running transcoder");

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ArtworkError::Transcode(format!(
                    "failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(status = %result.status, stderr = %stderr.trim(), "ffmpeg failed");
            return Err(ArtworkError::Transcode(format!(
                "ffmpeg exited with status {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Transcoder that writes fixed bytes after an optional delay.
    #[derive(Clone)]
    pub struct MockTranscoder {
        pub output: Vec<u8>,
        pub delay: Duration,
        pub fail: bool,
        pub calls: Arc<AtomicUsize>,
    }

    impl MockTranscoder {
        pub fn writing(output: &[u8]) -> Self {
            Self {
                output: output.to_vec(),
                delay: Duration::ZERO,
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::writing(b"")
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transcoder for MockTranscoder {
        async fn transcode(
            &self,
            _source_url: &str,
            output: &Path,
            _format: ClipFormat,
        ) -> Result<(), ArtworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ArtworkError::Transcode("mock failure".into()));
            }
            tokio::fs::write(output, &self.output)
                .await
                .map_err(|e| ArtworkError::Transcode(e.to_string()))
        }
    }

    #[test]
    fn test_gif_args() {
        let t = FfmpegTranscoder::default();
        let args = t.args(
            "https://a.apple.com/v480.m3u8",
            Path::new("/c/animated-art/k_temp.gif"),
            ClipFormat::Gif,
        );

        assert_eq!(args.first().map(String::as_str), Some("-hide_banner"));
        assert_eq!(args.last().map(String::as_str), Some("/c/animated-art/k_temp.gif"));
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-vf") + 1], GIF_FILTER);
        assert_eq!(args[pos("-loop") + 1], "0");
        assert_eq!(args[pos("-threads") + 1], "8");
        assert_eq!(args[pos("-loglevel") + 1], "panic");
        assert!(pos("-i") < pos("-vf"));
    }

    #[test]
    fn test_webp_uses_plain_scale() {
        let t = FfmpegTranscoder::new("ffmpeg", 2);
        let args = t.args("u", Path::new("o.webp"), ClipFormat::Webp);
        assert!(args.contains(&WEBP_FILTER.to_string()));
        assert!(args.contains(&"2".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_transcode_error() {
        let t = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary", 1);
        let dir = tempfile::TempDir::new().unwrap();
        let err = t
            .transcode("u", &dir.path().join("o.gif"), ClipFormat::Gif)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtworkError::Transcode(_)));
    }
}
