//! Image format detection and decoding.
//!
//! Sources are decoded by an ordered chain of [`SourceDecoder`]s. The first
//! decoder that produces an image wins:
//!
//! 1. the declared `Content-Type`
//! 2. magic-byte detection for the common raster formats
//! 3. WebP, which the generic step does not cover
//! 4. the extension of the URL path
//!
//! If every decoder declines, the result is [`ArtworkError::Decode`].

use crate::error::ArtworkError;
use crate::provider::Download;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, trace};

/// Raster formats accepted as sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl SourceFormat {
    /// Format from a file extension or MIME subtype fragment.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Format implied by a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("jpeg") || ct.contains("jpg") {
            Some(Self::Jpeg)
        } else if ct.contains("png") {
            Some(Self::Png)
        } else if ct.contains("gif") {
            Some(Self::Gif)
        } else if ct.contains("webp") {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// Corresponding `image` crate format.
    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::Webp => ImageFormat::WebP,
        }
    }

    /// Format the image is re-encoded in. WebP is normalized to PNG.
    pub fn storage_format(&self) -> SourceFormat {
        match self {
            Self::Webp => Self::Png,
            other => *other,
        }
    }

    /// Extension used when storing an image of this format.
    pub fn storage_extension(&self) -> &'static str {
        match self.storage_format() {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "png",
        }
    }
}

/// A decoded source image with its detected format.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: SourceFormat,
}

/// One step in the decoding chain.
pub trait SourceDecoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Attempts to decode the source. `None` passes to the next decoder.
    fn decode(&self, source: &Download) -> Option<DecodedImage>;
}

fn decode_as(body: &[u8], format: SourceFormat) -> Option<DecodedImage> {
    image::load_from_memory_with_format(body, format.image_format())
        .ok()
        .map(|image| DecodedImage { image, format })
}

/// Trusts the transport-declared content type.
pub struct ContentTypeDecoder;

impl SourceDecoder for ContentTypeDecoder {
    fn name(&self) -> &'static str {
        "content-type"
    }

    fn decode(&self, source: &Download) -> Option<DecodedImage> {
        let format = SourceFormat::from_content_type(source.content_type.as_deref()?)?;
        decode_as(&source.body, format)
    }
}

/// Detects JPEG, PNG or GIF from magic bytes.
pub struct GenericDecoder;

impl SourceDecoder for GenericDecoder {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn decode(&self, source: &Download) -> Option<DecodedImage> {
        let format = match image::guess_format(&source.body).ok()? {
            ImageFormat::Jpeg => SourceFormat::Jpeg,
            ImageFormat::Png => SourceFormat::Png,
            ImageFormat::Gif => SourceFormat::Gif,
            _ => return None,
        };
        decode_as(&source.body, format)
    }
}

/// Decodes the body as WebP regardless of headers.
pub struct WebpDecoder;

impl SourceDecoder for WebpDecoder {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn decode(&self, source: &Download) -> Option<DecodedImage> {
        decode_as(&source.body, SourceFormat::Webp)
    }
}

/// Guesses the format from the URL path's extension.
pub struct ExtensionDecoder;

impl ExtensionDecoder {
    fn extension(url: &str) -> Option<String> {
        let path = match reqwest::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
        };
        let file = path.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        Some(ext.to_string())
    }
}

impl SourceDecoder for ExtensionDecoder {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn decode(&self, source: &Download) -> Option<DecodedImage> {
        let format = SourceFormat::from_extension(&Self::extension(&source.url)?)?;
        decode_as(&source.body, format)
    }
}

/// Priority-ordered list of decoders.
pub struct DecoderChain {
    decoders: Vec<Box<dyn SourceDecoder>>,
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ContentTypeDecoder),
            Box::new(GenericDecoder),
            Box::new(WebpDecoder),
            Box::new(ExtensionDecoder),
        ])
    }
}

impl DecoderChain {
    /// Creates a chain from decoders in priority order.
    pub fn new(decoders: Vec<Box<dyn SourceDecoder>>) -> Self {
        Self { decoders }
    }

    /// Names of the decoders in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Decodes `source` with the first decoder that succeeds.
    pub fn decode(&self, source: &Download) -> Result<DecodedImage, ArtworkError> {
        for decoder in &self.decoders {
            trace!(url = %source.url, decoder = decoder.name(), "Trying decoder");
            if let Some(decoded) = decoder.decode(source) {
                debug!(
                    url = %source.url,
                    decoder = decoder.name(),
                    format = ?decoded.format,
                    width = decoded.image.width(),
                    height = decoded.image.height(),
                    "Decoded source image"
                );
                return Ok(decoded);
            }
        }
        Err(ArtworkError::Decode {
            url: source.url.clone(),
        })
    }
}
