use std::fmt;
use std::sync::Arc;

use image::GenericImageView;

use crate::error::{PipelineError, Result};

/// Raster formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Png,
        MediaType::Jpeg,
        MediaType::Gif,
        MediaType::Bmp,
        MediaType::Tiff,
        MediaType::WebP,
    ];

    /// Parses a declared MIME type. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Ok(MediaType::Png),
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/gif" => Ok(MediaType::Gif),
            "image/bmp" => Ok(MediaType::Bmp),
            "image/tiff" => Ok(MediaType::Tiff),
            "image/webp" => Ok(MediaType::WebP),
            _ => Err(PipelineError::UnsupportedType {
                media_type: mime.trim().to_string(),
            }),
        }
    }

    /// Detects the type from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        infer::get(bytes).and_then(|kind| Self::from_mime(kind.mime_type()).ok())
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Gif => "image/gif",
            MediaType::Bmp => "image/bmp",
            MediaType::Tiff => "image/tiff",
            MediaType::WebP => "image/webp",
        }
    }

}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An uploaded image: bytes plus the media type the caller declared.
///
/// The byte buffer is shared, never mutated. Preprocessing produces a new asset.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    bytes: Arc<[u8]>,
    declared_type: String,
    name: Option<String>,
    dimensions: Option<(u32, u32)>,
}

impl ImageAsset {
    pub fn new(bytes: impl Into<Vec<u8>>, declared_type: impl Into<String>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            declared_type: declared_type.into(),
            name: None,
            dimensions: None,
        }
    }

    /// Attaches the original file name, used to name exported text.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Re-encoded output derived from `source`, keeping its file name.
    pub(crate) fn derived(
        source: &ImageAsset,
        bytes: Vec<u8>,
        media_type: MediaType,
        dimensions: (u32, u32),
    ) -> Self {
        Self {
            bytes: Arc::from(bytes),
            declared_type: media_type.mime().to_string(),
            name: source.name.clone(),
            dimensions: Some(dimensions),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Dimensions, if this asset was produced from decoded pixels.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn media_type(&self) -> Result<MediaType> {
        MediaType::from_mime(&self.declared_type)
    }

    /// Decodes the bytes, guessing the format from content rather than the
    /// declared type.
    pub fn decode(&self) -> Result<image::DynamicImage> {
        let reader = image::ImageReader::new(std::io::Cursor::new(self.bytes()))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(format!("Failed to read image: {e}")))?;
        reader
            .decode()
            .map_err(|e| PipelineError::Decode(format!("Failed to decode image: {e}")))
    }

    /// Width and height, decoding the image when they are not yet known.
    pub fn read_dimensions(&self) -> Result<(u32, u32)> {
        if let Some(dims) = self.dimensions {
            return Ok(dims);
        }
        Ok(self.decode()?.dimensions())
    }
}
