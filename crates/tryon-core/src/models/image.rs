//! Image payloads and references.
//!
//! An [`ImageRef`] is what gets stored and passed around: either an inline
//! `data:` URL or a remote `http(s)` URL. [`ImageData`] is the decoded byte
//! payload handed to the generation capability.

use crate::error::{Result, TryOnError};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use url::Url;

/// Raw image bytes with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Wrap bytes, sniffing the MIME type from the content.
    pub fn sniff(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes)?;
        Ok(Self::new(format.to_mime_type(), bytes))
    }

    /// Read an image file, taking the MIME type from its extension or content.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| TryOnError::io_with_path(e, path))?;
        match ImageFormat::from_path(path) {
            Ok(format) => Ok(Self::new(format.to_mime_type(), bytes)),
            Err(_) => Self::sniff(bytes),
        }
    }

    /// Encode a PNG from an in-memory image.
    pub fn encode_png(image: &image::DynamicImage) -> Result<Self> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(Self::new("image/png", buf))
    }

    /// Decode the payload.
    pub fn decode(&self) -> Result<image::DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }

    /// Pixel dimensions (width, height).
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        Ok(self.decode()?.dimensions())
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| TryOnError::validation("image", "Invalid data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| TryOnError::validation("image", "Invalid data URL"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                TryOnError::validation("image", "Could not parse MIME type from data URL")
            })?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| TryOnError::validation("image", format!("Invalid base64 payload: {e}")))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Base64 payload without the data-URL header.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Hex SHA-256 of the bytes; used as a content-addressed cache key.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Cut a rectangle out of the image, producing a PNG.
    pub fn crop(&self, rect: CropRect) -> Result<Self> {
        let decoded = self.decode()?;
        let (width, height) = decoded.dimensions();
        if rect.width == 0 || rect.height == 0 {
            return Err(TryOnError::validation("crop", "Crop area must not be empty"));
        }
        let fits_x = rect.x.checked_add(rect.width).is_some_and(|r| r <= width);
        let fits_y = rect.y.checked_add(rect.height).is_some_and(|b| b <= height);
        if !fits_x || !fits_y {
            return Err(TryOnError::validation(
                "crop",
                format!("Crop area {rect:?} exceeds image bounds {width}x{height}"),
            ));
        }
        let cropped = decoded.crop_imm(rect.x, rect.y, rect.width, rect.height);
        Self::encode_png(&cropped)
    }
}

/// Pixel rectangle for [`ImageData::crop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Stored reference to an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

/// Where an [`ImageRef`] points.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Inline(ImageData),
    Remote(Url),
}

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Resolve the reference into inline bytes or a fetchable URL.
    pub fn source(&self) -> Result<ImageSource> {
        if self.is_inline() {
            return ImageData::from_data_url(&self.0).map(ImageSource::Inline);
        }
        let url = Url::parse(&self.0).map_err(|e| {
            TryOnError::validation("image", format!("Invalid image reference '{}': {e}", self.0))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(ImageSource::Remote(url)),
            other => Err(TryOnError::validation(
                "image",
                format!("Unsupported image reference scheme: {other}"),
            )),
        }
    }

    /// Inline payload, if this is a data URL.
    pub fn inline_data(&self) -> Result<Option<ImageData>> {
        if self.is_inline() {
            ImageData::from_data_url(&self.0).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl From<&ImageData> for ImageRef {
    fn from(data: &ImageData) -> Self {
        Self(data.to_data_url())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inline payloads are huge; show only the header
        match self.0.split_once(',') {
            Some((header, payload)) if self.is_inline() => {
                write!(f, "{header},<{} bytes>", payload.len())
            }
            _ => f.write_str(&self.0),
        }
    }
}
