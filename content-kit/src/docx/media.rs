use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::model::ImageSource;
use crate::error::{DocxError, Result};

/// EMU per pixel at 96 DPI.
const EMU_PER_PIXEL: u64 = 9525;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    pub(crate) fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Gif => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub(crate) fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
        }
    }

    pub(crate) const ALL: [ImageKind; 3] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::Gif];
}

/// Decoded image bytes ready to be stored under `word/media/`.
#[derive(Debug, Clone)]
pub(crate) struct EmbeddedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) kind: ImageKind,
    pub(crate) width_px: u32,
    pub(crate) height_px: u32,
}

impl EmbeddedImage {
    /// Extent in EMU, scaled down to fit `max_cx` x `max_cy` with the aspect ratio kept.
    pub(crate) fn extent(&self, max_cx: u64, max_cy: u64) -> (u64, u64) {
        let cx = u64::from(self.width_px.max(1)) * EMU_PER_PIXEL;
        let cy = u64::from(self.height_px.max(1)) * EMU_PER_PIXEL;

        // Compare cx/cy against the box without floating point.
        if cx <= max_cx && cy <= max_cy {
            return (cx, cy);
        }
        if cx * max_cy >= cy * max_cx {
            (max_cx, (cy * max_cx / cx).max(1))
        } else {
            ((cx * max_cy / cy).max(1), max_cy)
        }
    }
}

/// Splits `data:image/png;base64,....` into its mime type and payload.
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.trim().strip_prefix("data:") else {
        return (None, data.trim());
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            (mime, payload)
        }
        None => (None, rest),
    }
}

/// Decodes an inline image source; remote sources must be resolved by the caller first.
pub(crate) fn decode_image(source: &ImageSource) -> Result<EmbeddedImage> {
    let (data, declared_mime) = match source {
        ImageSource::Inline { data, mime_type } => (data.as_str(), mime_type.as_deref()),
        ImageSource::Remote { url } => {
            return Err(DocxError::Image(format!("remote image not resolved: {}", url)));
        }
    };

    let (url_mime, payload) = split_data_url(data);
    if let Some(mime) = url_mime.or(declared_mime) {
        if ImageKind::from_mime(mime).is_none() {
            return Err(DocxError::Image(format!("unsupported mime type {}", mime)));
        }
    }

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| DocxError::Image(format!("invalid base64: {}", e)))?;

    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| DocxError::Image(format!("unreadable image: {}", e)))?;
    let kind = reader
        .format()
        .and_then(ImageKind::from_format)
        .ok_or_else(|| DocxError::Image("unsupported or unrecognised image format".to_string()))?;
    let (width_px, height_px) = reader
        .into_dimensions()
        .map_err(|e| DocxError::Image(format!("undecodable image: {}", e)))?;

    Ok(EmbeddedImage {
        bytes,
        kind,
        width_px,
        height_px,
    })
}
