//! Texture identifiers and the texture store the canvas draws from.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier binding a brush or chartlet to bitmap content.
pub type TextureId = Uuid;

/// Texture errors.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Texture store error: {0}")]
    Other(String),
}

/// Result type for texture operations.
pub type TextureResult<T> = Result<T, TextureError>;

/// Bitmap encodings the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Sniff the encoding from the leading bytes of a file.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG";
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

        match data {
            d if d.len() < 4 => None,
            d if d.starts_with(PNG) => Some(ImageFormat::Png),
            d if d.starts_with(JPEG) => Some(ImageFormat::Jpeg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

/// A registered texture: decoded dimensions plus the original bytes.
#[derive(Debug, Clone)]
pub struct Texture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    data: Arc<[u8]>,
}

impl Texture {
    /// The encoded bytes the texture was created from.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Holds bitmap content on behalf of the canvas.
///
/// Shared between the owning thread and import workers, hence `Send + Sync`.
pub trait TextureStore: Send + Sync {
    /// Register image bytes.
    ///
    /// If `id` is given and already registered, the existing texture is
    /// returned and the bytes are ignored.
    fn make_texture(&self, data: &[u8], id: Option<TextureId>) -> TextureResult<Texture>;

    /// Find a texture by ID.
    fn find_texture(&self, id: TextureId) -> Option<Texture>;

    /// Check if a texture is registered.
    fn contains(&self, id: TextureId) -> bool {
        self.find_texture(id).is_some()
    }
}

/// In-memory texture store that validates bitmaps by decoding them.
#[derive(Debug, Default)]
pub struct MemoryTextureStore {
    textures: RwLock<HashMap<TextureId, Texture>>,
}

impl MemoryTextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextureStore for MemoryTextureStore {
    fn make_texture(&self, data: &[u8], id: Option<TextureId>) -> TextureResult<Texture> {
        if let Some(existing) = id.and_then(|id| self.find_texture(id)) {
            log::debug!("Texture {} already registered", existing.id);
            return Ok(existing);
        }

        let format = ImageFormat::from_magic_bytes(data).ok_or(TextureError::UnknownFormat)?;
        let decoded = image::load_from_memory_with_format(data, format.into())
            .map_err(|e| TextureError::Decode(e.to_string()))?;

        let texture = Texture {
            id: id.unwrap_or_else(Uuid::new_v4),
            width: decoded.width(),
            height: decoded.height(),
            format,
            data: Arc::from(data),
        };

        let mut textures = self
            .textures
            .write()
            .map_err(|e| TextureError::Other(format!("Lock error: {}", e)))?;
        // Another thread may have registered the same ID while we decoded.
        let texture = textures.entry(texture.id).or_insert(texture).clone();
        log::debug!("Registered texture {} ({}x{})", texture.id, texture.width, texture.height);
        Ok(texture)
    }

    fn find_texture(&self, id: TextureId) -> Option<Texture> {
        self.textures.read().ok()?.get(&id).cloned()
    }
}

/// Encode a blank PNG for tests.
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::new(width, height);
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
