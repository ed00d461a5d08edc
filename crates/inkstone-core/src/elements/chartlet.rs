//! Chartlets: bitmaps stamped onto the canvas.

use crate::texture::TextureId;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A single bitmap placed at a point with a size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chartlet {
    pub(crate) index: u64,
    /// Center of the stamped bitmap.
    pub center: Point,
    /// Display size.
    pub size: Size,
    /// Texture holding the bitmap content.
    pub texture: TextureId,
}

impl Chartlet {
    pub fn new(index: u64, center: Point, size: Size, texture: TextureId) -> Self {
        Self {
            index,
            center,
            size,
            texture,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.center, self.size)
    }
}
