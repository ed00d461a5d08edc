//! Drawable elements stored in a document.

mod chartlet;
mod stroke;

pub use chartlet::Chartlet;
pub use stroke::StrokeBatch;

use crate::texture::TextureId;
use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Force used when the input device does not report pressure.
pub const NEUTRAL_FORCE: f64 = 1.0;

/// Clamp a reported force into `[0, 1]`, mapping non-finite values to [`NEUTRAL_FORCE`].
pub fn sanitize_force(force: f64) -> f64 {
    if force.is_finite() {
        force.clamp(0.0, 1.0)
    } else {
        NEUTRAL_FORCE
    }
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Get the color with an opacity multiplier applied to its alpha.
    pub fn with_opacity(self, opacity: f64) -> Color {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Color::from_rgba8(self.r, self.g, self.b, alpha)
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How a segment is composited onto what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Erase whatever the segment covers.
    Clear,
}

/// A point together with the force applied at it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pan {
    pub point: Point,
    pub force: f64,
}

impl Pan {
    pub fn new(point: Point, force: f64) -> Self {
        Self {
            point,
            force: sanitize_force(force),
        }
    }
}

/// One renderable piece of a stroke, produced per sample step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Pan,
    pub end: Pan,
    pub width: f64,
    pub color: SerializableColor,
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureId>,
    #[serde(default)]
    pub blend: BlendMode,
}

impl LineSegment {
    /// Distance between the two endpoints.
    pub fn length(&self) -> f64 {
        self.start.point.distance(self.end.point)
    }

    /// Segment color with its opacity folded into alpha.
    pub fn paint(&self) -> Color {
        self.color.with_opacity(self.opacity)
    }
}

/// Enum wrapper for everything a document can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Stroke(StrokeBatch),
    Chartlet(Chartlet),
}

impl Element {
    /// Creation counter used to restore draw order.
    pub fn index(&self) -> u64 {
        match self {
            Element::Stroke(s) => s.index(),
            Element::Chartlet(c) => c.index(),
        }
    }

    pub fn as_stroke(&self) -> Option<&StrokeBatch> {
        match self {
            Element::Stroke(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_chartlet(&self) -> Option<&Chartlet> {
        match self {
            Element::Chartlet(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_chartlet(&self) -> bool {
        matches!(self, Element::Chartlet(_))
    }
}
