//! Brushes: named styles that turn pairs of weighted points into segments.

use crate::config::BrushConfig;
use crate::elements::{BlendMode, LineSegment, Pan, SerializableColor, sanitize_force};
use crate::texture::TextureId;
use kurbo::Point;
use peniko::Color;
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for brushes.
pub type BrushId = Uuid;

/// Name of the brush every canvas starts with.
pub const DEFAULT_BRUSH_NAME: &str = "inkstone.default";

/// Narrowest segment a brush will emit.
const MIN_SEGMENT_WIDTH: f64 = 0.01;

/// Specialized segment behaviour of a brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushKind {
    /// Paints with the brush color.
    #[default]
    Standard,
    /// Clears whatever its segments cover.
    Eraser,
}

impl BrushKind {
    fn blend(self) -> BlendMode {
        match self {
            BrushKind::Standard => BlendMode::Normal,
            BrushKind::Eraser => BlendMode::Clear,
        }
    }
}

/// A named drawing style.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub(crate) id: BrushId,
    /// Name used to re-link persisted strokes.
    pub name: Option<String>,
    /// Stamp texture, `None` for the built-in round tip.
    pub texture: Option<TextureId>,
    pub kind: BrushKind,
    /// Diameter of a segment at full force.
    pub point_size: f64,
    /// Minimum distance between sampled points; `<= 1` disables thinning.
    pub point_step: f64,
    pub color: SerializableColor,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Exponent applied to force when computing width; `0` ignores force.
    pub force_sensitivity: f64,
    /// Width factor used for taps.
    pub force_on_tap: f64,
}

impl Brush {
    /// Create a brush with default style.
    pub fn new(name: Option<String>, texture: Option<TextureId>) -> Self {
        Self::from_config(name, texture, &BrushConfig::default())
    }

    /// Create a brush styled from configuration.
    pub fn from_config(name: Option<String>, texture: Option<TextureId>, config: &BrushConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            texture,
            kind: BrushKind::Standard,
            point_size: positive_or(config.point_size, 1.0),
            point_step: positive_or(config.point_step, 1.0),
            color: config.color,
            opacity: unit_or(config.opacity, 1.0),
            force_sensitivity: positive_or(config.force_sensitivity, 0.0),
            force_on_tap: unit_or(config.force_on_tap, 1.0),
        }
    }

    pub fn id(&self) -> BrushId {
        self.id
    }

    pub fn with_kind(mut self, kind: BrushKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_point_size(mut self, point_size: f64) -> Self {
        self.point_size = positive_or(point_size, self.point_size);
        self
    }

    pub fn with_point_step(mut self, point_step: f64) -> Self {
        self.point_step = positive_or(point_step, self.point_step);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = unit_or(opacity, self.opacity);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_force_sensitivity(mut self, sensitivity: f64) -> Self {
        self.force_sensitivity = positive_or(sensitivity, 0.0);
        self
    }

    /// Whether every incoming vertex should become a segment.
    pub fn samples_every_vertex(&self) -> bool {
        self.point_step <= 1.0
    }

    /// Build the segment between two sampled points.
    pub fn make_segment(&self, from: Pan, to: Pan) -> LineSegment {
        let force = from.force * 0.95 + to.force * 0.05;
        self.segment(from, to, self.force_rate(force), self.opacity)
    }

    /// Build the segment for a single tap.
    ///
    /// Taps lack the overlap of consecutive stamps, so opacity is raised to
    /// match the density of a stroke drawn with this brush.
    pub fn make_tap_segment(&self, from: Point, to: Point) -> LineSegment {
        let from = Pan::new(from, self.force_on_tap);
        let to = Pan::new(to, self.force_on_tap);
        self.segment(from, to, self.force_on_tap, self.tap_opacity())
    }

    /// Opacity used for a tap.
    pub fn tap_opacity(&self) -> f64 {
        if self.point_size <= 0.0 {
            return self.opacity;
        }
        let overlap = ((self.point_size - self.point_step).max(0.0) / self.point_size).min(1.0);
        self.opacity + (1.0 - self.opacity) * overlap
    }

    fn force_rate(&self, force: f64) -> f64 {
        if self.force_sensitivity <= 0.0 {
            1.0
        } else {
            sanitize_force(force).powf(self.force_sensitivity)
        }
    }

    fn segment(&self, start: Pan, end: Pan, width_factor: f64, opacity: f64) -> LineSegment {
        LineSegment {
            start,
            end,
            width: (self.point_size * width_factor).max(MIN_SEGMENT_WIDTH),
            color: self.color,
            opacity,
            texture: self.texture,
            blend: self.kind.blend(),
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

fn unit_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// The brushes known to a canvas.
///
/// The default brush always exists and is not listed among the registered
/// brushes.
#[derive(Debug, Clone)]
pub struct BrushRegistry {
    default: Brush,
    brushes: Vec<Brush>,
    current: BrushId,
}

impl BrushRegistry {
    pub fn new(default: Brush) -> Self {
        let current = default.id;
        Self {
            default,
            brushes: Vec::new(),
            current,
        }
    }

    pub fn default_brush(&self) -> &Brush {
        &self.default
    }

    /// Registered brushes, in registration order.
    pub fn registered(&self) -> &[Brush] {
        &self.brushes
    }

    pub fn register(&mut self, brush: Brush) -> BrushId {
        let id = brush.id;
        log::debug!("Registered brush {:?} ({})", brush.name, id);
        self.brushes.push(brush);
        id
    }

    /// Get a brush by ID, including the default brush.
    pub fn get(&self, id: BrushId) -> Option<&Brush> {
        if id == self.default.id {
            return Some(&self.default);
        }
        self.brushes.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BrushId) -> Option<&mut Brush> {
        if id == self.default.id {
            return Some(&mut self.default);
        }
        self.brushes.iter_mut().find(|b| b.id == id)
    }

    /// Find a registered brush by name, falling back to the default brush.
    pub fn find_by_name(&self, name: Option<&str>) -> &Brush {
        name.and_then(|name| self.brushes.iter().find(|b| b.name.as_deref() == Some(name)))
            .unwrap_or(&self.default)
    }

    /// Brush for a stroke's link, falling back to the default brush.
    pub fn resolve(&self, id: Option<BrushId>) -> &Brush {
        id.and_then(|id| self.get(id)).unwrap_or(&self.default)
    }

    /// The brush used for new input.
    pub fn current(&self) -> &Brush {
        self.resolve(Some(self.current))
    }

    /// Make a known brush current. Returns false if the ID is unknown.
    pub fn set_current(&mut self, id: BrushId) -> bool {
        if self.get(id).is_some() {
            self.current = id;
            true
        } else {
            false
        }
    }

    /// Name-to-ID snapshot that can be moved to a background worker.
    pub fn lookup(&self) -> BrushLookup {
        let mut names = HashMap::new();
        for brush in std::iter::once(&self.default).chain(&self.brushes) {
            if let Some(name) = &brush.name {
                names.entry(name.clone()).or_insert(brush.id);
            }
        }
        BrushLookup {
            names,
            default: self.default.id,
        }
    }
}

/// Immutable snapshot of brush names, used to re-link loaded strokes.
#[derive(Debug, Clone)]
pub struct BrushLookup {
    names: HashMap<String, BrushId>,
    default: BrushId,
}

impl BrushLookup {
    /// Resolve a persisted brush name.
    ///
    /// Returns `Err` carrying the default brush when a name was given but no
    /// registered brush has it.
    pub fn resolve(&self, name: Option<&str>) -> Result<BrushId, BrushId> {
        match name {
            None => Ok(self.default),
            Some(name) => self.names.get(name).copied().ok_or(self.default),
        }
    }

    pub fn default_brush(&self) -> BrushId {
        self.default
    }
}
