//! Stroke batches: the segments produced by one continuous gesture.

use super::LineSegment;
use crate::brush::{Brush, BrushId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Ordered segments drawn with a single brush.
///
/// Only the brush name is persisted. The live brush is re-linked by name
/// when a document is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    pub(crate) index: u64,
    /// Name of the brush the segments were drawn with.
    pub brush_name: Option<String>,
    /// Brush resolved for rendering; not persisted.
    #[serde(skip)]
    pub(crate) brush_id: Option<BrushId>,
    /// Segments in drawing order.
    pub segments: Vec<LineSegment>,
}

impl StrokeBatch {
    /// Create an empty batch bound to `brush`.
    pub fn new(index: u64, brush: &Brush) -> Self {
        Self {
            index,
            brush_name: brush.name.clone(),
            brush_id: Some(brush.id()),
            segments: Vec::new(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// The brush this batch is linked to, if any.
    pub fn brush_id(&self) -> Option<BrushId> {
        self.brush_id
    }

    pub(crate) fn link_brush(&mut self, id: BrushId) {
        self.brush_id = Some(id);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Bounding box of all segment endpoints, inflated by half the widest segment.
    pub fn bounds(&self) -> Rect {
        let mut points = self
            .segments
            .iter()
            .flat_map(|s| [s.start.point, s.end.point]);
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        let rect = points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p));
        let half_width = self
            .segments
            .iter()
            .map(|s| s.width / 2.0)
            .fold(0.0, f64::max);
        rect.inflate(half_width, half_width)
    }
}
