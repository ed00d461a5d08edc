//! Adaptive resampling of smoothed vertices into line segments.

use crate::brush::Brush;
use crate::elements::{LineSegment, Pan, sanitize_force};
use kurbo::Point;

/// Thins smoothed vertices by the brush's step distance and interpolates
/// force across them.
#[derive(Debug, Clone, Default)]
pub struct StrokeSampler {
    last: Option<Pan>,
}

impl StrokeSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sampler with the first point of a stroke.
    pub fn begin(&mut self, anchor: Pan) {
        self.last = Some(anchor);
    }

    /// Forget the last sampled point so the next stroke starts fresh.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_sampled(&self) -> Option<Pan> {
        self.last
    }

    /// Sample one batch of vertices.
    ///
    /// The first vertex is treated as already sampled. When `is_end` is set
    /// the final vertex is always emitted so the stroke reaches its end.
    pub fn sample(&mut self, vertices: &[Point], force: f64, brush: &Brush, is_end: bool) -> Vec<LineSegment> {
        if vertices.len() < 2 {
            return Vec::new();
        }
        let force = sanitize_force(force);
        let mut last = self.last.unwrap_or_else(|| Pan::new(vertices[0], force));
        let base_force = last.force;
        let delta_force = (force - base_force) / vertices.len() as f64;
        let final_vertex = vertices.len() - 1;

        let mut segments = Vec::new();
        for (i, &vertex) in vertices.iter().enumerate().skip(1) {
            let emit = (is_end && i == final_vertex)
                || brush.samples_every_vertex()
                || last.point.distance(vertex) >= brush.point_step;
            if emit {
                let pan = Pan::new(vertex, base_force + delta_force * i as f64);
                segments.push(brush.make_segment(last, pan));
                last = pan;
            }
        }
        self.last = Some(last);
        segments
    }
}
