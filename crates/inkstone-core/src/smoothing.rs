//! Incremental curve smoothing of raw pointer input.
//!
//! Raw points are kept in a three-point window. Every new point closes a
//! quadratic Bezier running from the midpoint of the previous pair to the
//! midpoint of the newest pair, controlled by the middle point. The curve is
//! then flattened into vertices spaced roughly `spacing` apart.

use kurbo::{ParamCurve, Point, QuadBez};
use std::collections::VecDeque;

/// Default distance between interpolated vertices.
pub const DEFAULT_BEZIER_SPACING: f64 = 5.0;

/// Raw points closer than this to the previous one are dropped.
pub const DEFAULT_MIN_POINT_DISTANCE: f64 = 1e-3;

/// Smallest accepted vertex spacing.
pub const MIN_BEZIER_SPACING: f64 = 0.1;

/// Upper bound on vertices produced for a single curve.
pub const MAX_CURVE_STEPS: usize = 256;

/// Number of raw points a quadratic curve needs.
const WINDOW: usize = 3;

/// Turns a live sequence of raw points into a smoothed, denser sequence.
#[derive(Debug, Clone)]
pub struct CurveSmoother {
    /// Most recent raw points (at most [`WINDOW`]).
    window: VecDeque<Point>,
    /// First raw point of the current stroke.
    anchor: Option<Point>,
    /// Raw points accepted since `begin`.
    raw_count: usize,
    /// Curves emitted since `begin`.
    curves: usize,
    spacing: f64,
    min_distance: f64,
}

impl Default for CurveSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveSmoother {
    pub fn new() -> Self {
        Self::with_spacing(DEFAULT_BEZIER_SPACING, DEFAULT_MIN_POINT_DISTANCE)
    }

    /// Create a smoother with custom vertex spacing and duplicate threshold.
    pub fn with_spacing(spacing: f64, min_distance: f64) -> Self {
        let spacing = if spacing.is_finite() && spacing > 0.0 {
            spacing.max(MIN_BEZIER_SPACING)
        } else {
            DEFAULT_BEZIER_SPACING
        };
        let min_distance = if min_distance.is_finite() && min_distance >= 0.0 {
            min_distance
        } else {
            DEFAULT_MIN_POINT_DISTANCE
        };
        Self {
            window: VecDeque::with_capacity(WINDOW),
            anchor: None,
            raw_count: 0,
            curves: 0,
            spacing,
            min_distance,
        }
    }

    /// Reset to a single anchor point, dropping any buffered input.
    pub fn begin(&mut self, point: Point) {
        self.reset();
        if let Some(point) = finite(point) {
            self.window.push_back(point);
            self.anchor = Some(point);
            self.raw_count = 1;
        }
    }

    /// Append a raw point and return the newly available vertices.
    ///
    /// Fewer than two vertices means there is nothing new to sample yet.
    pub fn push_point(&mut self, point: Point) -> Vec<Point> {
        let Some(point) = finite(point) else {
            return Vec::new();
        };
        match self.window.back() {
            None => {
                self.begin(point);
                return Vec::new();
            }
            Some(last) if last.distance(point) < self.min_distance => return Vec::new(),
            Some(_) => {}
        }

        self.window.push_back(point);
        self.raw_count += 1;
        if self.window.len() > WINDOW {
            self.window.pop_front();
        }
        if self.window.len() < WINDOW {
            return Vec::new();
        }

        let (p0, p1, p2) = (self.window[0], self.window[1], self.window[2]);
        let end = p1.midpoint(p2);
        let (start, control) = if self.curves == 0 {
            (p0, p0.midpoint(p1).midpoint(p1))
        } else {
            (p0.midpoint(p1), p1)
        };
        self.curves += 1;
        self.interpolate(start, control, end)
    }

    /// Flush the buffered tail of the stroke and reset.
    ///
    /// Returns the vertices between the end of the last emitted curve and
    /// the last raw point.
    pub fn finish(&mut self) -> Vec<Point> {
        let tail = match self.window.len() {
            0 | 1 => Vec::new(),
            n => {
                let last = self.window[n - 1];
                let start = if self.curves == 0 {
                    self.window[0]
                } else {
                    self.window[n - 2].midpoint(last)
                };
                self.interpolate(start, start.midpoint(last), last)
            }
        };
        self.reset();
        tail
    }

    /// Drop all state without producing vertices.
    pub fn reset(&mut self) {
        self.window.clear();
        self.anchor = None;
        self.raw_count = 0;
        self.curves = 0;
    }

    /// Number of raw points accepted since `begin`.
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    /// First raw point of the current stroke.
    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    /// Most recent raw point.
    pub fn last_point(&self) -> Option<Point> {
        self.window.back().copied()
    }

    fn interpolate(&self, start: Point, control: Point, end: Point) -> Vec<Point> {
        let steps = ((start.distance(end) / self.spacing) as usize).clamp(2, MAX_CURVE_STEPS);
        let curve = QuadBez::new(start, control, end);
        let mut vertices: Vec<Point> = (0..steps)
            .map(|i| curve.eval(i as f64 / steps as f64))
            .collect();
        vertices.push(end);
        vertices
    }
}

fn finite(point: Point) -> Option<Point> {
    (point.x.is_finite() && point.y.is_finite()).then_some(point)
}
