//! Render target abstraction.

use crate::brush::{Brush, BrushId, BrushRegistry};
use crate::elements::{Chartlet, Element, LineSegment};
use crate::texture::TextureId;
use kurbo::{Point, Size};

/// Backend that turns segments and chartlets into pixels.
pub trait RenderTarget {
    /// Resize the backing buffer.
    fn update_buffer(&mut self, size: Size);

    /// Erase everything drawn so far.
    fn clear(&mut self);

    /// Draw a batch of segments with the brush that produced them.
    fn draw_segments(&mut self, segments: &[LineSegment], brush: &Brush);

    /// Draw a stamped bitmap.
    fn draw_chartlet(&mut self, chartlet: &Chartlet);

    /// Submit queued draw commands.
    fn commit_commands(&mut self);
}

/// Draw one element, resolving the brush of stroke batches.
pub fn draw_element<R: RenderTarget + ?Sized>(target: &mut R, element: &Element, brushes: &BrushRegistry) {
    match element {
        Element::Stroke(batch) => target.draw_segments(&batch.segments, brushes.resolve(batch.brush_id())),
        Element::Chartlet(chartlet) => target.draw_chartlet(chartlet),
    }
}

/// A draw call captured by [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    UpdateBuffer(Size),
    Clear,
    Segments { brush: BrushId, count: usize },
    Chartlet { texture: TextureId, center: Point, size: Size },
    Commit,
}

/// Headless render target that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    commands: Vec<DrawCommand>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recorder empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of full clears recorded.
    pub fn clear_count(&self) -> usize {
        self.commands.iter().filter(|c| **c == DrawCommand::Clear).count()
    }
}

impl RenderTarget for RecordingTarget {
    fn update_buffer(&mut self, size: Size) {
        self.commands.push(DrawCommand::UpdateBuffer(size));
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn draw_segments(&mut self, segments: &[LineSegment], brush: &Brush) {
        self.commands.push(DrawCommand::Segments {
            brush: brush.id(),
            count: segments.len(),
        });
    }

    fn draw_chartlet(&mut self, chartlet: &Chartlet) {
        self.commands.push(DrawCommand::Chartlet {
            texture: chartlet.texture,
            center: chartlet.center,
            size: chartlet.size,
        });
    }

    fn commit_commands(&mut self) {
        self.commands.push(DrawCommand::Commit);
    }
}
