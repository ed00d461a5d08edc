//! Document model: ordered elements plus undo/redo history.

use crate::brush::Brush;
use crate::elements::{Chartlet, Element, LineSegment, StrokeBatch};
use crate::texture::TextureId;
use kurbo::{Point, Size};

/// Maximum number of undo actions to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// A structural change that can be undone.
#[derive(Debug, Clone)]
enum UndoAction {
    /// An element with this index was appended.
    Append { index: u64 },
    /// These elements were removed by a clear.
    Clear(Vec<Element>),
}

/// A structural change that was undone and can be redone.
#[derive(Debug, Clone)]
enum RedoAction {
    Append(Element),
    Clear,
}

/// Ordered drawable elements with an in-progress stroke and history.
///
/// `elements` is always sorted by insertion index.
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<Element>,
    /// Stroke currently receiving segments.
    current: Option<StrokeBatch>,
    undo_stack: Vec<UndoAction>,
    redo_stack: Vec<RedoAction>,
    next_index: u64,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from loaded elements, restoring draw order.
    pub fn from_elements(mut elements: Vec<Element>) -> Self {
        elements.sort_by_key(Element::index);
        let next_index = elements.last().map(|e| e.index() + 1).unwrap_or(0);
        Self {
            elements,
            next_index,
            ..Self::default()
        }
    }

    /// Sealed elements in draw order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The stroke being drawn, if any.
    pub fn current_element(&self) -> Option<&StrokeBatch> {
        self.current.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.current.is_some()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.current.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.current.is_none() && !self.redo_stack.is_empty()
    }

    fn allocate_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Open a new stroke for `brush`, sealing any stroke in progress.
    pub fn begin_stroke(&mut self, brush: &Brush) {
        self.finish_current_element();
        let index = self.allocate_index();
        self.current = Some(StrokeBatch::new(index, brush));
    }

    /// Append segments to the stroke in progress.
    ///
    /// Opens a new stroke if none is open or the open one uses another brush.
    pub fn append_segments(&mut self, segments: Vec<LineSegment>, brush: &Brush) {
        if segments.is_empty() {
            return;
        }
        let same_brush = self
            .current
            .as_ref()
            .is_some_and(|b| b.brush_id() == Some(brush.id()));
        if !same_brush {
            self.begin_stroke(brush);
        }
        if let Some(batch) = self.current.as_mut() {
            batch.segments.extend(segments);
        }
    }

    /// Seal the stroke in progress into the element list.
    ///
    /// Returns true if an element was added. Does nothing when no stroke is
    /// open; an open stroke without segments is discarded.
    pub fn finish_current_element(&mut self) -> bool {
        let Some(batch) = self.current.take() else {
            return false;
        };
        if batch.is_empty() {
            return false;
        }
        log::debug!("Sealed stroke {} with {} segments", batch.index(), batch.len());
        self.push_element(Element::Stroke(batch));
        true
    }

    /// Stamp a chartlet. Returns its insertion index.
    pub fn append_chartlet(&mut self, center: Point, size: Size, texture: TextureId) -> u64 {
        self.finish_current_element();
        let index = self.allocate_index();
        self.push_element(Element::Chartlet(Chartlet::new(index, center, size, texture)));
        index
    }

    fn push_undo(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
        // Oldest actions become permanent.
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    fn push_element(&mut self, element: Element) {
        self.push_undo(UndoAction::Append { index: element.index() });
        self.elements.push(element);
        self.redo_stack.clear();
    }

    /// Remove all elements as one undoable action.
    ///
    /// Returns false if there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        self.finish_current_element();
        if self.elements.is_empty() {
            return false;
        }
        let removed = std::mem::take(&mut self.elements);
        log::debug!("Cleared {} elements", removed.len());
        self.push_undo(UndoAction::Clear(removed));
        self.redo_stack.clear();
        true
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.finish_current_element();
        match self.undo_stack.pop() {
            Some(UndoAction::Append { index }) => {
                match self.elements.iter().rposition(|e| e.index() == index) {
                    Some(pos) => {
                        let element = self.elements.remove(pos);
                        self.redo_stack.push(RedoAction::Append(element));
                        true
                    }
                    None => {
                        log::warn!("Undo history referenced missing element {}", index);
                        false
                    }
                }
            }
            Some(UndoAction::Clear(mut removed)) => {
                removed.append(&mut self.elements);
                self.elements = removed;
                self.redo_stack.push(RedoAction::Clear);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        if self.current.is_some() {
            return false;
        }
        match self.redo_stack.pop() {
            Some(RedoAction::Append(element)) => {
                self.push_undo(UndoAction::Append { index: element.index() });
                self.elements.push(element);
                true
            }
            Some(RedoAction::Clear) => {
                let removed = std::mem::take(&mut self.elements);
                self.push_undo(UndoAction::Clear(removed));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Pan;
    use uuid::Uuid;

    fn segments(brush: &Brush, count: usize) -> Vec<LineSegment> {
        (0..count)
            .map(|i| {
                brush.make_segment(
                    Pan::new(Point::new(i as f64, 0.0), 1.0),
                    Pan::new(Point::new(i as f64 + 1.0, 0.0), 1.0),
                )
            })
            .collect()
    }

    fn draw_stroke(doc: &mut Document, brush: &Brush) {
        doc.append_segments(segments(brush, 3), brush);
        doc.finish_current_element();
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert!(!doc.is_drawing());
        assert!(!doc.can_undo());
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_append_and_finish() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();

        doc.append_segments(segments(&brush, 2), &brush);
        doc.append_segments(segments(&brush, 3), &brush);
        assert!(doc.is_drawing());
        assert!(doc.is_empty());
        assert_eq!(doc.current_element().map(StrokeBatch::len), Some(5));

        assert!(doc.finish_current_element());
        assert_eq!(doc.len(), 1);
        assert!(!doc.is_drawing());
    }

    #[test]
    fn test_finish_twice_is_noop() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        doc.append_segments(segments(&brush, 2), &brush);

        assert!(doc.finish_current_element());
        assert!(!doc.finish_current_element());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_empty_stroke_is_discarded() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        doc.begin_stroke(&brush);
        assert!(!doc.finish_current_element());
        assert!(doc.is_empty());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_brush_change_splits_stroke() {
        let pen = Brush::new(Some("pen".to_string()), None);
        let marker = Brush::new(Some("marker".to_string()), None);
        let mut doc = Document::new();

        doc.append_segments(segments(&pen, 2), &pen);
        doc.append_segments(segments(&marker, 2), &marker);
        doc.finish_current_element();

        assert_eq!(doc.len(), 2);
        let names: Vec<_> = doc
            .elements()
            .iter()
            .filter_map(Element::as_stroke)
            .map(|s| s.brush_name.clone())
            .collect();
        assert_eq!(names, vec![Some("pen".to_string()), Some("marker".to_string())]);
    }

    #[test]
    fn test_indices_increase() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        doc.append_chartlet(Point::new(5.0, 5.0), Size::new(10.0, 10.0), Uuid::new_v4());
        draw_stroke(&mut doc, &brush);

        let indices: Vec<u64> = doc.elements().iter().map(Element::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_chartlet_seals_open_stroke() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        doc.append_segments(segments(&brush, 2), &brush);
        doc.append_chartlet(Point::ZERO, Size::new(4.0, 4.0), Uuid::new_v4());

        assert!(!doc.is_drawing());
        assert_eq!(doc.len(), 2);
        assert!(doc.elements()[1].is_chartlet());
    }

    #[test]
    fn test_undo_redo_append() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        let before = doc.elements().to_vec();

        doc.append_chartlet(Point::ZERO, Size::new(4.0, 4.0), Uuid::new_v4());
        let after = doc.elements().to_vec();

        assert!(doc.undo());
        assert_eq!(doc.elements(), before.as_slice());
        assert!(doc.can_redo());

        assert!(doc.redo());
        assert_eq!(doc.elements(), after.as_slice());
    }

    #[test]
    fn test_undo_seals_open_stroke_first() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        doc.append_segments(segments(&brush, 2), &brush);

        assert!(doc.undo());
        assert_eq!(doc.len(), 1);
        assert!(!doc.is_drawing());
    }

    #[test]
    fn test_clear_and_undo_restores_order() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        doc.append_chartlet(Point::ZERO, Size::new(4.0, 4.0), Uuid::new_v4());
        draw_stroke(&mut doc, &brush);
        let before = doc.elements().to_vec();

        assert!(doc.clear());
        assert!(doc.is_empty());

        assert!(doc.undo());
        assert_eq!(doc.elements(), before.as_slice());

        assert!(doc.redo());
        assert!(doc.is_empty());

        assert!(doc.undo());
        assert_eq!(doc.elements(), before.as_slice());
    }

    #[test]
    fn test_clear_empty_document_is_noop() {
        let mut doc = Document::new();
        assert!(!doc.clear());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_new_append_clears_redo() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        assert!(doc.undo());
        assert!(doc.can_redo());

        draw_stroke(&mut doc, &brush);
        assert!(!doc.can_redo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_redo_blocked_while_drawing() {
        let brush = Brush::new(None, None);
        let mut doc = Document::new();
        draw_stroke(&mut doc, &brush);
        assert!(doc.undo());

        doc.begin_stroke(&brush);
        assert!(!doc.redo());
    }

    #[test]
    fn test_undo_empty_stack() {
        let mut doc = Document::new();
        assert!(!doc.undo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_from_elements_sorts_and_continues_indices() {
        let brush = Brush::new(None, None);
        let mut source = Document::new();
        draw_stroke(&mut source, &brush);
        source.append_chartlet(Point::ZERO, Size::new(1.0, 1.0), Uuid::new_v4());
        draw_stroke(&mut source, &brush);

        let mut shuffled = source.elements().to_vec();
        shuffled.reverse();
        let mut doc = Document::from_elements(shuffled);

        assert_eq!(doc.elements(), source.elements());
        assert!(!doc.can_undo());
        let index = doc.append_chartlet(Point::ZERO, Size::new(1.0, 1.0), Uuid::new_v4());
        assert_eq!(index, 3);
    }

    #[test]
    fn test_history_is_capped() {
        let mut doc = Document::new();
        let texture = Uuid::new_v4();
        for i in 0..MAX_UNDO_HISTORY + 10 {
            doc.append_chartlet(Point::new(i as f64, 0.0), Size::new(1.0, 1.0), texture);
        }
        doc.clear();

        let mut undone = 0;
        while doc.undo() {
            undone += 1;
        }
        assert_eq!(undone, MAX_UNDO_HISTORY);
        // The clear and the newest 49 appends were undone; the oldest 11 stay.
        assert_eq!(doc.len(), 11);
        assert_eq!(doc.elements()[10].index(), 10);

        let mut redone = 0;
        while doc.redo() {
            redone += 1;
        }
        assert_eq!(redone, MAX_UNDO_HISTORY);
        assert!(doc.is_empty());
    }
}
