//! Canvas context: input handling, rendering and persistence around a document.

use crate::brush::{Brush, BrushId, BrushRegistry, DEFAULT_BRUSH_NAME};
use crate::bundle::{self, BundleResult, DocumentInfo, ImportReport, ImportedDocument, PendingTask, spawn_task};
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::elements::{LineSegment, Pan, sanitize_force};
use crate::executor::Executor;
use crate::render::{RenderTarget, draw_element};
use crate::sampler::StrokeSampler;
use crate::smoothing::CurveSmoother;
use crate::texture::{MemoryTextureStore, Texture, TextureError, TextureId, TextureResult, TextureStore};
use kurbo::{Point, Size};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub point: Point,
    /// Normalized pressure, `None` when the device has no pressure support.
    pub force: Option<f64>,
}

impl PointerSample {
    pub fn new(point: Point) -> Self {
        Self { point, force: None }
    }

    pub fn with_force(point: Point, force: f64) -> Self {
        Self { point, force: Some(force) }
    }
}

/// Lifecycle of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokePhase {
    /// The gesture was recognized. `actual_begin` is where the pointer went
    /// down, if recognition happened after it had already moved.
    Began { actual_begin: Option<Point> },
    Changed,
    Ended,
    Cancelled,
}

/// Receives canvas lifecycle events on the owning thread.
pub trait CanvasObserver {
    fn did_begin_drawing(&mut self) {}

    fn did_clear_drawing(&mut self) {}

    fn did_finish_import(&mut self, _report: &ImportReport) {}
}

type ResultSink<T> = Box<dyn FnOnce(BundleResult<T>)>;

struct PendingImport {
    task: PendingTask<ImportedDocument>,
    on_result: ResultSink<ImportReport>,
}

struct PendingExport {
    task: PendingTask<DocumentInfo>,
    on_result: ResultSink<DocumentInfo>,
}

/// Drawing surface state.
///
/// All methods must be called from the thread that owns the canvas.
/// Background imports and exports deliver their results through [`poll`](Canvas::poll).
pub struct Canvas<R: RenderTarget> {
    config: CanvasConfig,
    document: Document,
    brushes: BrushRegistry,
    textures: Arc<dyn TextureStore>,
    target: R,
    smoother: CurveSmoother,
    sampler: StrokeSampler,
    observers: Vec<Box<dyn CanvasObserver>>,
    pending_imports: Vec<PendingImport>,
    pending_exports: Vec<PendingExport>,
}

impl<R: RenderTarget> Canvas<R> {
    /// Create a canvas with default configuration and an in-memory texture store.
    pub fn new(target: R) -> Self {
        Self::with_config(target, CanvasConfig::default(), Arc::new(MemoryTextureStore::new()))
    }

    pub fn with_config(target: R, config: CanvasConfig, textures: Arc<dyn TextureStore>) -> Self {
        let default_brush = Brush::from_config(Some(DEFAULT_BRUSH_NAME.to_string()), None, &config.default_brush);
        let smoother = CurveSmoother::with_spacing(config.bezier_spacing, config.min_point_distance);
        Self {
            config,
            document: Document::new(),
            brushes: BrushRegistry::new(default_brush),
            textures,
            target,
            smoother,
            sampler: StrokeSampler::new(),
            observers: Vec::new(),
            pending_imports: Vec::new(),
            pending_exports: Vec::new(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    pub fn textures(&self) -> &Arc<dyn TextureStore> {
        &self.textures
    }

    pub fn add_observer(&mut self, observer: Box<dyn CanvasObserver>) {
        self.observers.push(observer);
    }

    // --- Brushes and textures ---

    pub fn brushes(&self) -> &BrushRegistry {
        &self.brushes
    }

    /// Register `data` as a texture and a brush stamped with it.
    pub fn register_brush(&mut self, name: Option<String>, data: &[u8]) -> TextureResult<BrushId> {
        let texture = self.textures.make_texture(data, None)?;
        Ok(self.register_brush_with_texture(name, Some(texture.id)))
    }

    /// Register the image at `path` as a texture and a brush stamped with it.
    pub fn register_brush_from_file(&mut self, name: Option<String>, path: &Path) -> TextureResult<BrushId> {
        let data = fs::read(path)
            .map_err(|e| TextureError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.register_brush(name, &data)
    }

    /// Register a brush styled from the configured defaults.
    pub fn register_brush_with_texture(&mut self, name: Option<String>, texture: Option<TextureId>) -> BrushId {
        let brush = Brush::from_config(name, texture, &self.config.default_brush);
        self.brushes.register(brush)
    }

    /// Register a fully configured brush.
    pub fn add_brush(&mut self, brush: Brush) -> BrushId {
        self.brushes.register(brush)
    }

    pub fn find_brush_by_name(&self, name: Option<&str>) -> &Brush {
        self.brushes.find_by_name(name)
    }

    /// Make a brush current. Returns false if the ID is unknown.
    pub fn use_brush(&mut self, id: BrushId) -> bool {
        self.brushes.set_current(id)
    }

    pub fn current_brush(&self) -> &Brush {
        self.brushes.current()
    }

    pub fn brush_mut(&mut self, id: BrushId) -> Option<&mut Brush> {
        self.brushes.get_mut(id)
    }

    pub fn make_texture(&self, data: &[u8], id: Option<TextureId>) -> TextureResult<Texture> {
        self.textures.make_texture(data, id)
    }

    pub fn find_texture(&self, id: TextureId) -> Option<Texture> {
        self.textures.find_texture(id)
    }

    // --- Input ---

    /// Feed one event of a drag gesture.
    pub fn handle_stroke(&mut self, phase: StrokePhase, sample: PointerSample) {
        let force = self.resolve_force(sample.force);
        match phase {
            StrokePhase::Began { actual_begin } => {
                let anchor = actual_begin.unwrap_or(sample.point);
                log::debug!("Stroke began at ({:.1}, {:.1})", anchor.x, anchor.y);
                self.document.begin_stroke(self.brushes.current());
                self.smoother.begin(anchor);
                self.sampler.begin(Pan::new(anchor, force));
                self.push_point(sample.point, force, false);
                for observer in &mut self.observers {
                    observer.did_begin_drawing();
                }
            }
            StrokePhase::Changed => self.push_point(sample.point, force, false),
            StrokePhase::Ended | StrokePhase::Cancelled => {
                match (self.smoother.anchor(), self.smoother.last_point()) {
                    (Some(first), Some(last)) if self.smoother.raw_count() < 3 => {
                        self.render_tap(first, Some(last));
                    }
                    _ => {
                        self.push_point(sample.point, force, false);
                        let tail = self.smoother.finish();
                        self.sample_vertices(&tail, force, true);
                    }
                }
                self.smoother.reset();
                self.sampler.reset();
                self.document.finish_current_element();
                log::debug!("Stroke ended ({} elements)", self.document.len());
            }
        }
    }

    /// Draw a single dot and seal it as its own element.
    pub fn handle_tap(&mut self, point: Point) {
        self.render_tap(point, None);
        self.document.finish_current_element();
    }

    fn resolve_force(&self, reported: Option<f64>) -> f64 {
        match reported {
            Some(force) if self.config.force_enabled => sanitize_force(force),
            _ => sanitize_force(self.config.neutral_force),
        }
    }

    fn push_point(&mut self, point: Point, force: f64, is_end: bool) {
        let vertices = self.smoother.push_point(point);
        self.sample_vertices(&vertices, force, is_end);
    }

    fn sample_vertices(&mut self, vertices: &[Point], force: f64, is_end: bool) {
        let segments = self.sampler.sample(vertices, force, self.brushes.current(), is_end);
        self.render(segments);
    }

    // --- Rendering ---

    /// Append segments drawn with the current brush and draw them incrementally.
    pub fn render(&mut self, segments: Vec<LineSegment>) {
        if segments.is_empty() {
            return;
        }
        let brush = self.brushes.current();
        self.target.draw_segments(&segments, brush);
        self.target.commit_commands();
        self.document.append_segments(segments, brush);
    }

    /// Render a tap segment from `from` to `to` (or a dot at `from`).
    pub fn render_tap(&mut self, from: Point, to: Option<Point>) {
        let segment = self.brushes.current().make_tap_segment(from, to.unwrap_or(from));
        self.render(vec![segment]);
    }

    /// Stamp a registered texture. Returns the chartlet's index, or `None`
    /// if the texture is unknown.
    pub fn render_chartlet(&mut self, center: Point, size: Size, texture: TextureId) -> Option<u64> {
        if !self.textures.contains(texture) {
            log::warn!("Cannot place chartlet: texture {} is not registered", texture);
            return None;
        }
        let index = self.document.append_chartlet(center, size, texture);
        if let Some(element) = self.document.elements().last() {
            draw_element(&mut self.target, element, &self.brushes);
        }
        self.target.commit_commands();
        Some(index)
    }

    /// Redraw every element from scratch.
    pub fn redraw(&mut self) {
        self.document.finish_current_element();
        redraw_document(&mut self.target, &self.document, &self.brushes, self.config.drawable_size);
    }

    /// Draw the whole document onto another target, such as an offscreen
    /// snapshot. The canvas's own target is not touched.
    pub fn redraw_on<T: RenderTarget + ?Sized>(&mut self, target: &mut T) {
        self.document.finish_current_element();
        redraw_document(target, &self.document, &self.brushes, self.config.drawable_size);
    }

    // --- Editing ---

    /// Remove everything. Returns true if the document changed.
    pub fn clear(&mut self) -> bool {
        self.smoother.reset();
        self.sampler.reset();
        let changed = self.document.clear();
        self.target.update_buffer(self.config.drawable_size);
        self.target.clear();
        self.target.commit_commands();
        log::info!("Canvas cleared");
        for observer in &mut self.observers {
            observer.did_clear_drawing();
        }
        changed
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.document.undo();
        if changed {
            self.redraw();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.document.redo();
        if changed {
            self.redraw();
        }
        changed
    }

    // --- Persistence ---

    /// Load a bundle on `executor`. The document is replaced when the result
    /// is collected by [`poll`](Canvas::poll); on failure it is left untouched.
    pub fn import_bundle(
        &mut self,
        dir: impl Into<PathBuf>,
        executor: &dyn Executor,
        progress: Option<Box<dyn FnMut(f64)>>,
        on_result: impl FnOnce(BundleResult<ImportReport>) + 'static,
    ) {
        let dir = dir.into();
        let store = Arc::clone(&self.textures);
        let lookup = self.brushes.lookup();
        let task = spawn_task(executor, progress, move |progress| {
            bundle::import_bundle(&dir, store.as_ref(), &lookup, progress)
        });
        self.pending_imports.push(PendingImport {
            task,
            on_result: Box::new(on_result),
        });
    }

    /// Decode an in-memory blob on `executor`, replacing the document on success.
    pub fn import_blob(
        &mut self,
        data: Vec<u8>,
        executor: &dyn Executor,
        on_result: impl FnOnce(BundleResult<ImportReport>) + 'static,
    ) {
        let lookup = self.brushes.lookup();
        let task = spawn_task(executor, None, move |_| bundle::import_blob(&data, &lookup));
        self.pending_imports.push(PendingImport {
            task,
            on_result: Box::new(on_result),
        });
    }

    /// Write the sealed elements to a bundle on `executor`.
    pub fn export_bundle(
        &mut self,
        dir: impl Into<PathBuf>,
        executor: &dyn Executor,
        progress: Option<Box<dyn FnMut(f64)>>,
        on_result: impl FnOnce(BundleResult<DocumentInfo>) + 'static,
    ) {
        self.document.finish_current_element();
        let dir = dir.into();
        let elements = self.document.elements().to_vec();
        let store = Arc::clone(&self.textures);
        let task = spawn_task(executor, progress, move |progress| {
            bundle::export_bundle(&dir, &elements, store.as_ref(), progress)
        });
        self.pending_exports.push(PendingExport {
            task,
            on_result: Box::new(on_result),
        });
    }

    /// Encode the sealed elements for in-memory transfer.
    pub fn export_blob(&self) -> BundleResult<Vec<u8>> {
        bundle::export_blob(self.document.elements())
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.pending_imports.is_empty() || !self.pending_exports.is_empty()
    }

    /// Deliver progress and results of background tasks.
    ///
    /// Returns the number of tasks that completed during this call.
    pub fn poll(&mut self) -> usize {
        let mut finished = 0;

        let mut i = 0;
        while i < self.pending_imports.len() {
            match self.pending_imports[i].task.poll() {
                Some(result) => {
                    let pending = self.pending_imports.remove(i);
                    self.finish_import(result, pending.on_result);
                    finished += 1;
                }
                None => i += 1,
            }
        }

        let mut i = 0;
        while i < self.pending_exports.len() {
            match self.pending_exports[i].task.poll() {
                Some(result) => {
                    let pending = self.pending_exports.remove(i);
                    if let Err(e) = &result {
                        log::error!("Export failed: {}", e);
                    }
                    (pending.on_result)(result);
                    finished += 1;
                }
                None => i += 1,
            }
        }

        finished
    }

    fn finish_import(&mut self, result: BundleResult<ImportedDocument>, on_result: ResultSink<ImportReport>) {
        match result {
            Ok(imported) => {
                self.smoother.reset();
                self.sampler.reset();
                self.document = imported.document;
                self.redraw();
                for observer in &mut self.observers {
                    observer.did_finish_import(&imported.report);
                }
                on_result(Ok(imported.report));
            }
            Err(e) => {
                log::error!("Import failed: {}", e);
                on_result(Err(e));
            }
        }
    }
}

fn redraw_document<T: RenderTarget + ?Sized>(
    target: &mut T,
    document: &Document,
    brushes: &BrushRegistry,
    size: Size,
) {
    target.update_buffer(size);
    target.clear();
    for element in document.elements() {
        draw_element(target, element, brushes);
    }
    target.commit_commands();
}
