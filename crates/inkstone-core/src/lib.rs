//! Inkstone Core Library
//!
//! Freehand drawing core: curve smoothing, brush sampling, an undoable
//! document of strokes and chartlets, and bundle persistence.

pub mod brush;
pub mod bundle;
pub mod canvas;
pub mod config;
pub mod document;
pub mod elements;
pub mod executor;
pub mod render;
pub mod sampler;
pub mod smoothing;
pub mod texture;

pub use brush::{Brush, BrushId, BrushKind, BrushLookup, BrushRegistry, DEFAULT_BRUSH_NAME};
pub use bundle::{BundleError, BundleResult, CanvasContent, DocumentInfo, ImportReport, ImportedDocument};
pub use canvas::{Canvas, CanvasObserver, PointerSample, StrokePhase};
pub use config::{BrushConfig, CanvasConfig};
pub use document::Document;
pub use elements::{BlendMode, Chartlet, Element, LineSegment, NEUTRAL_FORCE, Pan, SerializableColor, StrokeBatch};
pub use executor::{Executor, InlineExecutor, Job, ThreadExecutor};
pub use render::{DrawCommand, RecordingTarget, RenderTarget, draw_element};
pub use sampler::StrokeSampler;
pub use smoothing::CurveSmoother;
pub use texture::{ImageFormat, MemoryTextureStore, Texture, TextureError, TextureId, TextureResult, TextureStore};
