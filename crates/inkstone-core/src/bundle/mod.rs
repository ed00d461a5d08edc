//! Persisted bundles: a document plus the bitmaps it references.
//!
//! A bundle is a directory holding:
//! - `info`: the [`DocumentInfo`] manifest,
//! - `content`: the encoded element list ([`CanvasContent`]),
//! - `textures/`: one file per texture, named by its ID and holding the raw
//!   bitmap bytes.

mod export;
mod import;
mod task;

pub use export::{export_blob, export_bundle};
pub use import::{ImportReport, ImportedDocument, import_blob, import_bundle};
pub(crate) use task::{PendingTask, spawn_task};

use crate::elements::{Chartlet, Element, StrokeBatch};
use crate::texture::TextureId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Library marker written into every manifest.
pub const LIBRARY_MARKER: &str = "inkstone";

/// Current bundle format version.
pub const FORMAT_VERSION: u32 = 1;

pub const INFO_FILE: &str = "info";
pub const CONTENT_FILE: &str = "content";
pub const TEXTURES_DIR: &str = "textures";

/// Bundle errors.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Bundle is damaged: {0}")]
    CorruptBundle(String),
    #[error("Failed to decode texture {id}: {reason}")]
    Decode { id: TextureId, reason: String },
    #[error("Texture {0} is not registered")]
    MissingTexture(TextureId),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Background worker stopped before reporting a result")]
    WorkerLost,
}

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Manifest stored in the `info` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Library that wrote the bundle; required.
    pub library: Option<String>,
    #[serde(default)]
    pub version: u32,
    /// Number of chartlets in `content`.
    #[serde(default)]
    pub chartlets: usize,
    /// Number of elements in `content`.
    #[serde(default)]
    pub elements: usize,
    /// Textures the bundle ships in `textures/`.
    #[serde(default)]
    pub textures: Vec<TextureId>,
}

impl DocumentInfo {
    fn describe(content: &CanvasContent, textures: Vec<TextureId>) -> Self {
        Self {
            library: Some(LIBRARY_MARKER.to_string()),
            version: FORMAT_VERSION,
            chartlets: content.chartlets.len(),
            elements: content.len(),
            textures,
        }
    }
}

/// Encoded element list.
///
/// Strokes and chartlets are stored separately; draw order is restored from
/// their insertion indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasContent {
    #[serde(default)]
    pub strokes: Vec<StrokeBatch>,
    #[serde(default)]
    pub chartlets: Vec<Chartlet>,
}

impl CanvasContent {
    pub fn from_elements(elements: &[Element]) -> Self {
        let mut content = Self::default();
        for element in elements {
            match element {
                Element::Stroke(s) => content.strokes.push(s.clone()),
                Element::Chartlet(c) => content.chartlets.push(c.clone()),
            }
        }
        content
    }

    pub fn len(&self) -> usize {
        self.strokes.len() + self.chartlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Textures referenced by chartlets, first occurrence first.
    pub fn chartlet_textures(&self) -> Vec<TextureId> {
        let mut ids = Vec::new();
        for chartlet in &self.chartlets {
            if !ids.contains(&chartlet.texture) {
                ids.push(chartlet.texture);
            }
        }
        ids
    }

    /// Merge into one unsorted element list.
    pub fn into_elements(self) -> Vec<Element> {
        self.strokes
            .into_iter()
            .map(Element::Stroke)
            .chain(self.chartlets.into_iter().map(Element::Chartlet))
            .collect()
    }
}

/// Forwards progress to a sink, keeping it within `[0, 1]` and non-decreasing.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a mut dyn FnMut(f64),
    last: f64,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(f64)) -> Self {
        Self { sink, last: 0.0 }
    }

    pub(crate) fn report(&mut self, value: f64) {
        let value = value.clamp(self.last, 1.0);
        self.last = value;
        (self.sink)(value);
    }

    /// Report step `done` of `total` within the range starting at `base`.
    pub(crate) fn report_step(&mut self, base: f64, span: f64, done: usize, total: usize) {
        if total > 0 {
            self.report(base + span * done as f64 / total as f64);
        }
    }
}
