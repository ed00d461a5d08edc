//! Loading documents from bundles.

use super::{
    BundleError, BundleResult, CONTENT_FILE, CanvasContent, DocumentInfo, INFO_FILE,
    ProgressReporter, TEXTURES_DIR,
};
use crate::brush::BrushLookup;
use crate::document::Document;
use crate::elements::Element;
use crate::texture::{TextureId, TextureStore};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary of a successful import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub elements: usize,
    /// Textures decoded and registered.
    pub textures_loaded: usize,
    /// Textures skipped because their ID was already registered.
    pub textures_reused: usize,
    /// Strokes whose brush name had no registered brush.
    pub unresolved_brushes: usize,
}

/// A fully assembled document, ready to replace the live one.
#[derive(Debug)]
pub struct ImportedDocument {
    pub document: Document,
    pub report: ImportReport,
}

/// Load the bundle in `dir`.
///
/// Textures are registered with `store` under their original IDs and strokes
/// are re-linked to brushes by name. Nothing outside `store` is touched, so a
/// failed import leaves the caller's document as it was.
pub fn import_bundle(
    dir: &Path,
    store: &dyn TextureStore,
    brushes: &BrushLookup,
    progress: &mut dyn FnMut(f64),
) -> BundleResult<ImportedDocument> {
    let mut progress = ProgressReporter::new(progress);
    log::info!("Importing bundle from {}", dir.display());

    let info: DocumentInfo = read_record(&dir.join(INFO_FILE))?;
    if info.library.is_none() {
        return Err(BundleError::CorruptBundle("manifest has no library marker".to_string()));
    }
    progress.report(0.02);

    let content: CanvasContent = read_record(&dir.join(CONTENT_FILE))?;
    if content.len() != info.elements {
        return Err(BundleError::CorruptBundle(format!(
            "manifest declares {} elements but content holds {}",
            info.elements,
            content.len()
        )));
    }
    if content.chartlets.len() != info.chartlets {
        return Err(BundleError::CorruptBundle(format!(
            "manifest declares {} chartlets but content holds {}",
            info.chartlets,
            content.chartlets.len()
        )));
    }
    progress.report(0.1);

    let mut report = ImportReport::default();
    load_textures(&dir.join(TEXTURES_DIR), &info, &content, store, &mut report, &mut progress)?;

    let document = assemble(content, brushes, &mut report);
    progress.report(1.0);
    log::info!(
        "Imported {} elements ({} textures loaded, {} reused)",
        report.elements,
        report.textures_loaded,
        report.textures_reused
    );
    Ok(ImportedDocument { document, report })
}

/// Decode an in-memory blob produced by [`export_blob`](super::export_blob).
pub fn import_blob(data: &[u8], brushes: &BrushLookup) -> BundleResult<ImportedDocument> {
    if data.is_empty() {
        return Err(BundleError::CorruptBundle("blob is empty".to_string()));
    }
    let content: CanvasContent = serde_json::from_slice(data)
        .map_err(|e| BundleError::CorruptBundle(format!("Failed to parse blob: {}", e)))?;
    let mut report = ImportReport::default();
    let document = assemble(content, brushes, &mut report);
    Ok(ImportedDocument { document, report })
}

fn read_record<T: DeserializeOwned>(path: &Path) -> BundleResult<T> {
    let data = fs::read(path).map_err(|e| {
        BundleError::CorruptBundle(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&data).map_err(|e| {
        BundleError::CorruptBundle(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn load_textures(
    dir: &Path,
    info: &DocumentInfo,
    content: &CanvasContent,
    store: &dyn TextureStore,
    report: &mut ImportReport,
    progress: &mut ProgressReporter<'_>,
) -> BundleResult<()> {
    let mut required = info.textures.clone();
    for id in content.chartlet_textures() {
        if !required.contains(&id) {
            required.push(id);
        }
    }
    let declares_bitmaps = info.chartlets > 0 || !required.is_empty();

    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) if declares_bitmaps => {
            return Err(BundleError::CorruptBundle(format!(
                "texture directory {} is unreadable: {}",
                dir.display(),
                e
            )));
        }
        Err(_) => {
            log::debug!("Bundle has no texture directory");
            return Ok(());
        }
    };
    if paths.is_empty() && declares_bitmaps {
        return Err(BundleError::CorruptBundle("texture directory is empty".to_string()));
    }
    paths.sort();
    progress.report(0.15);

    let total = paths.len();
    for (i, path) in paths.iter().enumerate() {
        let id = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| TextureId::parse_str(name).ok());
        match id {
            None => log::warn!("Skipping unexpected file {}", path.display()),
            Some(id) if store.contains(id) => {
                log::debug!("Texture {} already registered", id);
                report.textures_reused += 1;
            }
            Some(id) => {
                let data = fs::read(path).map_err(|e| {
                    BundleError::Io(format!("Failed to read {}: {}", path.display(), e))
                })?;
                match store.make_texture(&data, Some(id)) {
                    Ok(_) => report.textures_loaded += 1,
                    Err(e) if required.contains(&id) => {
                        return Err(BundleError::Decode { id, reason: e.to_string() });
                    }
                    Err(e) => log::warn!("Skipping unreferenced texture {}: {}", id, e),
                }
            }
        }
        progress.report_step(0.15, 0.8, i + 1, total);
    }

    if let Some(missing) = required.iter().find(|&&id| !store.contains(id)) {
        return Err(BundleError::CorruptBundle(format!(
            "texture {} is missing from the bundle",
            missing
        )));
    }
    Ok(())
}

/// Re-link strokes to live brushes and restore draw order.
fn assemble(content: CanvasContent, brushes: &BrushLookup, report: &mut ImportReport) -> Document {
    let mut elements = content.into_elements();
    for element in &mut elements {
        if let Element::Stroke(batch) = element {
            let id = match brushes.resolve(batch.brush_name.as_deref()) {
                Ok(id) => id,
                Err(fallback) => {
                    log::warn!("Brush {:?} is not registered, using the default brush", batch.brush_name);
                    report.unresolved_brushes += 1;
                    fallback
                }
            };
            batch.link_brush(id);
        }
    }
    report.elements = elements.len();
    Document::from_elements(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{Brush, BrushRegistry};
    use crate::bundle::{export_blob, export_bundle};
    use crate::elements::Pan;
    use crate::texture::{MemoryTextureStore, sample_png};
    use kurbo::{Point, Size};
    use tempfile::tempdir;
    use uuid::Uuid;

    struct Fixture {
        registry: BrushRegistry,
        store: MemoryTextureStore,
        document: Document,
        texture: TextureId,
    }

    fn fixture() -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut registry = BrushRegistry::new(Brush::new(Some("inkstone.default".to_string()), None));
        let pen = Brush::new(Some("pen".to_string()), None).with_point_size(3.0);
        let marker = Brush::new(Some("marker".to_string()), None).with_opacity(0.6);
        registry.register(pen.clone());
        registry.register(marker.clone());

        let store = MemoryTextureStore::new();
        let texture = store.make_texture(&sample_png(4, 4), None).unwrap().id;

        let mut document = Document::new();
        let stroke = |brush: &Brush, y: f64| -> Vec<_> {
            (0..4)
                .map(|i| {
                    brush.make_segment(
                        Pan::new(Point::new(i as f64 * 2.0, y), 0.5),
                        Pan::new(Point::new(i as f64 * 2.0 + 2.0, y), 0.7),
                    )
                })
                .collect()
        };
        document.append_segments(stroke(&pen, 0.0), &pen);
        document.append_chartlet(Point::new(20.0, 20.0), Size::new(8.0, 8.0), texture);
        document.append_segments(stroke(&marker, 10.0), &marker);
        document.append_chartlet(Point::new(40.0, 20.0), Size::new(4.0, 4.0), texture);
        document.append_segments(stroke(&pen, 30.0), &pen);
        document.finish_current_element();

        Fixture { registry, store, document, texture }
    }

    fn export(fixture: &Fixture) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        export_bundle(dir.path(), fixture.document.elements(), &fixture.store, &mut |_: f64| {}).unwrap();
        dir
    }

    fn strip_links(elements: &[Element]) -> Vec<Element> {
        elements
            .iter()
            .cloned()
            .map(|mut e| {
                if let Element::Stroke(s) = &mut e {
                    s.brush_id = None;
                }
                e
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_preserves_order_geometry_and_brushes() {
        let fixture = fixture();
        let dir = export(&fixture);

        let fresh_store = MemoryTextureStore::new();
        let imported = import_bundle(dir.path(), &fresh_store, &fixture.registry.lookup(), &mut |_: f64| {}).unwrap();

        let expected = fixture.document.elements();
        let loaded = imported.document.elements();
        assert_eq!(strip_links(loaded), strip_links(expected));
        for (a, b) in loaded.iter().zip(expected) {
            if let (Some(a), Some(b)) = (a.as_stroke(), b.as_stroke()) {
                assert_eq!(a.brush_id(), b.brush_id());
            }
        }
        assert!(fresh_store.contains(fixture.texture));
        assert_eq!(imported.report.elements, 5);
        assert_eq!(imported.report.textures_loaded, 1);
        assert_eq!(imported.report.unresolved_brushes, 0);
    }

    #[test]
    fn test_progress_monotonic_and_complete() {
        let fixture = fixture();
        let dir = export(&fixture);

        let mut values = Vec::new();
        import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |v: f64| values.push(v)).unwrap();

        assert!(values.len() >= 4);
        for pair in values.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(values.last(), Some(&1.0));
    }

    #[test]
    fn test_existing_texture_not_reregistered() {
        let fixture = fixture();
        let dir = export(&fixture);

        let imported = import_bundle(dir.path(), &fixture.store, &fixture.registry.lookup(), &mut |_: f64| {}).unwrap();
        assert_eq!(imported.report.textures_loaded, 0);
        assert_eq!(imported.report.textures_reused, 1);
    }

    #[test]
    fn test_unresolved_brush_falls_back_to_default() {
        let fixture = fixture();
        let dir = export(&fixture);
        let bare = BrushRegistry::new(Brush::new(None, None));

        let imported = import_bundle(dir.path(), &MemoryTextureStore::new(), &bare.lookup(), &mut |_: f64| {}).unwrap();
        assert_eq!(imported.report.unresolved_brushes, 3);
        for stroke in imported.document.elements().iter().filter_map(Element::as_stroke) {
            assert_eq!(stroke.brush_id(), Some(bare.default_brush().id()));
            assert!(stroke.brush_name.is_some());
        }
    }

    #[test]
    fn test_missing_info_is_corrupt() {
        let fixture = fixture();
        let dir = export(&fixture);
        fs::remove_file(dir.path().join(INFO_FILE)).unwrap();

        let result = import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::CorruptBundle(_))));
    }

    #[test]
    fn test_missing_library_marker_is_corrupt() {
        let fixture = fixture();
        let dir = export(&fixture);
        fs::write(dir.path().join(INFO_FILE), br#"{ "chartlets": 2, "elements": 5 }"#).unwrap();

        let result = import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::CorruptBundle(_))));
    }

    #[test]
    fn test_element_count_mismatch_is_corrupt() {
        let fixture = fixture();
        let dir = export(&fixture);
        let path = dir.path().join(INFO_FILE);
        let mut info: DocumentInfo = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        info.elements += 1;
        fs::write(&path, serde_json::to_vec(&info).unwrap()).unwrap();

        let result = import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::CorruptBundle(_))));
    }

    #[test]
    fn test_missing_textures_with_chartlets_is_corrupt() {
        let fixture = fixture();
        let dir = export(&fixture);
        let textures = dir.path().join(TEXTURES_DIR);
        fs::remove_file(textures.join(fixture.texture.to_string())).unwrap();

        let store = MemoryTextureStore::new();
        let result = import_bundle(dir.path(), &store, &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::CorruptBundle(_))));

        fs::remove_dir(&textures).unwrap();
        let result = import_bundle(dir.path(), &store, &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::CorruptBundle(_))));
    }

    #[test]
    fn test_undecodable_chartlet_texture_fails() {
        let fixture = fixture();
        let dir = export(&fixture);
        fs::write(
            dir.path().join(TEXTURES_DIR).join(fixture.texture.to_string()),
            b"\x89PNG garbage",
        )
        .unwrap();

        let result = import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |_: f64| {});
        assert!(matches!(result, Err(BundleError::Decode { id, .. }) if id == fixture.texture));
    }

    #[test]
    fn test_stray_files_are_skipped() {
        let fixture = fixture();
        let dir = export(&fixture);
        let textures = dir.path().join(TEXTURES_DIR);
        fs::write(textures.join(".DS_Store"), b"junk").unwrap();
        fs::write(textures.join(Uuid::new_v4().to_string()), b"junk").unwrap();

        let imported = import_bundle(dir.path(), &MemoryTextureStore::new(), &fixture.registry.lookup(), &mut |_: f64| {}).unwrap();
        assert_eq!(imported.report.textures_loaded, 1);
    }

    #[test]
    fn test_bundle_without_chartlets_needs_no_textures() {
        let registry = BrushRegistry::new(Brush::new(None, None));
        let brush = registry.default_brush().clone();
        let mut document = Document::new();
        document.append_segments(vec![brush.make_tap_segment(Point::ZERO, Point::ZERO)], &brush);
        document.finish_current_element();

        let dir = tempdir().unwrap();
        export_bundle(dir.path(), document.elements(), &MemoryTextureStore::new(), &mut |_: f64| {}).unwrap();
        fs::remove_dir(dir.path().join(TEXTURES_DIR)).unwrap();

        let imported = import_bundle(dir.path(), &MemoryTextureStore::new(), &registry.lookup(), &mut |_: f64| {}).unwrap();
        assert_eq!(imported.document.len(), 1);
    }

    #[test]
    fn test_blob_roundtrip() {
        let fixture = fixture();
        let blob = export_blob(fixture.document.elements()).unwrap();

        let imported = import_blob(&blob, &fixture.registry.lookup()).unwrap();
        assert_eq!(imported.document.elements(), fixture.document.elements());
    }

    #[test]
    fn test_empty_or_invalid_blob() {
        let lookup = BrushRegistry::new(Brush::new(None, None)).lookup();
        assert!(matches!(import_blob(&[], &lookup), Err(BundleError::CorruptBundle(_))));
        assert!(matches!(import_blob(b"{ nope", &lookup), Err(BundleError::CorruptBundle(_))));
    }
}
