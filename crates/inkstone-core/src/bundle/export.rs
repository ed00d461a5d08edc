//! Writing documents to bundles.

use super::{
    BundleError, BundleResult, CONTENT_FILE, CanvasContent, DocumentInfo, INFO_FILE,
    ProgressReporter, TEXTURES_DIR,
};
use crate::elements::Element;
use crate::texture::{TextureId, TextureStore};
use std::fs;
use std::io;
use std::path::Path;

/// Write `elements` and the chartlet textures they reference to `dir`.
///
/// Any existing manifest is removed first and written again last, so an
/// interrupted export never looks like a valid bundle, even over an older one.
/// Texture files not referenced by the new content are deleted.
pub fn export_bundle(
    dir: &Path,
    elements: &[Element],
    store: &dyn TextureStore,
    progress: &mut dyn FnMut(f64),
) -> BundleResult<DocumentInfo> {
    let mut progress = ProgressReporter::new(progress);
    let content = CanvasContent::from_elements(elements);
    let textures = content.chartlet_textures();
    log::info!(
        "Exporting {} elements and {} textures to {}",
        content.len(),
        textures.len(),
        dir.display()
    );

    let textures_dir = dir.join(TEXTURES_DIR);
    fs::create_dir_all(&textures_dir).map_err(|e| {
        BundleError::Io(format!("Failed to create {}: {}", textures_dir.display(), e))
    })?;

    remove_file_if_exists(&dir.join(INFO_FILE))?;

    let encoded = serde_json::to_vec(&content).map_err(|e| BundleError::Serialization(e.to_string()))?;
    write_file(&dir.join(CONTENT_FILE), &encoded)?;
    progress.report(0.1);

    for (i, &id) in textures.iter().enumerate() {
        let texture = store.find_texture(id).ok_or(BundleError::MissingTexture(id))?;
        write_file(&textures_dir.join(id.to_string()), texture.data())?;
        progress.report_step(0.1, 0.85, i + 1, textures.len());
    }

    prune_textures(&textures_dir, &textures)?;

    let info = DocumentInfo::describe(&content, textures);
    let encoded = serde_json::to_vec_pretty(&info).map_err(|e| BundleError::Serialization(e.to_string()))?;
    write_file(&dir.join(INFO_FILE), &encoded)?;
    progress.report(1.0);

    log::info!("Exported bundle to {}", dir.display());
    Ok(info)
}

/// Encode `elements` for in-memory transfer. Bitmaps are not included.
pub fn export_blob(elements: &[Element]) -> BundleResult<Vec<u8>> {
    serde_json::to_vec(&CanvasContent::from_elements(elements))
        .map_err(|e| BundleError::Serialization(e.to_string()))
}

fn remove_file_if_exists(path: &Path) -> BundleResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BundleError::Io(format!("Failed to remove {}: {}", path.display(), e))),
    }
}

/// Delete files in `dir` that are not one of `keep`.
fn prune_textures(dir: &Path, keep: &[TextureId]) -> BundleResult<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| BundleError::Io(format!("Failed to list {}: {}", dir.display(), e)))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let referenced = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| TextureId::parse_str(name).ok())
            .is_some_and(|id| keep.contains(&id));
        if path.is_file() && !referenced {
            remove_file_if_exists(&path)?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> BundleResult<()> {
    fs::write(path, data)
        .map_err(|e| BundleError::Io(format!("Failed to write {}: {}", path.display(), e)))
}
