//! Snapshot files on disk.

use crate::error::{Result, SiftError};
use crate::index::{IndexView, SearchIndex};
use crate::snapshot::Codec;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;

// Unique per save, so concurrent saves to one path never share a temp file.
fn temp_file_for(dir: &Path, path: &Path) -> Result<NamedTempFile> {
    let mut prefix = path.file_name().unwrap_or_default().to_os_string();
    prefix.push(".");
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    Ok(file)
}

/// Writes a snapshot of `index` to `path` with `codec`, replacing any
/// previous file atomically.
pub fn save_to_path(index: &SearchIndex, path: &Path, codec: Codec) -> Result<()> {
    save_view_to_path(&index.read(), path, codec)
}

/// Same as [`save_to_path`] for a caller already holding a view.
pub fn save_view_to_path(view: &IndexView<'_>, path: &Path, codec: Codec) -> Result<()> {
    let started = Instant::now();

    // Ensure directory exists
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Write to temp, then rename. The temp file is removed on drop if anything fails.
    let mut temp = temp_file_for(dir, path)?;
    view.snapshot_with(BufWriter::new(temp.as_file_mut()), codec)?;
    temp.persist(path).map_err(|e| SiftError::Io(e.error))?;
    sync_parent_dir(path);

    tracing::info!(
        "Saved search index to {} ({:?}) in {}",
        path.display(),
        codec,
        crate::index::format_elapsed(started.elapsed())
    );
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    match File::open(parent) {
        Ok(dir) => {
            if let Err(e) = dir.sync_all() {
                tracing::warn!("Failed to sync directory {}: {}", parent.display(), e);
            }
        }
        Err(e) => tracing::warn!("Failed to open directory {}: {}", parent.display(), e),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

/// Loads a snapshot file. Returns `Ok(None)` when the file does not exist.
pub fn load_from_path(path: &Path) -> Result<Option<SearchIndex>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let index = SearchIndex::restore(BufReader::new(file))?;

    let stats = index.stats();
    tracing::info!(
        "Loaded search index from {} ({} keys, {} entries)",
        path.display(),
        stats.keys,
        stats.entries
    );
    Ok(Some(index))
}

/// Dumps the index as pretty JSON (`{ key: { id: value } }`), for debugging.
pub fn export_json<W: Write>(view: &IndexView<'_>, writer: W) -> Result<()> {
    let sorted: std::collections::BTreeMap<&String, std::collections::BTreeMap<&String, &String>> =
        view.entries()
            .iter()
            .map(|(key, inner)| (key, inner.iter().collect()))
            .collect();
    serde_json::to_writer_pretty(writer, &sorted)?;
    Ok(())
}
