use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{EditorError, Result};

/// Zip `target` (a file or a directory) into `<name>_<timestamp>.zip` beside it.
/// The source is left untouched.
pub fn zip_backup(target: &Path) -> Result<PathBuf> {
    if !target.exists() {
        return Err(EditorError::NotFound(target.to_path_buf()));
    }
    let parent = target.parent().unwrap_or(Path::new("."));
    let name = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dest = parent.join(format!("{name}_{ts}.zip"));

    let file = fs::File::create(&dest)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    if target.is_file() {
        let entry = target
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file.json");
        zip.start_file(entry, options).map_err(std::io::Error::other)?;
        zip.write_all(&fs::read(target)?)?;
    } else {
        for entry in WalkDir::new(target) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            let path = entry.path();
            let Ok(rel) = path.strip_prefix(target) else {
                continue;
            };
            if rel.as_os_str().is_empty() {
                continue;
            }
            let name = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                zip.add_directory(name, options).map_err(std::io::Error::other)?;
            } else {
                zip.start_file(name, options).map_err(std::io::Error::other)?;
                zip.write_all(&fs::read(path)?)?;
            }
        }
    }
    zip.finish().map_err(std::io::Error::other)?;
    info!(source = %target.display(), archive = %dest.display(), "backup written");
    Ok(dest)
}
