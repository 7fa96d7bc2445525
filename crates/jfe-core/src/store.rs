use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::{EditorError, Result};
use crate::json;

/// File access the editor depends on.
///
/// Implementations must be shareable across threads: background saves run
/// on their own thread with a clone of the store handle.
pub trait FileStore: Send + Sync + 'static {
    fn exists(&self, path: &Path) -> bool;
    /// `EditorError::NotFound` when there is no such file.
    fn read_text(&self, path: &Path) -> Result<String>;
    fn write_text(&self, path: &Path, content: &str) -> Result<()>;
    fn delete(&self, path: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

fn not_found_or_io(e: io::Error, path: &Path) -> EditorError {
    if e.kind() == io::ErrorKind::NotFound {
        EditorError::NotFound(path.to_path_buf())
    } else {
        EditorError::Io(e)
    }
}

/// The local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| not_found_or_io(e, path))
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        Ok(fs::write(path, content)?)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| not_found_or_io(e, path))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to).map_err(|e| not_found_or_io(e, from))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| not_found_or_io(e, from))
    }
}

/// In-memory files, for tests and previews that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, String>>,
    read_only: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.lock().insert(path.into(), content.into());
        self
    }

    /// Current content of `path`, bypassing any editor.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    /// Make every write fail with `PermissionDenied`.
    pub fn set_read_only(&self, on: bool) {
        *self.read_only.lock() = on;
    }

    fn check_writable(&self) -> Result<()> {
        if *self.read_only.lock() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "store is read-only").into());
        }
        Ok(())
    }
}

impl FileStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        self.contents(path)
            .ok_or_else(|| EditorError::NotFound(path.to_path_buf()))
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        self.check_writable()?;
        self.files.lock().insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.check_writable()?;
        match self.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(EditorError::NotFound(path.to_path_buf())),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_writable()?;
        let text = self.read_text(from)?;
        self.files.lock().insert(to.to_path_buf(), text);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_writable()?;
        let mut files = self.files.lock();
        let text = files
            .remove(from)
            .ok_or_else(|| EditorError::NotFound(from.to_path_buf()))?;
        files.insert(to.to_path_buf(), text);
        Ok(())
    }
}

/// All `.json` files under `dir`, recursively, sorted.
pub fn find_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(EditorError::NotFound(dir.to_path_buf()));
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let p = entry.path();
        let is_json = p
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            out.push(p.to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// Parse every `.json` file under `dir` into one object.
///
/// Keys are the file paths relative to `dir` without the extension, with `/`
/// between directories (`a`, `nested/b`), in sorted order. Malformed files
/// read as `{}`.
pub fn read_all_json(dir: &Path) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for path in find_json_files(dir)? {
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path()).with_extension("");
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let text = DiskStore.read_text(&path)?;
        out.insert(key, json::parse_lenient(&text, &path));
    }
    Ok(out)
}
