//! jfe-core: read, edit and save JSON files through dotted paths
//!
//! This crate focuses on a small, well-factored surface:
//! - Path resolution over `serde_json::Value` (`a.b.0.c`, or literal keys)
//! - An [`Editor`] owning one document, with get/set/unset, array and
//!   object helpers, copy/move/rename, and blocking or background saves
//! - Serialization matching the saved layout (indent, filter, trailing newline)
//! - A [`FileStore`] seam with disk and in-memory stores, directory reads,
//!   and zip backups
//!
pub mod backup;
pub mod editor;
pub mod error;
pub mod json;
pub mod options;
pub mod path;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

pub use backup::zip_backup;
pub use editor::{Editor, EditorState, SaveHandle};
pub use error::{EditorError, Result, ValueKind};
pub use options::{EditorOptions, SerializeFilter, SetOptions};
pub use path::Resolver;
pub use store::{DiskStore, FileStore, MemoryStore, find_json_files, read_all_json};

/// Open an existing JSON file on disk for editing.
pub fn edit_file(path: impl Into<PathBuf>, options: EditorOptions) -> Result<Editor<DiskStore>> {
    Editor::open(Arc::new(DiskStore), path, options)
}

/// Create (or overwrite) a JSON file on disk holding `initial`, and edit it.
pub fn create_file(
    path: impl Into<PathBuf>,
    initial: Value,
    options: EditorOptions,
) -> Result<Editor<DiskStore>> {
    Editor::create(Arc::new(DiskStore), path, initial, options)
}
