//! # Editor
//!
//! [`Editor`] owns one JSON document loaded from a [`FileStore`] and edits it
//! through dotted paths (see [`crate::path`]).
//!
//! ## Lifecycle
//!
//! ```text
//! Loaded ──mutate──► Dirty ──save──► Persisted ──mutate──► Dirty ...
//!    └───────────────────delete────────────────────► Deleted
//! ```
//!
//! Mutating methods return `&mut Self` so calls chain with `?`. With
//! `autosave` on, each one that changes the document saves before returning.
//!
//! An editor is a single writer: methods take `&mut self`, and sharing one
//! between threads needs the caller's own locking.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{EditorError, Result, ValueKind};
use crate::json;
use crate::options::{EditorOptions, SetOptions};
use crate::path::Resolver;
use crate::store::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Document matches what was read from the store.
    Loaded,
    /// Changed in memory since the last completed save.
    Dirty,
    /// Last completed save covers every change.
    Persisted,
    /// Backing file removed; mutations fail with `EditorError::Deleted`.
    Deleted,
}

// Orders writes to one backing file. Every save takes a generation number
// when it is issued; a write older than the last one on disk is dropped.
#[derive(Debug, Default)]
struct SaveQueue {
    issued: AtomicU64,
    written: Mutex<u64>,
}

impl SaveQueue {
    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn last_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    fn last_written(&self) -> u64 {
        *self.written.lock()
    }

    fn write<S: FileStore>(&self, store: &S, path: &Path, content: &str, generation: u64) -> Result<()> {
        let mut written = self.written.lock();
        if *written > generation {
            debug!(path = %path.display(), generation, "skipping superseded save");
            return Ok(());
        }
        store.write_text(path, content)?;
        *written = generation;
        debug!(path = %path.display(), generation, bytes = content.len(), "saved");
        Ok(())
    }
}

/// A save running on a background thread.
#[derive(Debug)]
pub struct SaveHandle {
    inner: JoinHandle<Result<()>>,
}

impl SaveHandle {
    /// Block until the write finished.
    pub fn wait(self) -> Result<()> {
        self.inner
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("save thread panicked").into()))
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

pub struct Editor<S: FileStore> {
    store: Arc<S>,
    path: PathBuf,
    options: EditorOptions,
    data: Value,
    saves: Arc<SaveQueue>,
    // Last generation issued before the most recent change; a write with a
    // later generation covers it. `None` until the first change after a load.
    changed_after: Option<u64>,
    loaded_at: u64,
    deleted: bool,
}

impl<S: FileStore> std::fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn require(op: &'static str, what: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(EditorError::InvalidArgument { op, what });
    }
    Ok(())
}

fn read_document<S: FileStore>(store: &S, path: &Path) -> Value {
    match store.read_text(path) {
        Ok(text) => json::parse_lenient(&text, path),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable file, starting from an empty document");
            Value::Object(Map::new())
        }
    }
}

impl<S: FileStore> Editor<S> {
    /// Wrap an already materialized document. Touches nothing.
    pub fn from_value(store: Arc<S>, path: impl Into<PathBuf>, data: Value, options: EditorOptions) -> Self {
        Self {
            store,
            path: path.into(),
            options,
            data,
            saves: Arc::new(SaveQueue::default()),
            changed_after: None,
            loaded_at: 0,
            deleted: false,
        }
    }

    /// Load `path`, starting from `{}` when it is missing or not valid JSON.
    pub fn load(store: Arc<S>, path: impl Into<PathBuf>, options: EditorOptions) -> Self {
        let path = path.into();
        let data = read_document(&*store, &path);
        debug!(path = %path.display(), "loaded");
        Self::from_value(store, path, data, options)
    }

    /// Edit an existing file; `NotFound` when there is none.
    pub fn open(store: Arc<S>, path: impl Into<PathBuf>, options: EditorOptions) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(EditorError::InvalidArgument { op: "open", what: "path" });
        }
        if !store.exists(&path) {
            return Err(EditorError::NotFound(path));
        }
        Ok(Self::load(store, path, options))
    }

    /// Write `initial` to `path`, replacing any file already there, and edit it.
    pub fn create(
        store: Arc<S>,
        path: impl Into<PathBuf>,
        initial: Value,
        options: EditorOptions,
    ) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(EditorError::InvalidArgument { op: "create", what: "path" });
        }
        let ed = Self::from_value(store, path, initial, options);
        let content = json::render_for_save(&ed.data, &ed.options)?;
        let generation = ed.saves.issue();
        ed.saves.write(&*ed.store, &ed.path, &content, generation)?;
        info!(path = %ed.path.display(), "created");
        Ok(ed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Read-only view of the whole document.
    pub fn document(&self) -> &Value {
        &self.data
    }

    pub fn state(&self) -> EditorState {
        if self.deleted {
            return EditorState::Deleted;
        }
        let written = self.saves.last_written();
        match self.changed_after {
            Some(g) if written > g => EditorState::Persisted,
            Some(_) => EditorState::Dirty,
            None if written > self.loaded_at => EditorState::Persisted,
            None => EditorState::Loaded,
        }
    }

    fn resolver(&self) -> Resolver {
        Resolver {
            separator: '.',
            literal: self.options.literal_keys,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(EditorError::Deleted);
        }
        Ok(())
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.data);
        }
        self.resolver().read(&self.data, path)
    }

    // Record a change, then save when autosave is on.
    fn commit(&mut self) -> Result<&mut Self> {
        self.changed_after = Some(self.saves.last_issued());
        if self.options.autosave {
            self.persist()?;
        }
        Ok(self)
    }

    fn persist(&mut self) -> Result<()> {
        self.ensure_live()?;
        let content = json::render_for_save(&self.data, &self.options)?;
        let generation = self.saves.issue();
        self.saves.write(&*self.store, &self.path, &content, generation)
    }

    // ---- queries ----

    /// Copy of the value at `path`; the whole document for an empty path.
    /// `None` means the path does not resolve.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.lookup(path).cloned()
    }

    /// Keys of the object at `path` (the root for an empty path), in order.
    pub fn get_keys(&self, path: &str) -> Result<Vec<String>> {
        match self.lookup(path) {
            Some(Value::Object(map)) => Ok(map.keys().cloned().collect()),
            other => Err(EditorError::mismatch("get_keys", path, ValueKind::Object, other)),
        }
    }

    /// Elements of the array at `path` joined by `joiner`.
    pub fn array_to_string(&self, path: &str, joiner: &str) -> Result<String> {
        let Some(Value::Array(items)) = self.lookup(path) else {
            return Err(EditorError::mismatch(
                "array_to_string",
                path,
                ValueKind::Array,
                self.lookup(path),
            ));
        };
        require("array_to_string", "joiner", joiner)?;
        Ok(items.iter().map(json::element_text).collect::<Vec<_>>().join(joiner))
    }

    /// Compact JSON, or indented by `indent_width` with `keep_layout`.
    /// The serialize filter only applies to saves.
    pub fn to_json_string(&self, keep_layout: bool) -> Result<String> {
        let indent = if keep_layout { self.options.indent_width } else { 0 };
        json::to_text(&self.data, indent)
    }

    // ---- writes ----

    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_with(path, value, SetOptions::default())
    }

    pub fn set_with(&mut self, path: &str, value: impl Into<Value>, opts: SetOptions) -> Result<&mut Self> {
        require("set", "path", path)?;
        self.ensure_live()?;
        let resolver = Resolver {
            separator: opts.separator,
            ..self.resolver()
        };
        resolver.write(&mut self.data, path, value.into(), opts.merge)?;
        self.commit()
    }

    /// Apply every `(path, value)` pair in order, all or nothing, then save
    /// once if autosave is on.
    pub fn set_many<I, K>(&mut self, pairs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.ensure_live()?;
        let resolver = self.resolver();
        let mut next = self.data.clone();
        for (path, value) in pairs {
            let path = path.as_ref();
            require("set", "path", path)?;
            resolver.write(&mut next, path, value, false)?;
        }
        self.data = next;
        self.commit()
    }

    /// Remove the value at `path`; nothing happens when it is already absent.
    pub fn unset(&mut self, path: &str) -> Result<&mut Self> {
        require("unset", "path", path)?;
        self.ensure_live()?;
        match self.resolver().delete(&mut self.data, path) {
            Some(_) => self.commit(),
            None => Ok(self),
        }
    }

    // Run `f` on the array at `path`. With `create`, an absent path first
    // becomes an empty array.
    fn with_array<R>(
        &mut self,
        op: &'static str,
        path: &str,
        create: bool,
        f: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> Result<R> {
        require(op, "path", path)?;
        self.ensure_live()?;
        let resolver = self.resolver();
        if create && resolver.read(&self.data, path).is_none() {
            resolver.write(&mut self.data, path, Value::Array(Vec::new()), false)?;
        }
        match resolver.read_mut(&mut self.data, path) {
            Some(Value::Array(items)) => Ok(f(items)),
            other => Err(EditorError::mismatch(op, path, ValueKind::Array, other.as_deref())),
        }
    }

    pub fn push(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let value = value.into();
        self.with_array("push", path, true, |items| items.push(value))?;
        self.commit()
    }

    pub fn unshift(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let value = value.into();
        self.with_array("unshift", path, true, |items| items.insert(0, value))?;
        self.commit()
    }

    /// Drop the last element. An empty array is left as is.
    pub fn pop_last(&mut self, path: &str) -> Result<&mut Self> {
        if self.with_array("pop_last", path, false, |items| items.pop().is_some())? {
            self.commit()
        } else {
            Ok(self)
        }
    }

    /// Drop the first element. An empty array is left as is.
    pub fn pop_first(&mut self, path: &str) -> Result<&mut Self> {
        let removed = self.with_array("pop_first", path, false, |items| {
            if items.is_empty() {
                false
            } else {
                items.remove(0);
                true
            }
        })?;
        if removed { self.commit() } else { Ok(self) }
    }

    /// Drop the element at `index`; later elements shift down.
    pub fn pop_to(&mut self, path: &str, index: usize) -> Result<&mut Self> {
        let outcome = self.with_array("pop_to", path, false, |items| {
            if index < items.len() {
                items.remove(index);
                Ok(())
            } else {
                Err(items.len())
            }
        })?;
        match outcome {
            Ok(()) => self.commit(),
            Err(len) => Err(EditorError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len,
            }),
        }
    }

    /// Flip the boolean at `path`.
    pub fn trigger(&mut self, path: &str) -> Result<&mut Self> {
        require("trigger", "path", path)?;
        self.ensure_live()?;
        match self.resolver().read_mut(&mut self.data, path) {
            Some(Value::Bool(b)) => *b = !*b,
            other => {
                return Err(EditorError::mismatch("trigger", path, ValueKind::Bool, other.as_deref()));
            }
        }
        self.commit()
    }

    pub fn empty_array(&mut self, path: &str) -> Result<&mut Self> {
        self.with_array("empty_array", path, false, |items| items.clear())?;
        self.commit()
    }

    pub fn empty_object(&mut self, path: &str) -> Result<&mut Self> {
        require("empty_object", "path", path)?;
        self.ensure_live()?;
        match self.resolver().read_mut(&mut self.data, path) {
            Some(Value::Object(map)) => map.clear(),
            other => {
                return Err(EditorError::mismatch("empty_object", path, ValueKind::Object, other.as_deref()));
            }
        }
        self.commit()
    }

    /// Reset the document to `{}` and save right away, autosave or not.
    pub fn empty(&mut self) -> Result<&mut Self> {
        self.ensure_live()?;
        self.data = Value::Object(Map::new());
        self.changed_after = Some(self.saves.last_issued());
        self.persist()?;
        Ok(self)
    }

    /// Write a deep copy of the value at `path` to `dest`.
    pub fn copy(&mut self, path: &str, dest: &str) -> Result<&mut Self> {
        require("copy", "path", path)?;
        require("copy", "destination", dest)?;
        self.ensure_live()?;
        let value = self.source_value("copy", path)?;
        self.resolver().write(&mut self.data, dest, value, false)?;
        self.commit()
    }

    /// Copy to `new_path`, then unset `old_path`.
    pub fn move_to(&mut self, old_path: &str, new_path: &str) -> Result<&mut Self> {
        require("move", "old path", old_path)?;
        require("move", "new path", new_path)?;
        self.relocate("move", old_path, new_path.to_string())
    }

    /// Move the value at `path` to a sibling named `new_name`.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<&mut Self> {
        require("rename", "path", path)?;
        require("rename", "new name", new_name)?;
        let dest = self.resolver().sibling(path, new_name);
        self.relocate("rename", path, dest)
    }

    fn source_value(&self, op: &'static str, path: &str) -> Result<Value> {
        self.resolver()
            .read(&self.data, path)
            .cloned()
            .ok_or_else(|| EditorError::mismatch(op, path, ValueKind::Any, None))
    }

    fn relocate(&mut self, op: &'static str, from: &str, to: String) -> Result<&mut Self> {
        self.ensure_live()?;
        let value = self.source_value(op, from)?;
        if from == to {
            return Ok(self);
        }
        let resolver = self.resolver();
        resolver.write(&mut self.data, &to, value, false)?;
        resolver.delete(&mut self.data, from);
        self.commit()
    }

    // ---- persistence ----

    /// Serialize with the editor's options and write, blocking.
    pub fn save(&mut self) -> Result<&mut Self> {
        self.persist()?;
        Ok(self)
    }

    /// Serialize now and write on a background thread. Writes from one editor
    /// never interleave, and an older save never overwrites a newer one.
    pub fn save_async(&mut self) -> Result<SaveHandle> {
        self.ensure_live()?;
        let content = json::render_for_save(&self.data, &self.options)?;
        let generation = self.saves.issue();
        let store = Arc::clone(&self.store);
        let saves = Arc::clone(&self.saves);
        let path = self.path.clone();
        let inner = std::thread::spawn(move || saves.write(&*store, &path, &content, generation));
        Ok(SaveHandle { inner })
    }

    /// Replace the backing file with the JSON read from `source`. The
    /// in-memory document is not touched.
    pub fn write_copy(&mut self, source: impl AsRef<Path>, with_layout: bool) -> Result<&mut Self> {
        let source = source.as_ref();
        if source.as_os_str().is_empty() {
            return Err(EditorError::InvalidArgument { op: "write_copy", what: "path" });
        }
        self.ensure_live()?;
        let value: Value = serde_json::from_str(&self.store.read_text(source)?)?;
        let indent = if with_layout { self.options.indent_width } else { 0 };
        let content = json::to_text(&value, indent)?;
        let generation = self.saves.issue();
        self.saves.write(&*self.store, &self.path, &content, generation)?;
        // The file now differs from memory until the next save.
        self.changed_after = Some(generation);
        debug!(from = %source.display(), to = %self.path.display(), "copied file content");
        Ok(self)
    }

    /// Read the backing file again, dropping unsaved changes.
    pub fn reload(&mut self) -> Result<&mut Self> {
        self.ensure_live()?;
        self.data = read_document(&*self.store, &self.path);
        self.changed_after = None;
        self.loaded_at = self.saves.last_written();
        Ok(self)
    }

    /// Remove the backing file. Later mutations and saves fail.
    pub fn delete(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.store.delete(&self.path)?;
        self.deleted = true;
        info!(path = %self.path.display(), "deleted backing file");
        Ok(())
    }
}
