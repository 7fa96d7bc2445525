use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Editor-wide settings, fixed when the editor is built.
#[derive(Clone)]
pub struct EditorOptions {
    /// Spaces per nesting level in saved output. 0 writes compact JSON.
    pub indent_width: usize,
    pub serialize_filter: Option<SerializeFilter>,
    /// Append the platform newline after saved content.
    pub trailing_newline: bool,
    /// Treat every path as one top-level key, dots included.
    pub literal_keys: bool,
    /// Save after every mutation that changes the document.
    pub autosave: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            serialize_filter: None,
            trailing_newline: false,
            literal_keys: false,
            autosave: false,
        }
    }
}

impl EditorOptions {
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_filter(mut self, filter: SerializeFilter) -> Self {
        self.serialize_filter = Some(filter);
        self
    }

    pub fn with_trailing_newline(mut self, on: bool) -> Self {
        self.trailing_newline = on;
        self
    }

    pub fn with_literal_keys(mut self, on: bool) -> Self {
        self.literal_keys = on;
        self
    }

    pub fn with_autosave(mut self, on: bool) -> Self {
        self.autosave = on;
        self
    }
}

impl fmt::Debug for EditorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorOptions")
            .field("indent_width", &self.indent_width)
            .field("serialize_filter", &self.serialize_filter)
            .field("trailing_newline", &self.trailing_newline)
            .field("literal_keys", &self.literal_keys)
            .field("autosave", &self.autosave)
            .finish()
    }
}

pub type ReplacerFn = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// Controls what `save` writes, after the JSON.stringify replacer contract.
///
/// - `AllowList` keeps only the listed object keys, at every depth. Array
///   elements are never dropped.
/// - `Replacer` is called with `("", root)` first, then for each object member
///   and array element (keyed by its index) of whatever it returned. `None`
///   drops an object member; a dropped array element is written as `null`.
#[derive(Clone)]
pub enum SerializeFilter {
    AllowList(Vec<String>),
    Replacer(Arc<ReplacerFn>),
}

impl SerializeFilter {
    pub fn allow<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SerializeFilter::AllowList(keys.into_iter().map(Into::into).collect())
    }

    pub fn replacer<F>(f: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        SerializeFilter::Replacer(Arc::new(f))
    }
}

impl fmt::Debug for SerializeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeFilter::AllowList(keys) => f.debug_tuple("AllowList").field(keys).finish(),
            SerializeFilter::Replacer(_) => f.write_str("Replacer(..)"),
        }
    }
}

/// Per-call options for `set`.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Segment separator for this call.
    pub separator: char,
    /// Shallow-merge into an existing object instead of replacing it.
    pub merge: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            separator: '.',
            merge: false,
        }
    }
}
