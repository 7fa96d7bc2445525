//! Error types for the editor

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum EditorError {
    /// A required argument was empty (path, joiner, new name...).
    #[error("{op}: {what} is empty")]
    InvalidArgument { op: &'static str, what: &'static str },

    #[error("{op}: expected {expected} at `{path}`, found {found}")]
    TypeMismatch {
        op: &'static str,
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("index {index} is out of range for `{path}` (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backing file was deleted")]
    Deleted,
}

impl EditorError {
    pub(crate) fn mismatch(
        op: &'static str,
        path: &str,
        expected: ValueKind,
        found: Option<&Value>,
    ) -> Self {
        EditorError::TypeMismatch {
            op,
            path: path.to_string(),
            expected,
            found: ValueKind::of(found),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Any present value.
    Any,
    Absent,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(v: Option<&Value>) -> Self {
        match v {
            None => ValueKind::Absent,
            Some(Value::Null) => ValueKind::Null,
            Some(Value::Bool(_)) => ValueKind::Bool,
            Some(Value::Number(_)) => ValueKind::Number,
            Some(Value::String(_)) => ValueKind::String,
            Some(Value::Array(_)) => ValueKind::Array,
            Some(Value::Object(_)) => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Any => "a value",
            ValueKind::Absent => "nothing",
            ValueKind::Null => "null",
            ValueKind::Bool => "a boolean",
            ValueKind::Number => "a number",
            ValueKind::String => "a string",
            ValueKind::Array => "an array",
            ValueKind::Object => "an object",
        };
        f.write_str(s)
    }
}
