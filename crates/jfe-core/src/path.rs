// Dotted-path addressing over serde_json::Value.
// - `a.b.0.c`: segments are object keys, or array indices when the segment is
//   all ASCII digits and the container it addresses is an array.
// - Reads never fail: anything that does not resolve is `None`.
// - Writes create missing intermediates and replace scalars met mid-path.
// - Deletes are no-ops when the target is already absent.
// - Literal mode uses the whole path as one top-level key.
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{EditorError, Result, ValueKind};

/// How a path string is turned into a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    pub separator: char,
    pub literal: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { separator: '.', literal: false }
    }
}

impl Resolver {
    pub fn dotted(separator: char) -> Self {
        Self { separator, literal: false }
    }

    pub fn literal() -> Self {
        Self { separator: '.', literal: true }
    }

    pub fn read<'a>(&self, root: &'a Value, path: &str) -> Option<&'a Value> {
        if self.literal {
            root.as_object()?.get(path)
        } else {
            get(root, path, self.separator)
        }
    }

    pub fn read_mut<'a>(&self, root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
        if self.literal {
            root.as_object_mut()?.get_mut(path)
        } else {
            get_mut(root, path, self.separator)
        }
    }

    pub fn write(&self, root: &mut Value, path: &str, value: Value, merge: bool) -> Result<()> {
        if self.literal {
            if root.is_array() {
                return Err(EditorError::mismatch("set", "", ValueKind::Object, Some(&*root)));
            }
            let map = ensure_object_root(root, path);
            assign(map.entry(path.to_string()).or_insert(Value::Null), value, merge);
            Ok(())
        } else {
            set(root, path, value, self.separator, merge)
        }
    }

    pub fn delete(&self, root: &mut Value, path: &str) -> Option<Value> {
        if self.literal {
            root.as_object_mut()?.shift_remove(path)
        } else {
            remove(root, path, self.separator)
        }
    }

    /// Path of the sibling of `path` called `name`.
    pub fn sibling(&self, path: &str, name: &str) -> String {
        if self.literal {
            return name.to_string();
        }
        match path.rsplit_once(self.separator) {
            Some((parent, _)) => format!("{parent}{}{name}", self.separator),
            None => name.to_string(),
        }
    }
}

/// Index value of a segment made only of ASCII digits.
pub fn as_index(seg: &str) -> Option<usize> {
    if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seg.parse().ok()
}

fn child<'a>(v: &'a Value, seg: &str) -> Option<&'a Value> {
    match v {
        Value::Object(map) => map.get(seg),
        Value::Array(arr) => arr.get(as_index(seg)?),
        _ => None,
    }
}

fn child_mut<'a>(v: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match v {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(arr) => arr.get_mut(as_index(seg)?),
        _ => None,
    }
}

pub fn get<'a>(root: &'a Value, path: &str, sep: char) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split(sep).try_fold(root, child)
}

pub fn get_mut<'a>(root: &'a mut Value, path: &str, sep: char) -> Option<&'a mut Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split(sep).try_fold(root, child_mut)
}

fn is_container(v: &Value) -> bool {
    matches!(v, Value::Object(_) | Value::Array(_))
}

fn ensure_object_root<'a>(root: &'a mut Value, path: &str) -> &'a mut Map<String, Value> {
    if !root.is_object() {
        warn!(path, found = %ValueKind::of(Some(&*root)), "replacing non-object document root");
        *root = Value::Object(Map::new());
    }
    match root {
        Value::Object(map) => map,
        _ => unreachable!("root was just made an object"),
    }
}

fn assign(slot: &mut Value, value: Value, merge: bool) {
    match (slot, value) {
        (Value::Object(existing), Value::Object(incoming)) if merge => existing.extend(incoming),
        (slot, value) => *slot = value,
    }
}

// Slot for `seg` inside `container`, created as null when missing. The flag
// tells whether the slot held a value before.
fn slot_mut<'a>(container: &'a mut Value, seg: &str, at: &str) -> Result<(&'a mut Value, bool)> {
    match container {
        Value::Object(map) => {
            let existed = map.contains_key(seg);
            Ok((map.entry(seg.to_string()).or_insert(Value::Null), existed))
        }
        Value::Array(arr) => {
            let Some(idx) = as_index(seg) else {
                return Err(EditorError::TypeMismatch {
                    op: "set",
                    path: at.to_string(),
                    expected: ValueKind::Object,
                    found: ValueKind::Array,
                });
            };
            let len = arr.len();
            if idx > len {
                return Err(EditorError::IndexOutOfRange { path: at.to_string(), index: idx, len });
            }
            if idx == len {
                arr.push(Value::Null);
            }
            Ok((&mut arr[idx], idx < len))
        }
        other => Err(EditorError::mismatch("set", at, ValueKind::Object, Some(&*other))),
    }
}

fn prefix(segs: &[&str], sep: char) -> String {
    let mut buf = [0u8; 4];
    segs.join(&*sep.encode_utf8(&mut buf))
}

// Index checks for a write, done before anything is created so a rejected
// write leaves the document untouched. An array accepts an index up to its
// length; an array the write would create accepts only 0.
fn check_indices(root: &Value, segs: &[&str], sep: char) -> Result<()> {
    let mut cur = Some(root);
    for (i, seg) in segs.iter().enumerate() {
        match cur {
            Some(Value::Array(arr)) => {
                let Some(idx) = as_index(seg) else {
                    return Ok(());
                };
                if idx > arr.len() {
                    return Err(EditorError::IndexOutOfRange {
                        path: prefix(&segs[..i], sep),
                        index: idx,
                        len: arr.len(),
                    });
                }
                cur = arr.get(idx);
            }
            Some(Value::Object(map)) => cur = map.get(*seg),
            _ => {
                let creates_array = i > 0 && i + 1 == segs.len();
                return match as_index(seg) {
                    Some(idx) if creates_array && idx > 0 => Err(EditorError::IndexOutOfRange {
                        path: prefix(&segs[..i], sep),
                        index: idx,
                        len: 0,
                    }),
                    _ => Ok(()),
                };
            }
        }
    }
    Ok(())
}

/// Write `value` at `path`, building whatever structure is missing on the way.
///
/// A missing intermediate becomes an object, except when the only segment left
/// after it is numeric: then it becomes an array, so `set("list.0", x)` on an
/// empty document yields `{"list": [x]}` while `set("a.0.b", x)` yields
/// `{"a": {"0": {"b": x}}}`. Existing arrays are indexed by numeric segments;
/// writing at `len` appends and anything past it is `IndexOutOfRange`. A
/// non-numeric segment into an array is a type mismatch. Scalars met mid-path
/// are replaced.
pub fn set(root: &mut Value, path: &str, value: Value, sep: char, merge: bool) -> Result<()> {
    let segs: Vec<&str> = path.split(sep).collect();
    let Some((last, parents)) = segs.split_last() else {
        return Ok(());
    };
    check_indices(root, &segs, sep)?;
    if !is_container(root) {
        ensure_object_root(root, path);
    }

    let mut cur = root;
    for (i, seg) in parents.iter().enumerate() {
        let (slot, existed) = slot_mut(cur, seg, &prefix(&segs[..i], sep))?;
        if !is_container(slot) {
            if existed {
                warn!(
                    path,
                    at = %prefix(&segs[..=i], sep),
                    found = %ValueKind::of(Some(&*slot)),
                    "overwriting value to create intermediate container"
                );
            }
            let only_index_left = i + 2 == segs.len() && as_index(segs[i + 1]).is_some();
            *slot = if only_index_left {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
        }
        cur = slot;
    }

    let (slot, _) = slot_mut(cur, last, &prefix(parents, sep))?;
    assign(slot, value, merge);
    debug!(path, "set");
    Ok(())
}

/// Remove whatever sits at `path`. Array elements after a removed index shift down.
pub fn remove(root: &mut Value, path: &str, sep: char) -> Option<Value> {
    let segs: Vec<&str> = path.split(sep).collect();
    let (last, parents) = segs.split_last()?;
    let parent = parents.iter().try_fold(root, |cur, seg| child_mut(cur, seg))?;
    let removed = match parent {
        Value::Object(map) => map.shift_remove(*last),
        Value::Array(arr) => {
            let idx = as_index(last)?;
            (idx < arr.len()).then(|| arr.remove(idx))
        }
        _ => None,
    };
    if removed.is_some() {
        debug!(path, "removed");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_walks_objects_and_arrays() {
        let doc = json!({"a": {"b": [10, {"c": "x"}]}});
        assert_eq!(get(&doc, "a.b.0", '.'), Some(&json!(10)));
        assert_eq!(get(&doc, "a.b.1.c", '.'), Some(&json!("x")));
        assert_eq!(get(&doc, "", '.'), Some(&doc));
    }

    #[test]
    fn read_stops_at_scalars_and_missing_keys() {
        let doc = json!({"a": {"b": 1}, "arr": [1, 2]});
        assert_eq!(get(&doc, "a.b.c", '.'), None);
        assert_eq!(get(&doc, "a.x.y", '.'), None);
        assert_eq!(get(&doc, "arr.length", '.'), None);
        assert_eq!(get(&doc, "arr.5", '.'), None);
    }

    #[test]
    fn numeric_segment_is_a_key_inside_objects() {
        let doc = json!({"m": {"0": "zero"}});
        assert_eq!(get(&doc, "m.0", '.'), Some(&json!("zero")));
    }

    #[test]
    fn write_creates_nested_objects() {
        let mut doc = json!({});
        set(&mut doc, "a.b.c", json!(5), '.', false).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 5}}}));
    }

    #[test]
    fn write_creates_array_when_only_an_index_remains() {
        let mut doc = json!({});
        set(&mut doc, "list.0", json!("x"), '.', false).unwrap();
        assert_eq!(doc, json!({"list": ["x"]}));

        let mut doc = json!({});
        set(&mut doc, "a.0.b", json!(1), '.', false).unwrap();
        assert_eq!(doc, json!({"a": {"0": {"b": 1}}}));
    }

    #[test]
    fn write_appends_at_array_length() {
        let mut doc = json!({"arr": [1]});
        set(&mut doc, "arr.1", json!(2), '.', false).unwrap();
        set(&mut doc, "arr.0", json!(0), '.', false).unwrap();
        assert_eq!(doc, json!({"arr": [0, 2]}));
    }

    #[test]
    fn write_past_array_end_is_out_of_range() {
        let mut doc = json!({"arr": [1]});
        let err = set(&mut doc, "arr.3", json!(4), '.', false).unwrap_err();
        assert!(matches!(err, EditorError::IndexOutOfRange { index: 3, len: 1, ref path } if path == "arr"));

        let huge = format!("arr.{}", usize::MAX);
        assert!(matches!(
            set(&mut doc, &huge, json!(4), '.', false),
            Err(EditorError::IndexOutOfRange { .. })
        ));
        assert!(set(&mut doc, "arr.4000000000", json!(4), '.', false).is_err());
        assert_eq!(doc, json!({"arr": [1]}));
    }

    #[test]
    fn rejected_index_creates_nothing() {
        let mut doc = json!({});
        let err = set(&mut doc, "a.b.list.5", json!(1), '.', false).unwrap_err();
        assert!(matches!(err, EditorError::IndexOutOfRange { index: 5, len: 0, .. }));
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn literal_write_refuses_array_root() {
        let mut doc = json!([1, 2]);
        let err = Resolver::literal().write(&mut doc, "k", json!(1), false).unwrap_err();
        assert!(matches!(err, EditorError::TypeMismatch { found: ValueKind::Array, .. }));
        assert_eq!(doc, json!([1, 2]));
    }

    #[test]
    fn write_replaces_scalar_intermediates() {
        let mut doc = json!({"a": "text"});
        set(&mut doc, "a.b", json!(true), '.', false).unwrap();
        assert_eq!(doc, json!({"a": {"b": true}}));
    }

    #[test]
    fn write_rejects_key_into_array() {
        let mut doc = json!({"arr": [1, 2]});
        let err = set(&mut doc, "arr.name", json!(1), '.', false).unwrap_err();
        assert!(matches!(err, EditorError::TypeMismatch { ref path, .. } if path == "arr"));
        assert_eq!(doc, json!({"arr": [1, 2]}));
    }

    #[test]
    fn write_replaces_scalar_root() {
        let mut doc = json!(42);
        set(&mut doc, "a", json!(1), '.', false).unwrap();
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn merge_extends_existing_object() {
        let mut doc = json!({"cfg": {"a": 1, "b": 2}});
        set(&mut doc, "cfg", json!({"b": 3, "c": 4}), '.', true).unwrap();
        assert_eq!(doc, json!({"cfg": {"a": 1, "b": 3, "c": 4}}));
        set(&mut doc, "cfg", json!({"z": 0}), '.', false).unwrap();
        assert_eq!(doc, json!({"cfg": {"z": 0}}));
    }

    #[test]
    fn custom_separator() {
        let mut doc = json!({});
        set(&mut doc, "a/b.c", json!(1), '/', false).unwrap();
        assert_eq!(doc, json!({"a": {"b.c": 1}}));
        assert_eq!(get(&doc, "a/b.c", '/'), Some(&json!(1)));
    }

    #[test]
    fn remove_key_and_index() {
        let mut doc = json!({"a": {"b": 1, "c": 2}, "arr": [1, 2, 3]});
        assert_eq!(remove(&mut doc, "a.b", '.'), Some(json!(1)));
        assert_eq!(remove(&mut doc, "arr.0", '.'), Some(json!(1)));
        assert_eq!(doc, json!({"a": {"c": 2}, "arr": [2, 3]}));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut doc = json!({"a": 1});
        assert_eq!(remove(&mut doc, "x.y", '.'), None);
        assert_eq!(remove(&mut doc, "a.b", '.'), None);
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn remove_keeps_key_order() {
        let mut doc = json!({"x": 1, "y": 2, "z": 3});
        remove(&mut doc, "x", '.');
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["y", "z"]);
    }

    #[test]
    fn literal_mode_uses_whole_path() {
        let r = Resolver::literal();
        let mut doc = json!({});
        r.write(&mut doc, "a.b", json!(1), false).unwrap();
        assert_eq!(doc, json!({"a.b": 1}));
        assert_eq!(r.read(&doc, "a.b"), Some(&json!(1)));
        assert_eq!(r.delete(&mut doc, "a.b"), Some(json!(1)));
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn sibling_paths() {
        let r = Resolver::default();
        assert_eq!(r.sibling("a.b.c", "d"), "a.b.d");
        assert_eq!(r.sibling("top", "other"), "other");
        assert_eq!(Resolver::literal().sibling("a.b", "c"), "c");
    }

    #[test]
    fn index_parsing() {
        assert_eq!(as_index("0"), Some(0));
        assert_eq!(as_index("12"), Some(12));
        assert_eq!(as_index("-1"), None);
        assert_eq!(as_index("1a"), None);
        assert_eq!(as_index(""), None);
    }
}
