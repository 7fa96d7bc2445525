use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use std::io;
use std::path::Path;
use tracing::warn;

use crate::error::Result;
use crate::options::{EditorOptions, SerializeFilter};

#[cfg(windows)]
pub const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
pub const NEWLINE: &str = "\n";

/// Parse file text, falling back to an empty object when it is not valid JSON.
pub fn parse_lenient(text: &str, origin: &Path) -> Value {
    match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %origin.display(), error = %e, "malformed JSON, starting from an empty document");
            Value::Object(Map::new())
        }
    }
}

/// Serialize `value`, compact when `indent` is 0, otherwise `indent` spaces per level.
pub fn to_text(value: &Value, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let pad = " ".repeat(indent);
    let mut out = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(pad.as_bytes()));
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Bytes written by `save`: filter, indent, optional trailing newline.
pub fn render_for_save(value: &Value, opts: &EditorOptions) -> Result<String> {
    let mut text = match &opts.serialize_filter {
        Some(filter) => {
            let filtered = apply_filter(value, filter).unwrap_or(Value::Null);
            to_text(&filtered, opts.indent_width)?
        }
        None => to_text(value, opts.indent_width)?,
    };
    if opts.trailing_newline {
        text.push_str(NEWLINE);
    }
    Ok(text)
}

/// Filtered copy of `value`; `None` when a replacer drops the root itself.
pub fn apply_filter(value: &Value, filter: &SerializeFilter) -> Option<Value> {
    match filter {
        SerializeFilter::AllowList(keys) => Some(allow(value, keys)),
        SerializeFilter::Replacer(f) => replace("", value, &**f),
    }
}

// Allowed keys come out in allow-list order.
fn allow(value: &Value, keys: &[String]) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for k in keys {
                if let Some(v) = map.get(k)
                    && !out.contains_key(k)
                {
                    out.insert(k.clone(), allow(v, keys));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| allow(v, keys)).collect()),
        other => other.clone(),
    }
}

fn replace(key: &str, value: &Value, f: &crate::options::ReplacerFn) -> Option<Value> {
    let v = f(key, value)?;
    Some(match v {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, child) in &map {
                if let Some(c) = replace(k, child, f) {
                    out.insert(k.clone(), c);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, child)| replace(&i.to_string(), child, f).unwrap_or(Value::Null))
                .collect(),
        ),
        other => other,
    })
}

/// Text of one array element when joining: strings raw, null empty,
/// nested arrays comma-joined, everything else as compact JSON.
pub fn element_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(element_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_and_indented() {
        let v = json!({"a": [1, 2], "b": {}});
        assert_eq!(to_text(&v, 0).unwrap(), r#"{"a":[1,2],"b":{}}"#);
        assert_eq!(
            to_text(&v, 3).unwrap(),
            "{\n   \"a\": [\n      1,\n      2\n   ],\n   \"b\": {}\n}"
        );
    }

    #[test]
    fn save_rendering_appends_newline() {
        let opts = EditorOptions::default()
            .with_indent_width(0)
            .with_trailing_newline(true);
        assert_eq!(render_for_save(&json!({"x": 1}), &opts).unwrap(), format!("{{\"x\":1}}{NEWLINE}"));
    }

    #[test]
    fn allow_list_filters_every_level_in_list_order() {
        let v = json!({"b": 1, "a": {"a": 2, "c": 3}, "c": [{"a": 1, "z": 0}]});
        let f = SerializeFilter::allow(["c", "a"]);
        assert_eq!(
            apply_filter(&v, &f).unwrap(),
            json!({"c": [{"a": 1}], "a": {"c": 3, "a": 2}})
        );
        let keys: Vec<String> = apply_filter(&v, &f).unwrap().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["c", "a"]);
    }

    #[test]
    fn replacer_drops_members_and_nulls_elements() {
        let v = json!({"keep": 1, "secret": "x", "list": ["secret", "ok"]});
        let f = SerializeFilter::replacer(|key, value| {
            if key == "secret" || value == "secret" { None } else { Some(value.clone()) }
        });
        assert_eq!(apply_filter(&v, &f).unwrap(), json!({"keep": 1, "list": [null, "ok"]}));
    }

    #[test]
    fn replacer_sees_root_first() {
        let f = SerializeFilter::replacer(|key, value| {
            if key.is_empty() { Some(json!({"wrapped": value})) } else { Some(value.clone()) }
        });
        assert_eq!(apply_filter(&json!(1), &f).unwrap(), json!({"wrapped": 1}));
    }

    #[test]
    fn malformed_text_is_empty_document() {
        assert_eq!(parse_lenient("{not json", Path::new("x.json")), json!({}));
        assert_eq!(parse_lenient("", Path::new("x.json")), json!({}));
        assert_eq!(parse_lenient("[1]", Path::new("x.json")), json!([1]));
    }

    #[test]
    fn join_text() {
        assert_eq!(element_text(&json!("a")), "a");
        assert_eq!(element_text(&json!(null)), "");
        assert_eq!(element_text(&json!([1, [2, 3]])), "1,2,3");
        assert_eq!(element_text(&json!({"k": true})), r#"{"k":true}"#);
    }
}
