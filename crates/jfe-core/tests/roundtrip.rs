use std::sync::Arc;

use jfe_core::{Editor, EditorOptions, MemoryStore};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::String),
        prop::collection::vec(any::<i32>().prop_map(|n| json!(n)), 0..4).prop_map(Value::Array),
    ]
}

fn object_of(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
        .prop_map(|pairs| Value::Object(pairs.into_iter().collect::<Map<_, _>>()))
}

fn document() -> impl Strategy<Value = Value> {
    object_of(leaf().prop_recursive(3, 32, 4, |inner| object_of(inner)))
}

// (dotted path, value) for every leaf; empty objects count as leaves.
fn leaves(prefix: &str, v: &Value, out: &mut Vec<(String, Value)>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, child) in map {
                let p = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                leaves(&p, child, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}

fn empty_editor() -> Editor<MemoryStore> {
    Editor::from_value(Arc::new(MemoryStore::new()), "p.json", json!({}), EditorOptions::default())
}

proptest! {
    #[test]
    fn setting_every_leaf_rebuilds_the_document(doc in document()) {
        let mut pairs = Vec::new();
        if let Value::Object(map) = &doc {
            for (k, child) in map {
                leaves(k, child, &mut pairs);
            }
        }
        let mut ed = empty_editor();
        for (path, value) in pairs {
            ed.set(&path, value).unwrap();
        }
        let text = ed.to_json_string(false).unwrap();
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(reparsed, doc);
    }

    #[test]
    fn unset_twice_equals_unset_once(doc in document(), path in "[a-z]{1,6}(\\.[a-z]{1,6}){0,2}") {
        let mut ed = Editor::from_value(Arc::new(MemoryStore::new()), "p.json", doc, EditorOptions::default());
        ed.unset(&path).unwrap();
        let once = ed.get("");
        ed.unset(&path).unwrap();
        prop_assert_eq!(ed.get(""), once);
    }
}
