//! JSON tree helpers shared by the store adapters.
//!
//! The store never holds `null` leaves or empty objects: writing either
//! removes the location, and parents left empty disappear with it.

use serde_json::{Map, Value};

/// Value at `segments` below `root`.
pub fn get<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let value = segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(*segment))?;
    (!value.is_null()).then_some(value)
}

/// Replace the value at `segments`, creating or pruning parents as needed.
pub fn set(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = normalize(value);
        return;
    };

    let mut node = &mut *root;
    for segment in parents {
        node = object_mut(node)
            .entry(*segment)
            .or_insert(Value::Null);
    }
    object_mut(node).insert((*last).to_string(), value);

    *root = normalize(std::mem::take(root));
}

/// Drop `null` leaves and empty objects, recursively.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, normalize(child)))
                .filter(|(_, child)| !child.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            object_mut(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_creates_parents() {
        let mut root = Value::Null;
        set(&mut root, &["attendance", "2024-01-01", "p1"], json!("present"));
        assert_eq!(root, json!({"attendance": {"2024-01-01": {"p1": "present"}}}));
        assert_eq!(
            get(&root, &["attendance", "2024-01-01"]),
            Some(&json!({"p1": "present"}))
        );
    }

    #[test]
    fn test_null_removes_and_prunes() {
        let mut root = json!({"players": {"p1": {"name": "Alex"}}, "attendance": {"d": {"p1": "late"}}});
        set(&mut root, &["players", "p1"], Value::Null);
        assert_eq!(root, json!({"attendance": {"d": {"p1": "late"}}}));
        assert_eq!(get(&root, &["players"]), None);
    }

    #[test]
    fn test_set_replaces_whole_subtree() {
        let mut root = json!({"attendance": {"d": {"p1": "late", "p2": "absent"}}});
        set(&mut root, &["attendance", "d"], json!({"p3": "present"}));
        assert_eq!(root, json!({"attendance": {"d": {"p3": "present"}}}));
    }

    #[test]
    fn test_empty_object_is_absent() {
        let mut root = json!({"attendance": {"d": {"p1": "late"}}});
        set(&mut root, &["attendance", "d"], json!({}));
        assert_eq!(root, Value::Null);
        assert_eq!(get(&root, &[]), None);
    }
}
