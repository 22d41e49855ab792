//! Dot-separated field paths over attribute JSON objects.
//!
//! Paths here are relative to a domain root: `hair.color` inside an
//! appearance object. Arrays are leaves; they are never indexed into.

use serde_json::{Map, Value};

/// Join a root and a relative path (`"appearance"` + `"hair.color"`).
pub fn join(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        root.to_string()
    } else {
        format!("{root}.{relative}")
    }
}

/// Every leaf path present in `value`, in key order.
///
/// Nulls and empty objects contribute nothing. A non-object `value` is a
/// single leaf with the empty path.
pub fn leaf_paths(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_leaves(value, String::new(), &mut out);
    out
}

fn collect_leaves(value: &Value, prefix: String, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                collect_leaves(child, join_relative(&prefix, key), out);
            }
        }
        _ => out.push(prefix),
    }
}

fn join_relative(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Look up a relative path. The empty path returns `value` itself.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Remove the leaf at `path`, pruning parent objects left empty.
///
/// Returns `true` if something was removed.
pub fn remove(value: &mut Value, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    remove_segments(value, &segments)
}

fn remove_segments(value: &mut Value, segments: &[&str]) -> bool {
    let Some(map) = value.as_object_mut() else {
        return false;
    };
    match segments {
        [] => false,
        [last] => map.remove(*last).is_some(),
        [head, rest @ ..] => {
            let Some(child) = map.get_mut(*head) else {
                return false;
            };
            let removed = remove_segments(child, rest);
            if child.as_object().is_some_and(Map::is_empty) {
                map.remove(*head);
            }
            removed
        }
    }
}

/// Recursively overlay `overlay` onto `base`.
///
/// Objects merge key by key; every other overlay value (strings, arrays)
/// replaces the base value. Nulls in the overlay are ignored.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_child) in overlay_map {
                if overlay_child.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(base_child) if base_child.is_object() && overlay_child.is_object() => {
                        deep_merge(base_child, overlay_child);
                    }
                    _ => {
                        base_map.insert(key.clone(), overlay_child.clone());
                    }
                }
            }
        }
        (base, overlay) if !overlay.is_null() => *base = overlay.clone(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_paths_walk_nested_objects() {
        let v = json!({"hair": {"color": "red", "style": "curly"}, "build": "lean", "features": ["scar"]});
        assert_eq!(
            leaf_paths(&v),
            vec!["build", "features", "hair.color", "hair.style"]
        );
    }

    #[test]
    fn leaf_paths_of_scalar_is_root() {
        assert_eq!(leaf_paths(&json!("raw")), vec![String::new()]);
        assert!(leaf_paths(&Value::Null).is_empty());
    }

    #[test]
    fn get_resolves_nested_and_missing() {
        let v = json!({"hair": {"color": "red"}});
        assert_eq!(get(&v, "hair.color"), Some(&json!("red")));
        assert_eq!(get(&v, "hair.style"), None);
        assert_eq!(get(&v, "eyes.color"), None);
    }

    #[test]
    fn remove_prunes_empty_parents() {
        let mut v = json!({"hair": {"color": "red"}, "build": "lean"});
        assert!(remove(&mut v, "hair.color"));
        assert_eq!(v, json!({"build": "lean"}));
        assert!(!remove(&mut v, "hair.color"));
    }

    #[test]
    fn deep_merge_overwrites_only_present_leaves() {
        let mut base = json!({"hair": {"color": "red", "style": "curly"}, "build": "lean"});
        deep_merge(&mut base, &json!({"hair": {"color": "blonde"}}));
        assert_eq!(
            base,
            json!({"hair": {"color": "blonde", "style": "curly"}, "build": "lean"})
        );
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let mut base = json!({"traits": ["shy"]});
        deep_merge(&mut base, &json!({"traits": ["bold", "witty"]}));
        assert_eq!(base, json!({"traits": ["bold", "witty"]}));
    }

    #[test]
    fn join_handles_empty_relative() {
        assert_eq!(join("appearance", ""), "appearance");
        assert_eq!(join("appearance", "hair.color"), "appearance.hair.color");
    }
}
