//! Path Accessor - get and set by dotted path.
//!
//! `set_path` is copy-on-write: every container on the path is shallow
//! cloned and the untouched siblings are shared with the input.

use std::rc::Rc;

use super::value::{Map, Value};

/// Something that can be split into path segments.
pub trait KeyPath {
    fn segments(&self) -> Vec<&str>;
}

impl KeyPath for str {
    fn segments(&self) -> Vec<&str> {
        self.split('.').collect()
    }
}

impl KeyPath for String {
    fn segments(&self) -> Vec<&str> {
        self.as_str().segments()
    }
}

impl<S: AsRef<str>> KeyPath for [S] {
    fn segments(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

impl<S: AsRef<str>, const N: usize> KeyPath for [S; N] {
    fn segments(&self) -> Vec<&str> {
        self.as_slice().segments()
    }
}

impl<S: AsRef<str>> KeyPath for Vec<S> {
    fn segments(&self) -> Vec<&str> {
        self.as_slice().segments()
    }
}

/// Read the value at `path`, or `Undefined` if any step is missing.
pub fn get_path<P: KeyPath + ?Sized>(value: &Value, path: &P) -> Value {
    path.segments()
        .into_iter()
        .fold(value.clone(), |current, segment| current.get(segment))
}

/// How far past its end an array may be grown by a single numeric segment.
/// Indexes beyond that are stored as mapping keys instead.
const MAX_ARRAY_GAP: usize = 1024;

/// Return a copy of `value` with `new_value` stored at `path`.
///
/// Missing containers are created: array-shaped when the segment is numeric,
/// mapping-shaped otherwise. The input is never modified.
pub fn set_path<P: KeyPath + ?Sized>(value: &Value, path: &P, new_value: Value) -> Value {
    set_segments(value, &path.segments(), new_value)
}

fn set_segments(current: &Value, segments: &[&str], new_value: Value) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return new_value;
    };

    let child = set_segments(&current.get(head), rest, new_value);

    let len = current.as_array().map_or(0, |items| items.len());
    let index = head
        .parse::<usize>()
        .ok()
        .filter(|index| index.checked_sub(len).is_none_or(|gap| gap < MAX_ARRAY_GAP));

    match (current, index) {
        (Value::Map(map), _) => {
            let mut map = Map::clone(map);
            map.insert(head.to_string(), child);
            Value::Map(Rc::new(map))
        }
        (Value::Array(items), Some(index)) => {
            let mut items = Vec::clone(items);
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = child;
            Value::Array(Rc::new(items))
        }
        (Value::Array(items), None) => {
            let mut map: Map = items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item.clone()))
                .collect();
            map.insert(head.to_string(), child);
            Value::Map(Rc::new(map))
        }
        (_, Some(index)) => {
            let mut items = vec![Value::Undefined; index + 1];
            items[index] = child;
            Value::Array(Rc::new(items))
        }
        (_, None) => {
            let mut map = Map::new();
            map.insert(head.to_string(), child);
            Value::Map(Rc::new(map))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_get_missing_is_undefined() {
        let empty = Value::map(Vec::<(String, Value)>::new());
        assert!(get_path(&empty, "x.y").is_undefined());
        assert!(get_path(&Value::Undefined, "x").is_undefined());
    }

    #[test]
    fn test_get_presplit_path() {
        let value = Value::from(json!({"user": {"names": ["ann", "bo"]}}));
        assert_eq!(get_path(&value, &["user", "names", "1"]).as_str(), Some("bo"));
        assert_eq!(get_path(&value, "user.names.0").as_str(), Some("ann"));
    }

    #[test]
    fn test_set_then_get() {
        let value = Value::map(Vec::<(String, Value)>::new());
        let updated = set_path(&value, "a.b", Value::from(5));
        assert_eq!(get_path(&updated, "a.b").as_f64(), Some(5.0));
        assert!(get_path(&value, "a").is_undefined(), "input untouched");
    }

    #[test]
    fn test_set_shares_siblings() {
        let value = Value::from(json!({"a": {"b": 1}, "c": {"d": 2}}));
        let updated = set_path(&value, "a.b", Value::from(3));

        assert!(!updated.identical(&value));
        assert!(!updated.get("a").identical(&value.get("a")));
        assert!(updated.get("c").identical(&value.get("c")), "sibling branch shared");
        assert_eq!(get_path(&value, "a.b").as_f64(), Some(1.0));
    }

    #[test]
    fn test_set_numeric_segment_creates_array() {
        let updated = set_path(&Value::Undefined, "list.2.name", Value::from("x"));
        let list = updated.get("list");
        assert_eq!(list.as_array().map(|items| items.len()), Some(3));
        assert_eq!(get_path(&updated, "list.2.name").as_str(), Some("x"));
        assert!(get_path(&updated, "list.0").is_undefined());
    }

    #[test]
    fn test_set_into_existing_array() {
        let value = Value::from(json!({"items": [1, 2, 3]}));
        let updated = set_path(&value, "items.1", Value::from(20));
        assert_eq!(get_path(&updated, "items.1").as_f64(), Some(20.0));
        assert_eq!(get_path(&value, "items.1").as_f64(), Some(2.0));
    }

    #[test]
    fn test_huge_index_becomes_mapping_key() {
        let updated = set_path(&Value::Undefined, "18446744073709551615", Value::from(1));
        assert!(updated.as_array().is_none());
        assert_eq!(get_path(&updated, "18446744073709551615").as_f64(), Some(1.0));

        let value = Value::from(json!({"list": ["a", "b"]}));
        let updated = set_path(&value, "list.99999999999", Value::from("far"));
        assert_eq!(get_path(&updated, "list.99999999999").as_str(), Some("far"));
        assert_eq!(get_path(&updated, "list.1").as_str(), Some("b"));
        assert_eq!(get_path(&value, "list").as_array().map(|items| items.len()), Some(2));
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof!["[a-z]{1,4}", "[0-3]"]
    }

    proptest! {
        #[test]
        fn prop_get_after_set(path in prop::collection::vec(segment(), 1..4), n in any::<i32>()) {
            let base = Value::from(json!({"a": {"b": [1, 2]}, "z": 1}));
            let updated = set_path(&base, &path, Value::from(n));
            prop_assert!(get_path(&updated, &path).identical(&Value::from(n)));
        }

        #[test]
        fn prop_set_never_mutates(path in prop::collection::vec(segment(), 1..4)) {
            let base = Value::from(json!({"a": {"b": [1, 2]}, "z": 1}));
            let before = get_path(&base, &path);
            let _ = set_path(&base, &path, Value::from("new"));
            prop_assert!(get_path(&base, &path).identical(&before));
            prop_assert_eq!(get_path(&base, "z").as_f64(), Some(1.0));
        }
    }
}
