//! Path addressing over schema trees
//!
//! A [`TargetPath`] is a list of raw steps exactly as authored. Whether a step
//! is an object key or an array index is decided when the path is applied,
//! from the runtime type of the container it lands on: objects take the step
//! as a key, arrays require it to parse as a non-negative integer. The same
//! textual step `"2"` therefore means key `"2"` in an object and element 2 in
//! an array.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Failure to address a location in a tree
///
/// `at` is the path prefix (rendered as a JSON pointer) where resolution
/// stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path not found at '{at}'")]
    PathNotFound { at: String },

    #[error("type mismatch at '{at}': expected {expected}, found {found}")]
    TypeMismatch {
        at: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("index {index} out of range at '{at}' (length {len})")]
    IndexOutOfRange { at: String, index: usize, len: usize },

    #[error("key already exists at '{at}'")]
    KeyExists { at: String },
}

/// How [`write`] treats the final step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite whatever sits at the final step (or append at `len`)
    Replace,
    /// Add a new key or shift-insert an array element; never overwrites
    Insert,
}

/// A step classified against its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> PathStep<'a> {
    /// Interpret `raw` against the container it is about to address.
    pub fn classify(container: &Value, raw: &'a str, at: impl FnOnce() -> String) -> Result<Self, PathError> {
        match container {
            Value::Object(_) => Ok(PathStep::Key(raw)),
            Value::Array(_) => parse_index(raw).map(PathStep::Index).ok_or_else(|| PathError::TypeMismatch {
                at: at(),
                expected: "array index",
                found: "object key",
            }),
            other => Err(PathError::TypeMismatch {
                at: at(),
                expected: "object or array",
                found: value_kind(other),
            }),
        }
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Name of a value's JSON type, for diagnostics
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declarative path into a schema tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawPath", into = "Vec<String>")]
pub struct TargetPath(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Pointer(String),
    Steps(Vec<RawStep>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    Key(String),
    Index(u64),
}

impl From<RawPath> for TargetPath {
    fn from(raw: RawPath) -> Self {
        match raw {
            RawPath::Pointer(pointer) => TargetPath::from_pointer(&pointer),
            RawPath::Steps(steps) => TargetPath(
                steps
                    .into_iter()
                    .map(|step| match step {
                        RawStep::Key(key) => key,
                        RawStep::Index(index) => index.to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

impl From<TargetPath> for Vec<String> {
    fn from(path: TargetPath) -> Self {
        path.0
    }
}

impl<S: Into<String>> FromIterator<S> for TargetPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TargetPath(iter.into_iter().map(Into::into).collect())
    }
}

impl TargetPath {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        steps.into_iter().collect()
    }

    /// The empty path, addressing the whole tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated pointer (`/properties/a~1b`); the leading
    /// slash is optional and `"/"` or `""` address the root.
    pub fn from_pointer(pointer: &str) -> Self {
        let body = pointer.strip_prefix('/').unwrap_or(pointer);
        if body.is_empty() {
            return Self::root();
        }
        body.split('/')
            .map(|step| step.replace("~1", "/").replace("~0", "~"))
            .collect()
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_pointer(&self) -> String {
        render(&self.0)
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

pub(crate) fn render(steps: &[String]) -> String {
    steps
        .iter()
        .map(|step| format!("/{}", step.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Walk `path` and return the node it addresses.
pub fn read<'v>(tree: &'v Value, path: &TargetPath) -> Result<&'v Value, PathError> {
    let steps = path.steps();
    let mut current = tree;
    for (depth, raw) in steps.iter().enumerate() {
        let at = || render(&steps[..=depth]);
        current = match (PathStep::classify(current, raw, at)?, current) {
            (PathStep::Key(key), Value::Object(map)) => {
                map.get(key).ok_or_else(|| PathError::PathNotFound { at: at() })?
            }
            (PathStep::Index(index), Value::Array(items)) => items.get(index).ok_or_else(|| PathError::IndexOutOfRange {
                at: at(),
                index,
                len: items.len(),
            })?,
            (_, other) => return Err(mismatch(at(), other)),
        };
    }
    Ok(current)
}

/// Resolve every step of `steps` to an existing node, mutably.
fn node_mut<'v>(tree: &'v mut Value, steps: &[String]) -> Result<&'v mut Value, PathError> {
    let mut current = tree;
    for (depth, raw) in steps.iter().enumerate() {
        let at = || render(&steps[..=depth]);
        let step = PathStep::classify(current, raw, at)?;
        current = match (step, current) {
            (PathStep::Key(key), Value::Object(map)) => {
                map.get_mut(key).ok_or_else(|| PathError::PathNotFound { at: at() })?
            }
            (PathStep::Index(index), Value::Array(items)) => {
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or_else(|| PathError::IndexOutOfRange { at: at(), index, len })?
            }
            (_, other) => return Err(mismatch(at(), other)),
        };
    }
    Ok(current)
}

fn mismatch(at: String, found: &Value) -> PathError {
    PathError::TypeMismatch {
        at,
        expected: "object or array",
        found: value_kind(found),
    }
}

/// Place `value` at `path`.
///
/// Every step but the last must already exist. Object targets are replaced
/// wholesale, never merged.
pub fn write(tree: &mut Value, path: &TargetPath, value: Value, mode: WriteMode) -> Result<(), PathError> {
    let Some((last, parents)) = path.steps().split_last() else {
        return match mode {
            WriteMode::Replace => {
                *tree = value;
                Ok(())
            }
            WriteMode::Insert => Err(PathError::KeyExists { at: String::new() }),
        };
    };

    let parent = node_mut(tree, parents)?;
    let at = || path.to_pointer();
    match (PathStep::classify(parent, last, at)?, parent) {
        (PathStep::Key(key), Value::Object(map)) => {
            if mode == WriteMode::Insert && map.contains_key(key) {
                return Err(PathError::KeyExists { at: at() });
            }
            map.insert(key.to_string(), value);
        }
        (PathStep::Index(index), Value::Array(items)) => {
            let len = items.len();
            match mode {
                WriteMode::Replace if index < len => items[index] = value,
                WriteMode::Replace if index == len => items.push(value),
                WriteMode::Insert if index <= len => items.insert(index, value),
                _ => return Err(PathError::IndexOutOfRange { at: at(), index, len }),
            }
        }
        (_, other) => return Err(mismatch(at(), other)),
    }
    Ok(())
}

/// Detach and return the node at `path`. The root itself cannot be removed.
pub fn remove(tree: &mut Value, path: &TargetPath) -> Result<Value, PathError> {
    let Some((last, parents)) = path.steps().split_last() else {
        return Err(PathError::PathNotFound { at: String::new() });
    };

    let parent = node_mut(tree, parents)?;
    let at = || path.to_pointer();
    match (PathStep::classify(parent, last, at)?, parent) {
        (PathStep::Key(key), Value::Object(map)) => {
            map.shift_remove(key).ok_or_else(|| PathError::PathNotFound { at: at() })
        }
        (PathStep::Index(index), Value::Array(items)) => {
            let len = items.len();
            if index < len {
                Ok(items.remove(index))
            } else {
                Err(PathError::IndexOutOfRange { at: at(), index, len })
            }
        }
        (_, other) => Err(mismatch(at(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(steps: &[&str]) -> TargetPath {
        TargetPath::new(steps.iter().copied())
    }

    #[test]
    fn test_read_nested() {
        let tree = json!({"a": {"b": [10, 20, {"c": true}]}});
        assert_eq!(read(&tree, &path(&["a", "b", "1"])).unwrap(), &json!(20));
        assert_eq!(read(&tree, &path(&["a", "b", "2", "c"])).unwrap(), &json!(true));
        assert_eq!(read(&tree, &TargetPath::root()).unwrap(), &tree);
    }

    #[test]
    fn test_read_failures() {
        let tree = json!({"a": {"b": [10]}});
        assert_eq!(
            read(&tree, &path(&["x", "y"])).unwrap_err(),
            PathError::PathNotFound { at: "/x".to_string() }
        );
        assert_eq!(
            read(&tree, &path(&["a", "b", "1"])).unwrap_err(),
            PathError::IndexOutOfRange { at: "/a/b/1".to_string(), index: 1, len: 1 }
        );
        assert!(matches!(
            read(&tree, &path(&["a", "b", "0", "z"])).unwrap_err(),
            PathError::TypeMismatch { found: "number", .. }
        ));
    }

    #[test]
    fn test_numeric_step_depends_on_container() {
        let tree = json!({"2": "key", "list": ["a", "b", "c"]});
        assert_eq!(read(&tree, &path(&["2"])).unwrap(), &json!("key"));
        assert_eq!(read(&tree, &path(&["list", "2"])).unwrap(), &json!("c"));
        assert!(matches!(
            read(&tree, &path(&["list", "two"])).unwrap_err(),
            PathError::TypeMismatch { expected: "array index", .. }
        ));
    }

    #[test]
    fn test_replace_supplants_whole_object() {
        let mut tree = json!({"a": {"keep": 1, "drop": 2}});
        write(&mut tree, &path(&["a"]), json!({"keep": 3}), WriteMode::Replace).unwrap();
        assert_eq!(tree, json!({"a": {"keep": 3}}));
    }

    #[test]
    fn test_replace_creates_missing_leaf_key_only() {
        let mut tree = json!({"a": {}});
        write(&mut tree, &path(&["a", "b"]), json!(1), WriteMode::Replace).unwrap();
        assert_eq!(tree, json!({"a": {"b": 1}}));

        let err = write(&mut tree, &path(&["x", "y"]), json!(1), WriteMode::Replace).unwrap_err();
        assert_eq!(err, PathError::PathNotFound { at: "/x".to_string() });
    }

    #[test]
    fn test_replace_array_and_append() {
        let mut tree = json!({"list": [1, 2]});
        write(&mut tree, &path(&["list", "0"]), json!(9), WriteMode::Replace).unwrap();
        write(&mut tree, &path(&["list", "2"]), json!(3), WriteMode::Replace).unwrap();
        assert_eq!(tree, json!({"list": [9, 2, 3]}));

        let err = write(&mut tree, &path(&["list", "5"]), json!(0), WriteMode::Replace).unwrap_err();
        assert_eq!(err, PathError::IndexOutOfRange { at: "/list/5".to_string(), index: 5, len: 3 });
    }

    #[test]
    fn test_insert_mode() {
        let mut tree = json!({"list": [1, 3], "obj": {"a": 1}});
        write(&mut tree, &path(&["list", "1"]), json!(2), WriteMode::Insert).unwrap();
        assert_eq!(tree["list"], json!([1, 2, 3]));

        write(&mut tree, &path(&["obj", "b"]), json!(2), WriteMode::Insert).unwrap();
        let err = write(&mut tree, &path(&["obj", "a"]), json!(5), WriteMode::Insert).unwrap_err();
        assert_eq!(err, PathError::KeyExists { at: "/obj/a".to_string() });
        assert_eq!(tree["obj"], json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_replace_root() {
        let mut tree = json!({"a": 1});
        write(&mut tree, &TargetPath::root(), json!([]), WriteMode::Replace).unwrap();
        assert_eq!(tree, json!([]));
    }

    #[test]
    fn test_remove_keeps_key_order() {
        let mut tree = json!({"a": 1, "b": 2, "c": 3});
        assert_eq!(remove(&mut tree, &path(&["a"])).unwrap(), json!(1));
        let keys: Vec<_> = tree.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "c"]);

        assert!(matches!(remove(&mut tree, &path(&["a"])), Err(PathError::PathNotFound { .. })));
        assert!(remove(&mut tree, &TargetPath::root()).is_err());
    }

    #[test]
    fn test_remove_array_element_shifts_tail() {
        let mut tree = json!({"list": [1, 2, 3]});
        assert_eq!(remove(&mut tree, &path(&["list", "1"])).unwrap(), json!(2));
        assert_eq!(tree["list"], json!([1, 3]));

        let err = remove(&mut tree, &path(&["list", "2"])).unwrap_err();
        assert_eq!(err, PathError::IndexOutOfRange { at: "/list/2".to_string(), index: 2, len: 2 });
        assert_eq!(tree["list"], json!([1, 3]));
    }

    #[test]
    fn test_insert_past_end_is_out_of_range() {
        let mut tree = json!({"list": [1]});
        write(&mut tree, &path(&["list", "1"]), json!(2), WriteMode::Insert).unwrap();
        assert_eq!(tree["list"], json!([1, 2]));

        let err = write(&mut tree, &path(&["list", "3"]), json!(4), WriteMode::Insert).unwrap_err();
        assert_eq!(err, PathError::IndexOutOfRange { at: "/list/3".to_string(), index: 3, len: 2 });
        assert_eq!(tree["list"], json!([1, 2]));
    }

    #[test]
    fn test_pointer_round_trip_escapes() {
        let p = TargetPath::from_pointer("/properties/minecraft:a~1b/items/0");
        assert_eq!(p.steps(), &["properties", "minecraft:a/b", "items", "0"]);
        assert_eq!(p.to_pointer(), "/properties/minecraft:a~1b/items/0");
        assert!(TargetPath::from_pointer("/").is_root());
    }

    #[test]
    fn test_deserialize_mixed_steps() {
        let p: TargetPath = serde_json::from_value(json!(["enum", 4])).unwrap();
        assert_eq!(p.steps(), &["enum", "4"]);
        let q: TargetPath = serde_json::from_value(json!("properties/a")).unwrap();
        assert_eq!(q.steps(), &["properties", "a"]);
    }
}
