//! Change records: the declarative unit of schema evolution

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::Result;
use crate::pointer::{self, PathError, TargetPath, WriteMode};
use crate::version::VersionOrdinal;

/// Kind of structural edit an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Replace the subtree at the target (leaf key may be new)
    Modify,
    /// Add a key that must not exist yet, or insert into an array
    Add,
    /// Delete the target; the operation's value is ignored
    Remove,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Modify => "modify",
            ActionKind::Add => "add",
            ActionKind::Remove => "remove",
        }
    }
}

/// One edit inside a change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub action: ActionKind,
    pub target: TargetPath,
    #[serde(default)]
    pub value: Value,
}

impl Operation {
    pub fn modify(target: TargetPath, value: Value) -> Self {
        Self { action: ActionKind::Modify, target, value }
    }

    pub fn add(target: TargetPath, value: Value) -> Self {
        Self { action: ActionKind::Add, target, value }
    }

    pub fn remove(target: TargetPath) -> Self {
        Self { action: ActionKind::Remove, target, value: Value::Null }
    }

    /// Apply this operation in place.
    pub fn apply(&self, tree: &mut Value) -> std::result::Result<(), PathError> {
        match self.action {
            ActionKind::Modify => pointer::write(tree, &self.target, self.value.clone(), WriteMode::Replace),
            ActionKind::Add => pointer::write(tree, &self.target, self.value.clone(), WriteMode::Insert),
            ActionKind::Remove => pointer::remove(tree, &self.target).map(drop),
        }
    }
}

/// An operation inside a record failed to apply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation {index} ({action}) failed: {source}")]
pub struct OperationFailure {
    pub index: usize,
    pub action: &'static str,
    #[source]
    pub source: PathError,
}

/// All edits introduced at one format version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub version: VersionOrdinal,
    pub operations: Vec<Operation>,
}

impl ChangeRecord {
    /// Create a record from a version tag
    pub fn new(version: &str, operations: Vec<Operation>) -> Result<Self> {
        Ok(Self {
            version: VersionOrdinal::parse(version)?,
            operations,
        })
    }

    pub fn version(&self) -> &VersionOrdinal {
        &self.version
    }

    /// Apply every operation in declared order.
    ///
    /// The record is all-or-nothing: operations run against a scratch copy
    /// that replaces `tree` only once all of them succeed.
    pub fn apply(&self, tree: &mut Value) -> std::result::Result<(), OperationFailure> {
        let mut scratch = tree.clone();
        for (index, operation) in self.operations.iter().enumerate() {
            operation.apply(&mut scratch).map_err(|source| OperationFailure {
                index,
                action: operation.action.as_str(),
                source,
            })?;
        }
        *tree = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target(steps: &[&str]) -> TargetPath {
        TargetPath::new(steps.iter().copied())
    }

    #[test]
    fn test_deserialize_declarative_record() {
        let record: ChangeRecord = serde_json::from_value(json!({
            "version": "1.21.40",
            "operations": [
                {"action": "modify", "target": ["properties", "count"], "value": {"type": "integer"}},
                {"action": "remove", "target": ["properties", "legacy"]}
            ]
        }))
        .unwrap();

        assert_eq!(record.version.to_string(), "1.21.40");
        assert_eq!(record.operations.len(), 2);
        assert_eq!(record.operations[1].action, ActionKind::Remove);
        assert_eq!(record.operations[1].value, Value::Null);
    }

    #[test]
    fn test_rejects_unknown_action_and_bad_version() {
        let unknown = serde_json::from_value::<ChangeRecord>(json!({
            "version": "1.0.0",
            "operations": [{"action": "merge", "target": [], "value": 1}]
        }));
        assert!(unknown.is_err());

        let bad_version = serde_json::from_value::<ChangeRecord>(json!({
            "version": "1.x",
            "operations": []
        }));
        assert!(bad_version.is_err());
    }

    #[test]
    fn test_later_operation_sees_earlier_one() {
        let record = ChangeRecord::new(
            "1.1.0",
            vec![
                Operation::modify(target(&["a"]), json!({})),
                Operation::modify(target(&["a", "b"]), json!(1)),
            ],
        )
        .unwrap();

        let mut tree = json!({});
        record.apply(&mut tree).unwrap();
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_failed_record_leaves_tree_untouched() {
        let record = ChangeRecord::new(
            "1.1.0",
            vec![
                Operation::modify(target(&["a"]), json!(2)),
                Operation::modify(target(&["x", "y"]), json!(3)),
            ],
        )
        .unwrap();

        let mut tree = json!({"a": 1});
        let failure = record.apply(&mut tree).unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.source, PathError::PathNotFound { at: "/x".to_string() });
        assert_eq!(tree, json!({"a": 1}));
    }

    #[test]
    fn test_add_and_remove_actions() {
        let record = ChangeRecord::new(
            "1.2.0",
            vec![
                Operation::add(target(&["enum", "2"]), json!("c")),
                Operation::remove(target(&["deprecated"])),
            ],
        )
        .unwrap();

        let mut tree = json!({"enum": ["a", "b"], "deprecated": true});
        record.apply(&mut tree).unwrap();
        assert_eq!(tree, json!({"enum": ["a", "b", "c"]}));
    }
}
