//! Format descriptors
//!
//! One descriptor per document format: the base schema plus its change
//! timeline. Descriptors are validated once when built and never mutated
//! afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::change::ChangeRecord;
use crate::error::{Result, SchemaError};
use crate::version::VersionOrdinal;

/// Declarative form of a format, as authored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSource {
    #[serde(default)]
    pub file_match: Vec<String>,
    pub base_schema: Value,
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

/// A validated document format
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    id: String,
    file_match: Vec<String>,
    base_schema: Value,
    /// Sorted ascending by version
    changes: Vec<ChangeRecord>,
}

impl FormatDescriptor {
    /// Validate and build a descriptor.
    ///
    /// Changes may be given in any order; they are stored in version order.
    pub fn new(
        id: impl Into<String>,
        file_match: Vec<String>,
        base_schema: Value,
        mut changes: Vec<ChangeRecord>,
    ) -> Result<Self> {
        let id = id.into();

        let mut seen = HashSet::with_capacity(changes.len());
        for change in &changes {
            if !seen.insert(&change.version) {
                return Err(SchemaError::DuplicateVersion {
                    format: id,
                    version: change.version.to_string(),
                });
            }
            if change.operations.is_empty() {
                return Err(SchemaError::EmptyChangeRecord {
                    format: id,
                    version: change.version.to_string(),
                });
            }
        }

        changes.sort_by(|a, b| a.version.cmp(&b.version));

        Ok(Self {
            id,
            file_match,
            base_schema,
            changes,
        })
    }

    /// Build from the declarative `{fileMatch, baseSchema, changes}` shape
    pub fn from_source(id: impl Into<String>, source: FormatSource) -> Result<Self> {
        Self::new(id, source.file_match, source.base_schema, source.changes)
    }

    /// Parse a declarative JSON document and validate it
    pub fn from_json(id: impl Into<String>, json: &str) -> Result<Self> {
        let id = id.into();
        let source: FormatSource =
            serde_json::from_str(json).map_err(|e| SchemaError::invalid_source(format!("format '{id}'"), e))?;
        Self::from_source(id, source)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_match(&self) -> &[String] {
        &self.file_match
    }

    pub fn base_schema(&self) -> &Value {
        &self.base_schema
    }

    /// The timeline in ascending version order
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    /// Changes with `version <= requested`, oldest first
    pub fn applicable_changes<'a>(
        &'a self,
        requested: &'a VersionOrdinal,
    ) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.changes.iter().take_while(move |change| change.version <= *requested)
    }

    /// Newest version with a declared change
    pub fn latest_version(&self) -> Option<&VersionOrdinal> {
        self.changes.last().map(|change| &change.version)
    }
}
