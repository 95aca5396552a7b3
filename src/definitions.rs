//! Shared definition registry
//!
//! Definitions are named subtrees that any format may reference with a
//! `{"$ref": "#/definitions/<name>"}` marker instead of repeating them.
//! Expansion either keeps markers and ships the referenced definitions along
//! with the tree ([`ExpansionPolicy::Preserve`]) or substitutes definition
//! bodies in place ([`ExpansionPolicy::Inline`]).
//!
//! Inlining is only possible for definitions outside a reference cycle. The
//! registry keeps a dependency graph of definitions and marks every member of
//! a strongly connected component (and every self-referencing definition) as
//! recursive; markers to those always stay symbolic.

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::annotations::EXAMPLES_SOURCE_KEYWORD;
use crate::error::{Result, SchemaError};
use crate::filter::{FilterExpr, FILTERS_DEFINITION};

/// Root key under which definitions travel with a schema
pub const DEFINITIONS_KEY: &str = "definitions";

/// Prefix of a definition reference
pub const REF_PREFIX: &str = "#/definitions/";

/// Marker referencing definition `name`
pub fn reference(name: &str) -> Value {
    json!({ "$ref": format!("{REF_PREFIX}{name}") })
}

/// Definition name a node refers to, if it is a reference marker
pub fn reference_target(node: &Value) -> Option<&str> {
    node.as_object()?
        .get("$ref")?
        .as_str()?
        .strip_prefix(REF_PREFIX)
}

/// How reference markers are treated during expansion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    /// Keep markers; attach referenced definitions under the root
    #[default]
    Preserve,
    /// Substitute acyclic definitions in place
    Inline,
}

/// Named, immutable shared subtrees
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: IndexMap<String, Value>,
    recursive: HashSet<String>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the definitions every bundled format relies on
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(FILTERS_DEFINITION, FilterExpr::definition())?;
        registry.register(
            "block_reference",
            json!({
                "title": "Block Reference",
                "oneOf": [
                    {"type": "string", EXAMPLES_SOURCE_KEYWORD: "block_identifiers"},
                    {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string", EXAMPLES_SOURCE_KEYWORD: "block_identifiers"},
                            "states": {"type": "object"}
                        }
                    }
                ]
            }),
        )?;
        Ok(registry)
    }

    /// Add a definition. Names are unique for the registry's lifetime.
    pub fn register(&mut self, name: impl Into<String>, tree: Value) -> Result<()> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(SchemaError::DuplicateDefinitionName(name));
        }
        self.definitions.insert(name, tree);
        self.analyze();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether `name` takes part in a reference cycle
    pub fn is_recursive(&self, name: &str) -> bool {
        self.recursive.contains(name)
    }

    /// Recompute the set of recursive definitions.
    fn analyze(&mut self) {
        let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(self.definitions.len(), self.definitions.len());
        let indices: HashMap<&str, NodeIndex> = self
            .definitions
            .keys()
            .map(|name| (name.as_str(), graph.add_node(name.as_str())))
            .collect();

        let mut self_loops = HashSet::new();
        for (name, body) in &self.definitions {
            for target in references(body) {
                if let Some(&to) = indices.get(target) {
                    graph.add_edge(indices[name.as_str()], to, ());
                    if target == name.as_str() {
                        self_loops.insert(name.clone());
                    }
                }
            }
        }

        let mut recursive = self_loops;
        for component in kosaraju_scc(&graph) {
            if component.len() > 1 {
                recursive.extend(component.iter().map(|&idx| graph[idx].to_string()));
            }
        }
        self.recursive = recursive;
    }

    /// Resolve registry references in `tree` under `policy`.
    ///
    /// Markers in the schema's own tree whose name is defined locally under
    /// its root `definitions` refer to that local entry and are left alone.
    /// Markers inside registry bodies always mean the registry entry; if that
    /// entry would have to travel under a name the schema already defines,
    /// expansion fails with [`ExpandError::LocalConflict`]. Markers naming
    /// unknown definitions pass through unchanged.
    pub fn expand(&self, tree: &Value, policy: ExpansionPolicy) -> std::result::Result<Value, ExpandError> {
        let local: HashSet<String> = tree
            .get(DEFINITIONS_KEY)
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();

        match policy {
            ExpansionPolicy::Preserve => self.expand_preserve(tree, &local),
            ExpansionPolicy::Inline => self.expand_inline(tree, &local),
        }
    }

    fn expand_preserve(&self, tree: &Value, local: &HashSet<String>) -> std::result::Result<Value, ExpandError> {
        let mut needed = IndexSet::new();
        let mut queue: Vec<&str> = references(tree)
            .into_iter()
            .filter(|name| !local.contains(*name))
            .collect();
        while let Some(name) = queue.pop() {
            if !self.contains(name) || !needed.insert(name.to_string()) {
                continue;
            }
            queue.extend(references(&self.definitions[name]));
        }
        // Attach in registry order so output is stable.
        let attached = self
            .names()
            .filter(|name| needed.contains(*name))
            .map(|name| (name.to_string(), self.definitions[name].clone()))
            .collect();
        attach(tree.clone(), attached, local)
    }

    fn expand_inline(&self, tree: &Value, local: &HashSet<String>) -> std::result::Result<Value, ExpandError> {
        let mut needed = IndexSet::new();
        let expanded = self.inline(tree, local, &mut needed);

        let registry_only = HashSet::new();
        let mut attached = Map::new();
        let mut next = 0;
        while let Some(name) = needed.get_index(next).cloned() {
            next += 1;
            let body = self.inline(&self.definitions[&name], &registry_only, &mut needed);
            attached.insert(name, body);
        }

        // Local definitions are expanded in place by the walk above.
        attach(expanded, attached, local)
    }

    /// `local` holds the names that markers at this position may mean
    /// locally; it is empty inside registry bodies.
    fn inline(&self, node: &Value, local: &HashSet<String>, needed: &mut IndexSet<String>) -> Value {
        if let Some(name) = reference_target(node) {
            if !local.contains(name) {
                if let Some(body) = self.definitions.get(name) {
                    if self.is_recursive(name) {
                        debug!(definition = name, "cyclic definition kept symbolic");
                        needed.insert(name.to_string());
                    } else {
                        let body = self.inline(body, &HashSet::new(), needed);
                        return merge_siblings(body, node, |v| self.inline(v, local, needed));
                    }
                }
            }
        }

        match node {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.inline(value, local, needed)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.inline(item, local, needed)).collect()),
            scalar => scalar.clone(),
        }
    }
}

/// Why registry definitions could not be attached to a schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("definition '{0}' is needed from the registry but the schema defines it locally")]
    LocalConflict(String),

    #[error("schema root is not an object; cannot attach definition '{0}'")]
    RootNotObject(String),

    #[error("root 'definitions' is not an object; cannot attach definition '{0}'")]
    DefinitionsNotObject(String),
}

/// Overlay keys that sat next to an inlined `$ref` onto the inlined body.
fn merge_siblings(body: Value, marker: &Value, mut expand: impl FnMut(&Value) -> Value) -> Value {
    let siblings: Vec<_> = marker
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, _)| key.as_str() != "$ref")
        .collect();
    if siblings.is_empty() {
        return body;
    }

    match body {
        Value::Object(mut map) => {
            for (key, value) in siblings {
                map.insert(key.clone(), expand(value));
            }
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("allOf".to_string(), Value::Array(vec![other]));
            for (key, value) in siblings {
                map.insert(key.clone(), expand(value));
            }
            Value::Object(map)
        }
    }
}

/// Add `attached` under the root `definitions`.
fn attach(
    mut tree: Value,
    attached: Map<String, Value>,
    local: &HashSet<String>,
) -> std::result::Result<Value, ExpandError> {
    let Some(first) = attached.keys().next().cloned() else {
        return Ok(tree);
    };
    if let Some(name) = attached.keys().find(|name| local.contains(*name)) {
        return Err(ExpandError::LocalConflict(name.clone()));
    }

    let root = tree.as_object_mut().ok_or_else(|| ExpandError::RootNotObject(first.clone()))?;
    let defs = root
        .entry(DEFINITIONS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(ExpandError::DefinitionsNotObject(first))?;
    defs.extend(attached);
    Ok(tree)
}

/// Names of all definition markers in `tree`, in document order, deduplicated
pub fn references(tree: &Value) -> Vec<&str> {
    fn walk<'a>(node: &'a Value, out: &mut Vec<&'a str>) {
        if let Some(name) = reference_target(node) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        match node {
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(tree, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(entries: &[(&str, Value)]) -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new();
        for (name, body) in entries {
            registry.register(*name, body.clone()).unwrap();
        }
        registry
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = DefinitionRegistry::new();
        registry.register("range", json!({"type": "array"})).unwrap();
        let err = registry.register("range", json!({})).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDefinitionName(ref n) if n == "range"));
    }

    #[test]
    fn test_recursion_detection() {
        let registry = registry(&[
            ("self_ref", json!({"items": reference("self_ref")})),
            ("a", json!({"properties": {"b": reference("b")}})),
            ("b", json!({"properties": {"a": reference("a")}})),
            ("leaf", json!({"type": "string"})),
            ("uses_leaf", json!({"items": reference("leaf")})),
        ]);
        assert!(registry.is_recursive("self_ref"));
        assert!(registry.is_recursive("a"));
        assert!(registry.is_recursive("b"));
        assert!(!registry.is_recursive("leaf"));
        assert!(!registry.is_recursive("uses_leaf"));
    }

    #[test]
    fn test_preserve_attaches_transitive_definitions() {
        let registry = registry(&[
            ("leaf", json!({"type": "string"})),
            ("wrapper", json!({"items": reference("leaf")})),
            ("unused", json!({"type": "null"})),
        ]);
        let tree = json!({"properties": {"w": reference("wrapper")}});
        let expanded = registry.expand(&tree, ExpansionPolicy::Preserve).unwrap();

        assert_eq!(expanded["properties"]["w"], reference("wrapper"));
        assert_eq!(
            expanded[DEFINITIONS_KEY],
            json!({"leaf": {"type": "string"}, "wrapper": {"items": reference("leaf")}})
        );
    }

    #[test]
    fn test_inline_substitutes_acyclic() {
        let registry = registry(&[
            ("leaf", json!({"type": "string"})),
            ("wrapper", json!({"type": "array", "items": reference("leaf")})),
        ]);
        let tree = json!({"properties": {"w": reference("wrapper")}});
        let expanded = registry.expand(&tree, ExpansionPolicy::Inline).unwrap();
        assert_eq!(
            expanded,
            json!({"properties": {"w": {"type": "array", "items": {"type": "string"}}}})
        );
    }

    #[test]
    fn test_inline_keeps_cycles_symbolic() {
        let registry = DefinitionRegistry::with_builtins().unwrap();
        let tree = json!({"properties": {"filters": reference(FILTERS_DEFINITION)}});
        let expanded = registry.expand(&tree, ExpansionPolicy::Inline).unwrap();

        assert_eq!(expanded["properties"]["filters"], reference(FILTERS_DEFINITION));
        assert_eq!(expanded[DEFINITIONS_KEY][FILTERS_DEFINITION], FilterExpr::definition());
    }

    #[test]
    fn test_inline_merges_sibling_keys() {
        let registry = registry(&[("leaf", json!({"type": "string", "description": "base"}))]);
        let tree = json!({"$ref": "#/definitions/leaf", "description": "override"});
        let expanded = registry.expand(&tree, ExpansionPolicy::Inline).unwrap();
        assert_eq!(expanded, json!({"type": "string", "description": "override"}));
    }

    #[test]
    fn test_local_definitions_shadow_registry() {
        let registry = registry(&[("leaf", json!({"type": "string"}))]);
        let tree = json!({
            "definitions": {"leaf": {"type": "integer"}},
            "properties": {"x": reference("leaf")}
        });
        assert_eq!(registry.expand(&tree, ExpansionPolicy::Inline).unwrap(), tree);
        assert_eq!(registry.expand(&tree, ExpansionPolicy::Preserve).unwrap(), tree);
    }

    #[test]
    fn test_unknown_reference_passes_through() {
        let registry = DefinitionRegistry::new();
        let tree = json!({"items": reference("missing")});
        assert_eq!(registry.expand(&tree, ExpansionPolicy::Inline).unwrap(), tree);
        assert_eq!(registry.expand(&tree, ExpansionPolicy::Preserve).unwrap(), tree);
    }

    #[test]
    fn test_registry_bodies_ignore_local_names() {
        let registry = registry(&[
            ("leaf", json!({"type": "string"})),
            ("wrapper", json!({"type": "array", "items": reference("leaf")})),
        ]);
        let tree = json!({
            "definitions": {"leaf": {"type": "integer"}},
            "properties": {"own": reference("leaf"), "w": reference("wrapper")}
        });

        let inlined = registry.expand(&tree, ExpansionPolicy::Inline).unwrap();
        assert_eq!(inlined["properties"]["own"], reference("leaf"));
        assert_eq!(inlined["properties"]["w"], json!({"type": "array", "items": {"type": "string"}}));
        assert_eq!(inlined[DEFINITIONS_KEY], json!({"leaf": {"type": "integer"}}));

        assert_eq!(
            registry.expand(&tree, ExpansionPolicy::Preserve).unwrap_err(),
            ExpandError::LocalConflict("leaf".to_string())
        );
    }

    #[test]
    fn test_local_name_conflicts_with_attached_cycle() {
        let registry = DefinitionRegistry::with_builtins().unwrap();
        let tree = json!({
            "definitions": {FILTERS_DEFINITION: {"type": "string"}},
            "properties": {"f": reference("block_reference"), "g": {"items": reference("cycle_user")}}
        });
        // Nothing recursive is needed: the local `filters` is never touched.
        assert!(registry.expand(&tree, ExpansionPolicy::Inline).is_ok());

        let mut registry = registry;
        registry.register("cycle_user", json!({"items": reference(FILTERS_DEFINITION)})).unwrap();
        assert_eq!(
            registry.expand(&tree, ExpansionPolicy::Inline).unwrap_err(),
            ExpandError::LocalConflict(FILTERS_DEFINITION.to_string())
        );
    }

    #[test]
    fn test_unattachable_definitions_are_errors() {
        let registry = registry(&[("leaf", json!({"type": "string"}))]);

        let array_root = json!([reference("leaf")]);
        assert_eq!(
            registry.expand(&array_root, ExpansionPolicy::Preserve).unwrap_err(),
            ExpandError::RootNotObject("leaf".to_string())
        );

        let scalar_defs = json!({"definitions": 3, "items": reference("leaf")});
        assert_eq!(
            registry.expand(&scalar_defs, ExpansionPolicy::Preserve).unwrap_err(),
            ExpandError::DefinitionsNotObject("leaf".to_string())
        );

        // Inline has nothing to attach for acyclic definitions.
        assert_eq!(
            registry.expand(&array_root, ExpansionPolicy::Inline).unwrap(),
            json!([{"type": "string"}])
        );
    }

    #[test]
    fn test_references_in_document_order() {
        let tree = json!({"a": reference("x"), "b": [reference("y"), reference("x")]});
        assert_eq!(references(&tree), vec!["x", "y"]);
    }
}
