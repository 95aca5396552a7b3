//! Non-validating annotation keywords
//!
//! Resolved trees may carry two keywords that the resolver passes through
//! untouched and that a JSON Schema validator must treat as annotations:
//!
//! - `molang`: the value may be a Molang expression. When the declared type
//!   admits a string, an external expression checker decides whether the
//!   string is well formed (see [`ExpressionValidator`]).
//! - `examplesSource`: one catalog name or a list of them
//!   (`"block_identifiers"`, `"feature_identifiers"`) an editor draws
//!   completions from. It never constrains validation.
//!
//! Keywords are only recognised in schema position. A property that happens
//! to be called `molang` inside `properties` is a property, not a marker.

use serde::Serialize;
use serde_json::Value;

use crate::pointer::render;

pub const MOLANG_KEYWORD: &str = "molang";
pub const EXAMPLES_SOURCE_KEYWORD: &str = "examplesSource";

/// Keywords whose value is a map of name to subschema
const SCHEMA_MAPS: [&str; 4] = ["properties", "patternProperties", "definitions", "$defs"];
/// Keywords whose value is a single subschema
const SCHEMA_SINGLE: [&str; 8] = [
    "items",
    "additionalProperties",
    "additionalItems",
    "not",
    "if",
    "then",
    "else",
    "contains",
];
/// Keywords whose value is an array of subschemas
const SCHEMA_LISTS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

/// Contract for the external Molang checker: pass or fail, no partial credit
pub trait ExpressionValidator {
    fn accepts(&self, expression: &str) -> bool;
}

impl<F> ExpressionValidator for F
where
    F: Fn(&str) -> bool,
{
    fn accepts(&self, expression: &str) -> bool {
        self(expression)
    }
}

/// What an annotation site declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Expression,
    ExampleSources { sources: Vec<String> },
}

/// An annotated subschema, located by JSON pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSite {
    pub pointer: String,
    #[serde(flatten)]
    pub annotation: Annotation,
}

/// Normalise an `examplesSource` value to a list of catalog names.
///
/// Returns `None` for anything other than a string or a list of strings.
pub fn example_sources(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(single) => Some(vec![single.clone()]),
        Value::Array(items) => items.iter().map(|item| item.as_str().map(str::to_string)).collect(),
        _ => None,
    }
}

/// Find every annotated subschema in `tree`.
pub fn collect(tree: &Value) -> Vec<AnnotationSite> {
    let mut sites = Vec::new();
    let mut path = Vec::new();
    visit_schema(tree, &mut path, &mut sites);
    sites
}

fn visit_schema(node: &Value, path: &mut Vec<String>, sites: &mut Vec<AnnotationSite>) {
    let Some(schema) = node.as_object() else {
        return;
    };

    if schema.get(MOLANG_KEYWORD).and_then(Value::as_bool) == Some(true) {
        sites.push(AnnotationSite {
            pointer: render(path),
            annotation: Annotation::Expression,
        });
    }
    if let Some(sources) = schema.get(EXAMPLES_SOURCE_KEYWORD).and_then(example_sources) {
        sites.push(AnnotationSite {
            pointer: render(path),
            annotation: Annotation::ExampleSources { sources },
        });
    }

    for (keyword, value) in schema {
        path.push(keyword.clone());
        if SCHEMA_MAPS.contains(&keyword.as_str()) {
            if let Some(children) = value.as_object() {
                for (name, child) in children {
                    path.push(name.clone());
                    visit_schema(child, path, sites);
                    path.pop();
                }
            }
        } else if SCHEMA_LISTS.contains(&keyword.as_str()) || (keyword == "items" && value.is_array()) {
            for (index, child) in value.as_array().into_iter().flatten().enumerate() {
                path.push(index.to_string());
                visit_schema(child, path, sites);
                path.pop();
            }
        } else if SCHEMA_SINGLE.contains(&keyword.as_str()) {
            visit_schema(value, path, sites);
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_sites() {
        let tree = json!({
            "type": "object",
            "properties": {
                "count": {"type": ["number", "string"], "molang": true},
                "places_block": {"type": "string", "examplesSource": ["block_identifiers", "feature_identifiers"]},
                "molang": {"type": "integer"}
            },
            "oneOf": [{"examplesSource": "entity_identifiers"}],
            "items": [{"molang": true}]
        });

        let sites = collect(&tree);
        assert_eq!(sites.len(), 4);
        assert_eq!(sites[0].pointer, "/properties/count");
        assert_eq!(sites[0].annotation, Annotation::Expression);
        assert_eq!(
            sites[1].annotation,
            Annotation::ExampleSources {
                sources: vec!["block_identifiers".to_string(), "feature_identifiers".to_string()]
            }
        );
        assert_eq!(sites[2].pointer, "/oneOf/0");
        assert_eq!(sites[3].pointer, "/items/0");
    }

    #[test]
    fn test_data_keywords_are_not_walked() {
        let tree = json!({
            "enum": [{"molang": true}],
            "default": {"examplesSource": "x"},
            "examples": [{"molang": true}]
        });
        assert!(collect(&tree).is_empty());
    }

    #[test]
    fn test_example_sources_shapes() {
        assert_eq!(example_sources(&json!("a")), Some(vec!["a".to_string()]));
        assert_eq!(example_sources(&json!(["a", "b"])).map(|v| v.len()), Some(2));
        assert_eq!(example_sources(&json!(["a", 1])), None);
        assert_eq!(example_sources(&json!(3)), None);
    }

    #[test]
    fn test_closure_is_expression_validator() {
        let checker = |expr: &str| !expr.trim().is_empty() && !expr.contains(";;");
        assert!(checker.accepts("query.is_baby ? 1 : 0"));
        assert!(!checker.accepts(""));
    }
}
