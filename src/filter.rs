//! Entity filter grammar
//!
//! Filters are the one shared definition that refers to itself: a filter is
//! either a single test or a group (`all_of`, `any_of`, `none_of`) of
//! filters. A bare array is shorthand for `all_of`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::annotations::EXAMPLES_SOURCE_KEYWORD;
use crate::definitions::reference;

/// Name under which the filter grammar is registered
pub const FILTERS_DEFINITION: &str = "filters";

/// A filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    AllOf { all_of: Vec<FilterExpr> },
    AnyOf { any_of: Vec<FilterExpr> },
    NoneOf { none_of: Vec<FilterExpr> },
    Test(FilterTest),
    List(Vec<FilterExpr>),
}

/// Entity the test is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSubject {
    #[serde(rename = "self")]
    Itself,
    Other,
    Parent,
    Player,
    Target,
    Block,
    Damager,
}

impl FilterSubject {
    pub const ALL: [FilterSubject; 7] = [
        FilterSubject::Itself,
        FilterSubject::Other,
        FilterSubject::Parent,
        FilterSubject::Player,
        FilterSubject::Target,
        FilterSubject::Block,
        FilterSubject::Damager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterSubject::Itself => "self",
            FilterSubject::Other => "other",
            FilterSubject::Parent => "parent",
            FilterSubject::Player => "player",
            FilterSubject::Target => "target",
            FilterSubject::Block => "block",
            FilterSubject::Damager => "damager",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==", alias = "=", alias = "equals")]
    Equals,
    #[serde(rename = "!=", alias = "<>", alias = "not")]
    NotEquals,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "is")]
    Is,
}

impl FilterOperator {
    /// Every spelling accepted in source, canonical forms first
    pub const SPELLINGS: [&'static str; 11] = ["==", "!=", "<", "<=", ">", ">=", "is", "=", "equals", "<>", "not"];
}

/// A single comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTest {
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<FilterSubject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FilterExpr {
    pub fn test(test: FilterTest) -> Self {
        FilterExpr::Test(test)
    }

    pub fn all_of(children: Vec<FilterExpr>) -> Self {
        FilterExpr::AllOf { all_of: children }
    }

    pub fn any_of(children: Vec<FilterExpr>) -> Self {
        FilterExpr::AnyOf { any_of: children }
    }

    pub fn none_of(children: Vec<FilterExpr>) -> Self {
        FilterExpr::NoneOf { none_of: children }
    }

    fn children(&self) -> &[FilterExpr] {
        match self {
            FilterExpr::AllOf { all_of: c }
            | FilterExpr::AnyOf { any_of: c }
            | FilterExpr::NoneOf { none_of: c }
            | FilterExpr::List(c) => c.as_slice(),
            FilterExpr::Test(_) => &[],
        }
    }

    /// Nesting depth; a single test has depth 1
    pub fn depth(&self) -> usize {
        match self {
            FilterExpr::Test(_) => 1,
            _ => 1 + self.children().iter().map(FilterExpr::depth).max().unwrap_or(0),
        }
    }

    /// All leaf tests, depth first
    pub fn tests(&self) -> Vec<&FilterTest> {
        let mut out = Vec::new();
        self.collect_tests(&mut out);
        out
    }

    fn collect_tests<'a>(&'a self, out: &mut Vec<&'a FilterTest>) {
        match self {
            FilterExpr::Test(test) => out.push(test),
            _ => self.children().iter().for_each(|child| child.collect_tests(out)),
        }
    }

    /// Schema tree for the grammar, recursive through `#/definitions/filters`
    pub fn definition() -> Value {
        let nested = json!({"type": "array", "items": reference(FILTERS_DEFINITION)});
        let group = |key: &str| {
            json!({
                "type": "object",
                "required": [key],
                "properties": { key: nested.clone() }
            })
        };
        let subjects: Vec<_> = FilterSubject::ALL.iter().map(FilterSubject::as_str).collect();

        json!({
            "title": "Filter",
            "oneOf": [
                nested.clone(),
                group("all_of"),
                group("any_of"),
                group("none_of"),
                {
                    "type": "object",
                    "required": ["test"],
                    "properties": {
                        "test": {"type": "string", EXAMPLES_SOURCE_KEYWORD: "filter_tests"},
                        "subject": {"enum": subjects},
                        "operator": {"enum": FilterOperator::SPELLINGS},
                        "domain": {"type": "string"},
                        "value": {}
                    }
                }
            ]
        })
    }
}
