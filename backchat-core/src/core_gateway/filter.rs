//! Typed filter predicates for queries and subscriptions
//!
//! The remote store accepts string filter expressions; building those by
//! string concatenation invites injection-style bugs, so the gateway works
//! with an explicit predicate tree instead. A [`Filter`] can be rendered
//! to the store's wire syntax and also evaluated locally against a JSON
//! row, which is what the in-memory gateway and the tests rely on.

use serde_json::Value;

/// One comparison or combinator node in a filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every row
    All,
    /// Column equals value (null value matches absent/null columns)
    Eq(String, Value),
    /// Column differs from value
    Neq(String, Value),
    /// Column is null or absent
    IsNull(String),
    /// Case-insensitive pattern match with `%` wildcards
    Ilike(String, String),
    /// Every child matches
    And(Vec<Filter>),
    /// At least one child matches
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Ilike(column.into(), pattern.into())
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// Evaluate this predicate against a JSON row
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(column, value) => {
                let cell = field(row, column);
                if value.is_null() {
                    cell.is_null()
                } else {
                    cell == value
                }
            }
            Filter::Neq(column, value) => {
                let cell = field(row, column);
                if value.is_null() {
                    !cell.is_null()
                } else {
                    cell != value
                }
            }
            Filter::IsNull(column) => field(row, column).is_null(),
            Filter::Ilike(column, pattern) => match field(row, column) {
                Value::String(text) => ilike_match(pattern, text),
                _ => false,
            },
            Filter::And(children) => children.iter().all(|child| child.matches(row)),
            Filter::Or(children) => children.iter().any(|child| child.matches(row)),
        }
    }

    /// Render to the store's filter expression syntax
    pub fn render(&self) -> String {
        match self {
            Filter::All => String::new(),
            Filter::Eq(column, value) => format!("{}.eq.{}", column, render_value(value)),
            Filter::Neq(column, value) => format!("{}.neq.{}", column, render_value(value)),
            Filter::IsNull(column) => format!("{}.is.null", column),
            Filter::Ilike(column, pattern) => format!("{}.ilike.{}", column, pattern),
            Filter::And(children) => format!("and({})", render_children(children)),
            Filter::Or(children) => format!("or({})", render_children(children)),
        }
    }
}

fn render_children(children: &[Filter]) -> String {
    children
        .iter()
        .map(Filter::render)
        .collect::<Vec<_>>()
        .join(",")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Look up a column in a row; absent columns read as null
fn field<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

/// Case-insensitive `%`-wildcard match, anchored at both ends unless the
/// pattern starts/ends with `%`
fn ilike_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    let anchored_start = !pattern.starts_with('%');
    let anchored_end = !pattern.ends_with('%');
    let segments: Vec<&str> = pattern.split('%').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        // Pattern was empty or all wildcards
        return pattern.contains('%') || text.is_empty();
    }

    let mut cursor = 0usize;
    for (i, segment) in segments.iter().enumerate() {
        let found = match text[cursor..].find(segment) {
            Some(offset) => cursor + offset,
            None => return false,
        };
        if i == 0 && anchored_start && found != 0 {
            return false;
        }
        cursor = found + segment.len();
    }

    if anchored_end && cursor != text.len() {
        return false;
    }
    true
}
