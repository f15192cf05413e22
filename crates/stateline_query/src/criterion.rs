//! Criterion and query-spec model shared by all store backends.

use serde::{Deserialize, Serialize};

/// Default page size applied when a caller does not set an explicit limit.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// A single comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Right operand of a criterion: one value, or a list for `in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandRight {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

impl From<ScalarValue> for OperandRight {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<bool> for OperandRight {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i32> for OperandRight {
    fn from(value: i32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i64> for OperandRight {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<f64> for OperandRight {
    fn from(value: f64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<&str> for OperandRight {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for OperandRight {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Vec<ScalarValue>> for OperandRight {
    fn from(values: Vec<ScalarValue>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for OperandRight {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for OperandRight {
    fn from(values: Vec<String>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<i64>> for OperandRight {
    fn from(values: Vec<i64>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// One filter condition: property path, operator, comparison value.
///
/// The left operand is a dotted property path and may contain characters
/// that are illegal for dotted syntax (e.g. full URIs used as keys); the
/// translator escapes those with indexer syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub operand_left: String,
    pub operator: String,
    pub operand_right: OperandRight,
}

impl Criterion {
    pub fn new(
        operand_left: impl Into<String>,
        operator: impl Into<String>,
        operand_right: impl Into<OperandRight>,
    ) -> Self {
        Self {
            operand_left: operand_left.into(),
            operator: operator.into(),
            operand_right: operand_right.into(),
        }
    }
}

/// Shorthand for [`Criterion::new`].
pub fn criterion(
    operand_left: impl Into<String>,
    operator: impl Into<String>,
    operand_right: impl Into<OperandRight>,
) -> Criterion {
    Criterion::new(operand_left, operator, operand_right)
}

/// Sort direction, rendered as literal `ASC`/`DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A filter + sort + paging request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub filter: Vec<Criterion>,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    pub offset: usize,
    pub limit: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filter: Vec::new(),
            sort_field: None,
            sort_order: SortOrder::Asc,
            offset: 0,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl QuerySpec {
    /// Append one filter criterion.
    pub fn with_filter(mut self, criterion: Criterion) -> Self {
        self.filter.push(criterion);
        self
    }

    /// Set the sort field and direction.
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = order;
        self
    }

    /// Set the paging window.
    pub fn with_range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_structural_equality() {
        let a = Criterion::new("foo", "=", "bar");
        let b = Criterion::new("foo", "=", "bar");
        let c = Criterion::new("foo", "=", "baz");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_criterion_list_operand() {
        let criterion = Criterion::new("state", "in", vec![100i64, 200]);
        assert_eq!(
            criterion.operand_right,
            OperandRight::List(vec![ScalarValue::Int(100), ScalarValue::Int(200)])
        );
    }

    #[test]
    fn test_query_spec_defaults() {
        let spec = QuerySpec::default();
        assert!(spec.filter.is_empty());
        assert_eq!(spec.sort_field, None);
        assert_eq!(spec.sort_order, SortOrder::Asc);
        assert_eq!(spec.offset, 0);
        assert_eq!(spec.limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_query_spec_builders() {
        let spec = QuerySpec::default()
            .with_filter(Criterion::new("state", "=", 800))
            .with_sort("createdAt", SortOrder::Desc)
            .with_range(10, 5);
        assert_eq!(spec.filter.len(), 1);
        assert_eq!(spec.sort_field.as_deref(), Some("createdAt"));
        assert_eq!(spec.sort_order, SortOrder::Desc);
        assert_eq!(spec.offset, 10);
        assert_eq!(spec.limit, 5);
    }
}
