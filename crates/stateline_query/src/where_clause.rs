//! WHERE clause assembly from a list of criteria.

use crate::criterion::Criterion;
use crate::error::QueryError;
use crate::expression::{ConditionExpression, ParameterTable, SqlParameter};
use crate::operator::OperatorSet;

/// A rendered `WHERE ...` fragment plus the parameters it references.
///
/// Duplicate criteria (structurally equal) are evaluated once. Rendering is
/// deterministic: the same criteria in the same order always produce the
/// same text and the same parameter names.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    text: String,
    parameters: Vec<SqlParameter>,
}

impl WhereClause {
    /// Build the clause. Empty criteria yield an empty clause.
    ///
    /// Fails on the first invalid criterion; nothing partial is returned.
    pub fn build(
        criteria: &[Criterion],
        object_prefix: Option<&str>,
        operators: &OperatorSet,
    ) -> Result<Self, QueryError> {
        let mut table = ParameterTable::default();
        let mut fragments = Vec::new();
        let mut seen: Vec<&Criterion> = Vec::new();
        for criterion in criteria {
            if seen.contains(&criterion) {
                continue;
            }
            seen.push(criterion);
            let fragment =
                ConditionExpression::new(criterion, object_prefix).render(operators, &mut table)?;
            fragments.push(fragment);
        }
        let text = if fragments.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", fragments.join(" AND "))
        };
        Ok(Self {
            text,
            parameters: table.into_parameters(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    pub fn into_parts(self) -> (String, Vec<SqlParameter>) {
        (self.text, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::ScalarValue;

    fn build(criteria: &[Criterion]) -> WhereClause {
        WhereClause::build(criteria, Some("doc"), &OperatorSet::sql_default()).unwrap()
    }

    #[test]
    fn test_empty_criteria_yield_empty_clause() {
        let clause = build(&[]);
        assert!(clause.is_empty());
        assert_eq!(clause.as_str(), "");
        assert!(clause.parameters().is_empty());
    }

    #[test]
    fn test_single_criterion() {
        let clause = build(&[Criterion::new("foo", "=", "bar")]);
        assert_eq!(clause.as_str(), "WHERE doc.foo = @foo");
        assert_eq!(clause.parameters().len(), 1);
    }

    #[test]
    fn test_multiple_criteria_joined_with_and() {
        let clause = build(&[
            Criterion::new("state", "=", 800),
            Criterion::new("counterparty", "!=", "urn:x"),
        ]);
        assert_eq!(
            clause.as_str(),
            "WHERE doc.state = @state AND doc.counterparty != @counterparty"
        );
        assert_eq!(clause.parameters().len(), 2);
    }

    #[test]
    fn test_duplicate_criteria_evaluated_once() {
        let clause = build(&[
            Criterion::new("foo", "=", "bar"),
            Criterion::new("foo", "=", "bar"),
            Criterion::new("foo", "=", "bar"),
        ]);
        assert_eq!(clause.as_str(), "WHERE doc.foo = @foo");
        assert_eq!(clause.parameters().len(), 1);
    }

    #[test]
    fn test_colliding_parameter_names_get_suffixes() {
        let clause = build(&[
            Criterion::new("foo", "=", "a"),
            Criterion::new("nested.foo", "=", "b"),
        ]);
        assert_eq!(
            clause.as_str(),
            "WHERE doc.foo = @foo AND doc.nested.foo = @foo_1"
        );
        let names: Vec<&str> = clause.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@foo", "@foo_1"]);
        assert_eq!(clause.parameters()[1].value, ScalarValue::Text("b".into()));
    }

    #[test]
    fn test_list_and_scalar_collision() {
        // @foo is taken by the scalar, then the list allocates @foo0/@foo1.
        let clause = build(&[
            Criterion::new("foo", "=", "a"),
            Criterion::new("foo", "in", vec!["b", "c"]),
        ]);
        assert_eq!(
            clause.as_str(),
            "WHERE doc.foo = @foo AND doc.foo in (@foo0, @foo1)"
        );
        let names: Vec<&str> = clause.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["@foo", "@foo0", "@foo1"]);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let criteria = [
            Criterion::new("foo", "=", "a"),
            Criterion::new("bar.foo", "=", "b"),
            Criterion::new("state", "in", vec![100i64, 200]),
        ];
        let first = build(&criteria);
        let second = build(&criteria);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_criterion_aborts_whole_clause() {
        let result = WhereClause::build(
            &[
                Criterion::new("foo", "=", "a"),
                Criterion::new("bar", "contains", "b"),
            ],
            Some("doc"),
            &OperatorSet::sql_default(),
        );
        assert_eq!(
            result.unwrap_err(),
            QueryError::unsupported_operator("contains")
        );
    }
}
