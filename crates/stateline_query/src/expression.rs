//! Rendering of a single criterion into a parameterized condition
//! expression.

use crate::criterion::{Criterion, OperandRight, ScalarValue};
use crate::error::QueryError;
use crate::operator::OperatorSet;

/// Named statement parameter produced during translation.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: String,
    pub value: ScalarValue,
}

/// Accumulates statement parameters, resolving name collisions.
///
/// A second allocation of an already-taken base name gets a `_1`, `_2`, ...
/// suffix. The suffix only depends on what was allocated before it, so the
/// same input order always yields the same names.
#[derive(Debug, Default)]
pub struct ParameterTable {
    parameters: Vec<SqlParameter>,
}

impl ParameterTable {
    /// Allocate a collision-free `@name` for `base` and record its value.
    pub fn allocate(&mut self, base: &str, value: ScalarValue) -> String {
        let base = sanitize(base);
        let mut name = format!("@{base}");
        let mut counter = 0;
        while self.parameters.iter().any(|param| param.name == name) {
            counter += 1;
            name = format!("@{base}_{counter}");
        }
        self.parameters.push(SqlParameter {
            name: name.clone(),
            value,
        });
        name
    }

    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<SqlParameter> {
        self.parameters
    }
}

/// Replace everything outside `[A-Za-z0-9_]` (quotes included) so the name
/// is a legal statement parameter.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// True when the path cannot appear in a dotted property reference.
pub(crate) fn has_illegal_characters(path: &str) -> bool {
    path.chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
}

/// Render a property path, switching to indexer syntax when the path would
/// break a dotted reference. Paths already carrying an indexer are not
/// wrapped a second time.
pub(crate) fn path_expression(path: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if has_illegal_characters(path) && !path.contains('[') => {
            format!("{prefix}[\"{path}\"]")
        }
        Some(prefix) => format!("{prefix}.{path}"),
        None => path.to_string(),
    }
}

/// Right-most dotted segment, used as the parameter base name.
fn leaf_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// One criterion rendered against a shared parameter table.
#[derive(Debug)]
pub struct ConditionExpression<'a> {
    criterion: &'a Criterion,
    object_prefix: Option<&'a str>,
}

impl<'a> ConditionExpression<'a> {
    pub fn new(criterion: &'a Criterion, object_prefix: Option<&'a str>) -> Self {
        Self {
            criterion,
            object_prefix,
        }
    }

    /// Render `path op placeholder(s)`, pushing parameters into `table`.
    ///
    /// List operands allocate one parameter per element, suffixed `0`, `1`,
    /// ... in list order, and render as a parenthesized placeholder list.
    pub fn render(
        &self,
        operators: &OperatorSet,
        table: &mut ParameterTable,
    ) -> Result<String, QueryError> {
        operators.validate(self.criterion)?;
        let path = path_expression(&self.criterion.operand_left, self.object_prefix);
        let leaf = leaf_segment(&self.criterion.operand_left);
        let placeholder = match &self.criterion.operand_right {
            OperandRight::Scalar(value) => table.allocate(leaf, value.clone()),
            OperandRight::List(values) => {
                let names: Vec<String> = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| table.allocate(&format!("{leaf}{index}"), value.clone()))
                    .collect();
                format!("({})", names.join(", "))
            }
        };
        Ok(format!(
            "{path} {operator} {placeholder}",
            operator = self.criterion.operator
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(criterion: &Criterion, prefix: Option<&str>) -> (String, Vec<SqlParameter>) {
        let mut table = ParameterTable::default();
        let text = ConditionExpression::new(criterion, prefix)
            .render(&OperatorSet::sql_default(), &mut table)
            .unwrap();
        (text, table.into_parameters())
    }

    #[test]
    fn test_scalar_with_prefix() {
        let criterion = Criterion::new("foo", "=", "baz");
        let (text, params) = render(&criterion, Some("test"));
        assert_eq!(text, "test.foo = @foo");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "@foo");
        assert_eq!(params[0].value, ScalarValue::Text("baz".into()));
    }

    #[test]
    fn test_scalar_without_prefix() {
        let criterion = Criterion::new("foo", "=", "baz");
        let (text, _) = render(&criterion, None);
        assert_eq!(text, "foo = @foo");
    }

    #[test]
    fn test_list_preserves_element_order() {
        let criterion = Criterion::new("foo", "in", vec!["bar", "baz"]);
        let (text, params) = render(&criterion, Some("test"));
        assert_eq!(text, "test.foo in (@foo0, @foo1)");
        assert_eq!(params[0].name, "@foo0");
        assert_eq!(params[0].value, ScalarValue::Text("bar".into()));
        assert_eq!(params[1].name, "@foo1");
        assert_eq!(params[1].value, ScalarValue::Text("baz".into()));
    }

    #[test]
    fn test_illegal_path_renders_indexer_syntax() {
        let criterion = Criterion::new("https://example.org/ns#id", "=", "bar");
        let (text, params) = render(&criterion, Some("test"));
        assert_eq!(text, "test[\"https://example.org/ns#id\"] = @org_ns_id");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_existing_indexer_not_double_wrapped() {
        let criterion = Criterion::new("properties[\"https://example.org/ns#id\"]", "=", "bar");
        let (text, params) = render(&criterion, Some("test"));
        assert_eq!(
            text.split(" =").next().unwrap(),
            "test.properties[\"https://example.org/ns#id\"]"
        );
        assert_eq!(params.len(), 1);
        assert!(params[0].name.starts_with('@'));
    }

    #[test]
    fn test_dotted_path_uses_leaf_for_parameter_name() {
        let criterion = Criterion::new("dataRequest.assetId", "=", "asset-1");
        let (text, params) = render(&criterion, Some("doc"));
        assert_eq!(text, "doc.dataRequest.assetId = @assetId");
        assert_eq!(params[0].name, "@assetId");
    }

    #[test]
    fn test_unsupported_operator_rejected() {
        let criterion = Criterion::new("foo", "contains", "bar");
        let mut table = ParameterTable::default();
        let err = ConditionExpression::new(&criterion, None)
            .render(&OperatorSet::sql_default(), &mut table)
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported operator contains");
    }

    #[test]
    fn test_parameter_table_collision_suffixes() {
        let mut table = ParameterTable::default();
        assert_eq!(table.allocate("foo", ScalarValue::Int(1)), "@foo");
        assert_eq!(table.allocate("foo", ScalarValue::Int(2)), "@foo_1");
        assert_eq!(table.allocate("foo", ScalarValue::Int(3)), "@foo_2");
        assert_eq!(table.parameters().len(), 3);
    }
}
