//! ORDER BY clause rendering.

use crate::criterion::SortOrder;
use crate::expression::path_expression;

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Render `ORDER BY <path> ASC|DESC`, or an empty string when no sort field
/// is set. Fields needing indexer syntax get the same escaping as filter
/// paths.
pub fn order_by_clause(
    sort_field: Option<&str>,
    sort_order: SortOrder,
    object_prefix: Option<&str>,
) -> String {
    match sort_field {
        Some(field) => {
            let path = path_expression(field, object_prefix);
            format!("ORDER BY {path} {}", sort_order.as_sql())
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sort_field_renders_nothing() {
        assert_eq!(order_by_clause(None, SortOrder::Asc, Some("doc")), "");
    }

    #[test]
    fn test_ascending_with_prefix() {
        assert_eq!(
            order_by_clause(Some("createdAt"), SortOrder::Asc, Some("doc")),
            "ORDER BY doc.createdAt ASC"
        );
    }

    #[test]
    fn test_descending_with_nested_path() {
        assert_eq!(
            order_by_clause(Some("properties.counterparty"), SortOrder::Desc, Some("doc")),
            "ORDER BY doc.properties.counterparty DESC"
        );
    }

    #[test]
    fn test_illegal_field_uses_indexer_syntax() {
        assert_eq!(
            order_by_clause(Some("https://example.org/ns#date"), SortOrder::Asc, Some("doc")),
            "ORDER BY doc[\"https://example.org/ns#date\"] ASC"
        );
    }

    #[test]
    fn test_without_prefix() {
        assert_eq!(
            order_by_clause(Some("state"), SortOrder::Desc, None),
            "ORDER BY state DESC"
        );
    }
}
