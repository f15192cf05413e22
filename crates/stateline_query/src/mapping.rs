//! Declared property-to-document-path mapping for strict backends.

use std::collections::BTreeMap;

use crate::criterion::QuerySpec;
use crate::error::QueryError;

/// Maps caller-facing property names to document paths.
///
/// Strict backends resolve every filter and sort field through the map and
/// reject anything unmapped before touching the backend, so a typo surfaces
/// as an error instead of an empty result set.
#[derive(Debug, Clone)]
pub struct FieldMap {
    entries: BTreeMap<String, String>,
}

impl FieldMap {
    /// Build a map, rejecting empty names, empty paths and duplicates.
    pub fn new<I, K, V>(entries: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (field, path) in entries {
            let field = field.into();
            let path = path.into();
            if field.is_empty() {
                return Err(QueryError::InvalidMapping("empty field name".into()));
            }
            if path.is_empty() {
                return Err(QueryError::InvalidMapping(format!(
                    "empty path for field '{field}'"
                )));
            }
            if map.insert(field.clone(), path).is_some() {
                return Err(QueryError::InvalidMapping(format!(
                    "duplicate field '{field}'"
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// Resolve one property name to its document path.
    pub fn resolve(&self, field: &str) -> Result<&str, QueryError> {
        self.entries
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| QueryError::UnmappedProperty(field.to_string()))
    }

    /// Rewrite a query spec's filter paths and sort field through the map.
    pub fn rewrite(&self, spec: &QuerySpec) -> Result<QuerySpec, QueryError> {
        let mut rewritten = spec.clone();
        for criterion in &mut rewritten.filter {
            criterion.operand_left = self.resolve(&criterion.operand_left)?.to_string();
        }
        if let Some(field) = &rewritten.sort_field {
            rewritten.sort_field = Some(self.resolve(field)?.to_string());
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::{Criterion, SortOrder};

    fn sample_map() -> FieldMap {
        FieldMap::new([
            ("state", "state"),
            ("counterparty", "properties.counterparty"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_mapped_field() {
        let map = sample_map();
        assert_eq!(map.resolve("counterparty").unwrap(), "properties.counterparty");
    }

    #[test]
    fn test_unmapped_field_is_an_error() {
        let map = sample_map();
        assert_eq!(
            map.resolve("nope").unwrap_err(),
            QueryError::UnmappedProperty("nope".into())
        );
    }

    #[test]
    fn test_rewrite_filter_and_sort() {
        let map = sample_map();
        let spec = QuerySpec::default()
            .with_filter(Criterion::new("counterparty", "=", "urn:x"))
            .with_sort("state", SortOrder::Desc);
        let rewritten = map.rewrite(&spec).unwrap();
        assert_eq!(rewritten.filter[0].operand_left, "properties.counterparty");
        assert_eq!(rewritten.sort_field.as_deref(), Some("state"));
    }

    #[test]
    fn test_rewrite_fails_on_unmapped_sort_field() {
        let map = sample_map();
        let spec = QuerySpec::default().with_sort("unknown", SortOrder::Asc);
        assert!(matches!(
            map.rewrite(&spec),
            Err(QueryError::UnmappedProperty(_))
        ));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let result = FieldMap::new([("state", "a"), ("state", "b")]);
        assert!(matches!(result, Err(QueryError::InvalidMapping(_))));
    }

    #[test]
    fn test_empty_field_rejected() {
        assert!(FieldMap::new([("", "path")]).is_err());
        assert!(FieldMap::new([("field", "")]).is_err());
    }
}
