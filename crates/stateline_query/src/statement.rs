//! Full statement assembly for document backends.

use crate::criterion::QuerySpec;
use crate::error::QueryError;
use crate::expression::SqlParameter;
use crate::operator::OperatorSet;
use crate::order_by::order_by_clause;
use crate::where_clause::WhereClause;

/// A ready-to-execute parameterized statement.
///
/// Paging travels separately from the text so backends that take offset and
/// limit as API arguments instead of clause keywords can use them directly.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    text: String,
    parameters: Vec<SqlParameter>,
    offset: usize,
    limit: usize,
}

impl SqlStatement {
    /// Translate a query spec into `SELECT * FROM <alias> ...` over
    /// documents addressed through `alias`.
    pub fn for_documents(
        alias: &str,
        spec: &QuerySpec,
        operators: &OperatorSet,
    ) -> Result<Self, QueryError> {
        let where_clause = WhereClause::build(&spec.filter, Some(alias), operators)?;
        let order_by = order_by_clause(spec.sort_field.as_deref(), spec.sort_order, Some(alias));
        let (where_text, parameters) = where_clause.into_parts();

        let mut text = format!("SELECT * FROM {alias}");
        if !where_text.is_empty() {
            text.push(' ');
            text.push_str(&where_text);
        }
        if !order_by.is_empty() {
            text.push(' ');
            text.push_str(&order_by);
        }
        text.push_str(&format!(" OFFSET {} LIMIT {}", spec.offset, spec.limit));

        Ok(Self {
            text,
            parameters,
            offset: spec.offset,
            limit: spec.limit,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
