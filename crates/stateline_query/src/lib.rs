//! Stateline query compiler.
//!
//! Translates abstract filter/sort specifications ([`QuerySpec`]) into
//! parameterized SQL fragments for document backends, and evaluates the same
//! criteria in-process for backends without a query engine.
//!
//! All translation is injection-safe: values only ever travel as named
//! statement parameters, and property paths that would break a dotted
//! reference are rendered in indexer syntax.

mod criterion;
mod error;
mod expression;
mod mapping;
mod operator;
mod order_by;
pub mod predicate;
mod statement;
mod where_clause;

pub use criterion::{
    criterion, Criterion, OperandRight, QuerySpec, ScalarValue, SortOrder, DEFAULT_QUERY_LIMIT,
};
pub use error::QueryError;
pub use expression::{ConditionExpression, ParameterTable, SqlParameter};
pub use mapping::FieldMap;
pub use operator::OperatorSet;
pub use order_by::order_by_clause;
pub use statement::SqlStatement;
pub use where_clause::WhereClause;
