//! Operator allow-list validation.

use crate::criterion::{Criterion, OperandRight};
use crate::error::QueryError;

/// Explicit, enumerated set of comparison operators a translator accepts.
///
/// Passed in at construction rather than read from global constants, so each
/// backend declares exactly what it can execute. Matching is
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct OperatorSet {
    operators: Vec<String>,
}

impl OperatorSet {
    pub fn new<I, S>(operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operators: operators
                .into_iter()
                .map(|op| op.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// The default SQL-flavored operator set.
    pub fn sql_default() -> Self {
        Self::new(["=", "!=", "<", "<=", ">", ">=", "like", "in"])
    }

    pub fn is_supported(&self, operator: &str) -> bool {
        let operator = operator.to_ascii_lowercase();
        self.operators.iter().any(|op| *op == operator)
    }

    /// Fail fast with a distinguishable reason for out-of-set operators.
    pub fn ensure_supported(&self, operator: &str) -> Result<(), QueryError> {
        if self.is_supported(operator) {
            Ok(())
        } else {
            Err(QueryError::unsupported_operator(operator))
        }
    }

    /// Validate operator and operand shape for one criterion.
    ///
    /// `in` requires a list right operand; every other operator requires a
    /// scalar.
    pub fn validate(&self, criterion: &Criterion) -> Result<(), QueryError> {
        self.ensure_supported(&criterion.operator)?;
        let wants_list = criterion.operator.eq_ignore_ascii_case("in");
        match (&criterion.operand_right, wants_list) {
            (OperandRight::List(_), true) | (OperandRight::Scalar(_), false) => Ok(()),
            (OperandRight::Scalar(_), true) => {
                Err(QueryError::invalid_operand(&criterion.operator, "a list"))
            }
            (OperandRight::List(_), false) => {
                Err(QueryError::invalid_operand(&criterion.operator, "a scalar"))
            }
        }
    }
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::sql_default()
    }
}
