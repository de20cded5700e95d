//! Response filtering.
//!
//! Filters are parsed once from `[!][[depth]]field:value` expressions and then
//! evaluated against every response. A response is kept when the combined
//! predicate holds; kept responses become nodes in the discovery tree.

mod predicate;
pub mod range;

pub use predicate::{FilterClause, Predicate};
pub use range::{RangeClause, RangeSpec};

use crate::error::ConfigResult;
use burrow_scanner::ResponseRecord;
use serde::{Deserialize, Serialize};

/// Added when no `status` clause was configured
pub const DEFAULT_STATUS_FILTER: &str = "status:200-299";

/// How clause results are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    And,
    Or,
}

impl FilterMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "and" => Some(FilterMode::And),
            "or" => Some(FilterMode::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterSet {
    clauses: Vec<FilterClause>,
    mode: FilterMode,
}

impl FilterSet {
    /// Parses every expression, adding [`DEFAULT_STATUS_FILTER`] when none of
    /// them filters on status.
    pub fn parse<S: AsRef<str>>(exprs: &[S], mode: FilterMode) -> ConfigResult<Self> {
        let mut clauses = exprs
            .iter()
            .map(|expr| FilterClause::parse(expr.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;

        if !clauses
            .iter()
            .any(|c| matches!(c.predicate, Predicate::Status(_)))
        {
            clauses.push(FilterClause::parse(DEFAULT_STATUS_FILTER)?);
        }

        Ok(Self { clauses, mode })
    }

    /// Builds a set from already parsed clauses, without the default status clause
    pub fn from_clauses(clauses: Vec<FilterClause>, mode: FilterMode) -> Self {
        Self { clauses, mode }
    }

    /// Decides whether `record`, found at tree depth `depth`, is kept.
    /// Clauses scoped to another depth are skipped; if nothing applies the
    /// response is kept.
    pub fn evaluate(&self, record: &ResponseRecord, depth: usize) -> bool {
        let mut results = self
            .clauses
            .iter()
            .filter(|clause| clause.applies_at(depth))
            .map(|clause| clause.evaluate(record))
            .peekable();

        if results.peek().is_none() {
            return true;
        }

        match self.mode {
            FilterMode::And => results.all(|r| r),
            FilterMode::Or => results.any(|r| r),
        }
    }

    pub fn needs_body(&self) -> bool {
        self.clauses.iter().any(|c| c.predicate.reads_body())
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }
}
