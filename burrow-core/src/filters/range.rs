// Numeric range expressions: `5`, `5-10`, `>5`, `<5`, and comma separated unions of those

use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeClause {
    Exact(u64),
    Between(u64, u64),
    Greater(u64),
    Less(u64),
}

impl RangeClause {
    pub fn matches(&self, value: u64) -> bool {
        match *self {
            RangeClause::Exact(n) => value == n,
            RangeClause::Between(lo, hi) => (lo..=hi).contains(&value),
            RangeClause::Greater(n) => value > n,
            RangeClause::Less(n) => value < n,
        }
    }
}

impl fmt::Display for RangeClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeClause::Exact(n) => write!(f, "{}", n),
            RangeClause::Between(lo, hi) => write!(f, "{}-{}", lo, hi),
            RangeClause::Greater(n) => write!(f, ">{}", n),
            RangeClause::Less(n) => write!(f, "<{}", n),
        }
    }
}

/// A union of [`RangeClause`]s. A value matches when any clause matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    clauses: Vec<RangeClause>,
}

impl RangeSpec {
    pub fn parse(input: &str) -> ConfigResult<Self> {
        if input.trim().is_empty() {
            return Err(invalid(input, "range is empty"));
        }

        let clauses = input
            .split(',')
            .map(|clause| parse_clause(input, clause.trim()))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    pub fn matches(&self, value: u64) -> bool {
        self.clauses.iter().any(|clause| clause.matches(value))
    }

    /// Durations are compared in whole milliseconds
    pub fn matches_duration(&self, elapsed: Duration) -> bool {
        self.matches(elapsed.as_millis() as u64)
    }

    pub fn clauses(&self) -> &[RangeClause] {
        &self.clauses
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}

fn parse_clause(input: &str, clause: &str) -> ConfigResult<RangeClause> {
    if clause.is_empty() {
        return Err(invalid(input, "empty clause"));
    }

    if let Some(rest) = clause.strip_prefix('>') {
        return Ok(RangeClause::Greater(parse_bound(input, rest)?));
    }
    if let Some(rest) = clause.strip_prefix('<') {
        return Ok(RangeClause::Less(parse_bound(input, rest)?));
    }

    match clause.split_once('-') {
        Some((lo, hi)) => {
            let lo = parse_bound(input, lo)?;
            let hi = parse_bound(input, hi)?;
            if lo > hi {
                return Err(ConfigError::InvertedRange { lo, hi });
            }
            Ok(RangeClause::Between(lo, hi))
        }
        None => Ok(RangeClause::Exact(parse_bound(input, clause)?)),
    }
}

fn parse_bound(input: &str, bound: &str) -> ConfigResult<u64> {
    let bound = bound.trim();
    bound
        .parse::<u64>()
        .map_err(|_| invalid(input, &format!("'{}' is not a number", bound)))
}

fn invalid(input: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidRange {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
