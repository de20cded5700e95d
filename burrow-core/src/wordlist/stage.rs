// Wordlist filter and transform stages

use crate::error::{ConfigError, ConfigResult};
use crate::filters::RangeSpec;
use regex::Regex;

#[derive(Debug, Clone)]
enum WordTest {
    Size(RangeSpec),
    Starts(String),
    Ends(String),
    Contains(String),
    Regex(Regex),
}

/// A `[!]field=value` predicate over a candidate word
#[derive(Debug, Clone)]
pub struct WordFilter {
    test: WordTest,
    negated: bool,
}

impl WordFilter {
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        let trimmed = expr.trim();
        let (negated, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (field, value) = rest
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedFilter(expr.to_string()))?;
        if value.is_empty() {
            return Err(ConfigError::MalformedFilter(expr.to_string()));
        }

        let test = match field.trim().to_ascii_lowercase().as_str() {
            "size" | "length" => WordTest::Size(RangeSpec::parse(value)?),
            "starts" => WordTest::Starts(value.to_string()),
            "ends" => WordTest::Ends(value.to_string()),
            "contains" => WordTest::Contains(value.to_string()),
            "regex" => WordTest::Regex(Regex::new(value).map_err(|source| {
                ConfigError::InvalidRegex {
                    pattern: value.to_string(),
                    source,
                }
            })?),
            other => return Err(ConfigError::UnknownField(other.to_string())),
        };

        Ok(Self { test, negated })
    }

    pub fn keep(&self, word: &str) -> bool {
        let raw = match &self.test {
            WordTest::Size(range) => range.matches(word.chars().count() as u64),
            WordTest::Starts(prefix) => word.starts_with(prefix.as_str()),
            WordTest::Ends(suffix) => word.ends_with(suffix.as_str()),
            WordTest::Contains(needle) => word.contains(needle.as_str()),
            WordTest::Regex(regex) => regex.is_match(word),
        };
        raw ^ self.negated
    }
}

/// A pure one-word-to-one-word rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Lowercase,
    Uppercase,
    Capitalize,
    Reverse,
    Replace { from: String, to: String },
    Remove(String),
    Prefix(String),
    Suffix(String),
}

impl Transform {
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        let trimmed = expr.trim();
        let (name, arg) = match trimmed.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (trimmed, None),
        };

        let transform = match (name.to_ascii_lowercase().as_str(), arg) {
            ("lowercase" | "lower", None) => Transform::Lowercase,
            ("uppercase" | "upper", None) => Transform::Uppercase,
            ("capitalize", None) => Transform::Capitalize,
            ("reverse", None) => Transform::Reverse,
            ("replace", Some(arg)) => {
                let (from, to) = arg
                    .split_once('=')
                    .ok_or_else(|| ConfigError::MalformedTransform(expr.to_string()))?;
                if from.is_empty() {
                    return Err(ConfigError::MalformedTransform(expr.to_string()));
                }
                Transform::Replace {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            ("remove", Some(arg)) if !arg.is_empty() => Transform::Remove(arg.to_string()),
            ("prefix", Some(arg)) if !arg.is_empty() => Transform::Prefix(arg.to_string()),
            ("suffix", Some(arg)) if !arg.is_empty() => Transform::Suffix(arg.to_string()),
            (
                "lowercase" | "lower" | "uppercase" | "upper" | "capitalize" | "reverse"
                | "replace" | "remove" | "prefix" | "suffix",
                _,
            ) => return Err(ConfigError::MalformedTransform(expr.to_string())),
            _ => return Err(ConfigError::UnknownTransform(name.to_string())),
        };

        Ok(transform)
    }

    pub fn apply(&self, word: &str) -> String {
        match self {
            Transform::Lowercase => word.to_lowercase(),
            Transform::Uppercase => word.to_uppercase(),
            Transform::Capitalize => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            Transform::Reverse => word.chars().rev().collect(),
            Transform::Replace { from, to } => word.replace(from.as_str(), to),
            Transform::Remove(needle) => word.replace(needle.as_str(), ""),
            Transform::Prefix(prefix) => format!("{}{}", prefix, word),
            Transform::Suffix(suffix) => format!("{}{}", word, suffix),
        }
    }
}
