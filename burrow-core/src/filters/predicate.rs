use super::range::RangeSpec;
use crate::error::{ConfigError, ConfigResult};
use burrow_scanner::ResponseRecord;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// One variant per filterable field
#[derive(Debug, Clone)]
pub enum Predicate {
    Status(RangeSpec),
    Size(RangeSpec),
    Time(RangeSpec),
    Words(RangeSpec),
    Lines(RangeSpec),
    Contains(String),
    Starts(String),
    Ends(String),
    Regex(Regex),
    Hash(String),
    Header { name: String, values: Vec<String> },
    Json { path: Vec<String>, values: Vec<String> },
}

impl Predicate {
    fn parse(field: &str, value: &str, expr: &str) -> ConfigResult<Self> {
        if value.is_empty() {
            return Err(ConfigError::MalformedFilter(expr.to_string()));
        }

        let predicate = match field {
            "status" => Predicate::Status(RangeSpec::parse(value)?),
            "size" | "length" => Predicate::Size(RangeSpec::parse(value)?),
            "time" => Predicate::Time(RangeSpec::parse(value)?),
            "words" => Predicate::Words(RangeSpec::parse(value)?),
            "lines" => Predicate::Lines(RangeSpec::parse(value)?),
            "contains" => Predicate::Contains(value.to_string()),
            "starts" => Predicate::Starts(value.to_string()),
            "ends" => Predicate::Ends(value.to_string()),
            "regex" => Predicate::Regex(Regex::new(value).map_err(|source| {
                ConfigError::InvalidRegex {
                    pattern: value.to_string(),
                    source,
                }
            })?),
            "hash" => Predicate::Hash(value.to_ascii_lowercase()),
            "header" | "headers" => {
                let (name, values) = match value.split_once('=') {
                    Some((name, alternatives)) => (name, split_alternatives(alternatives)),
                    None => (value, Vec::new()),
                };
                if name.trim().is_empty() {
                    return Err(ConfigError::MalformedFilter(expr.to_string()));
                }
                Predicate::Header {
                    name: name.trim().to_ascii_lowercase(),
                    values,
                }
            }
            "json" => {
                let (path, alternatives) = value
                    .split_once('=')
                    .ok_or_else(|| ConfigError::MalformedFilter(expr.to_string()))?;
                Predicate::Json {
                    path: path
                        .split('.')
                        .filter(|segment| !segment.is_empty())
                        .map(str::to_string)
                        .collect(),
                    values: split_alternatives(alternatives),
                }
            }
            other => return Err(ConfigError::UnknownField(other.to_string())),
        };

        Ok(predicate)
    }

    /// Raw result, before negation
    pub fn test(&self, record: &ResponseRecord) -> bool {
        match self {
            Predicate::Status(range) => range.matches(record.status_code as u64),
            Predicate::Size(range) => range.matches(record.content_length),
            Predicate::Time(range) => range.matches_duration(record.elapsed),
            Predicate::Words(range) => range.matches(record.word_count),
            Predicate::Lines(range) => range.matches(record.line_count),
            Predicate::Contains(needle) => record.body_text().contains(needle.as_str()),
            Predicate::Starts(prefix) => record.body_text().starts_with(prefix.as_str()),
            Predicate::Ends(suffix) => record.body_text().ends_with(suffix.as_str()),
            Predicate::Regex(regex) => regex.is_match(record.body_text()),
            Predicate::Hash(hash) => record.hash.eq_ignore_ascii_case(hash),
            Predicate::Header { name, values } => match record.header(name) {
                Some(actual) => values.is_empty() || values.iter().any(|v| v == actual),
                None => false,
            },
            Predicate::Json { path, values } => {
                let Ok(document) = serde_json::from_str::<Value>(record.body_text()) else {
                    return false;
                };
                resolve_json(&document, path)
                    .map(render_json)
                    .is_some_and(|actual| values.iter().any(|v| *v == actual))
            }
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Predicate::Status(_) => "status",
            Predicate::Size(_) => "size",
            Predicate::Time(_) => "time",
            Predicate::Words(_) => "words",
            Predicate::Lines(_) => "lines",
            Predicate::Contains(_) => "contains",
            Predicate::Starts(_) => "starts",
            Predicate::Ends(_) => "ends",
            Predicate::Regex(_) => "regex",
            Predicate::Hash(_) => "hash",
            Predicate::Header { .. } => "header",
            Predicate::Json { .. } => "json",
        }
    }

    /// Whether this predicate reads the body text (as opposed to counts and hashes)
    pub fn reads_body(&self) -> bool {
        matches!(
            self,
            Predicate::Contains(_)
                | Predicate::Starts(_)
                | Predicate::Ends(_)
                | Predicate::Regex(_)
                | Predicate::Json { .. }
        )
    }
}

/// A parsed `[!][[depth]]field:value` expression
#[derive(Debug, Clone)]
pub struct FilterClause {
    pub predicate: Predicate,
    pub negated: bool,
    /// When set, the clause only applies to responses found at this depth
    pub depth: Option<usize>,
    source: String,
}

impl FilterClause {
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        let trimmed = expr.trim();
        let mut rest = trimmed;
        let mut negated = false;
        let mut depth = None;

        // `!` and `[d]` may come in either order
        loop {
            if let Some(stripped) = rest.strip_prefix('!') {
                if negated {
                    return Err(ConfigError::MalformedFilter(expr.to_string()));
                }
                negated = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('[') {
                let (scope, after) = stripped
                    .split_once(']')
                    .ok_or_else(|| ConfigError::MalformedFilter(expr.to_string()))?;
                if depth.is_some() {
                    return Err(ConfigError::MalformedFilter(expr.to_string()));
                }
                depth = Some(
                    scope
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| ConfigError::MalformedFilter(expr.to_string()))?,
                );
                rest = after;
            } else {
                break;
            }
        }

        let (field, value) = rest
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedFilter(expr.to_string()))?;
        let predicate = Predicate::parse(&field.trim().to_ascii_lowercase(), value, expr)?;

        Ok(Self {
            predicate,
            negated,
            depth,
            source: trimmed.to_string(),
        })
    }

    pub fn applies_at(&self, depth: usize) -> bool {
        self.depth.is_none_or(|scope| scope == depth)
    }

    /// Raw predicate result XOR negation
    pub fn evaluate(&self, record: &ResponseRecord) -> bool {
        self.predicate.test(record) ^ self.negated
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn split_alternatives(alternatives: &str) -> Vec<String> {
    alternatives.split('|').map(str::to_string).collect()
}

fn resolve_json<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(status: u16, body: &str) -> ResponseRecord {
        ResponseRecord::new(
            "http://example.com/x",
            status,
            body.as_bytes(),
            Duration::from_millis(120),
            vec![("Server".to_string(), "nginx".to_string())],
            true,
        )
    }

    #[test]
    fn test_parse_plain_clause() {
        let clause = FilterClause::parse("status:200-299").unwrap();
        assert!(!clause.negated);
        assert_eq!(clause.depth, None);
        assert_eq!(clause.predicate.field(), "status");
        assert_eq!(clause.to_string(), "status:200-299");
    }

    #[test]
    fn test_parse_negated_and_depth_scoped() {
        let clause = FilterClause::parse("![2]contains:error").unwrap();
        assert!(clause.negated);
        assert_eq!(clause.depth, Some(2));

        let clause = FilterClause::parse("[1]!size:>100").unwrap();
        assert!(clause.negated);
        assert_eq!(clause.depth, Some(1));
        assert!(clause.applies_at(1));
        assert!(!clause.applies_at(0));
    }

    #[test]
    fn test_unknown_field_is_fatal() {
        let err = FilterClause::parse("colour:red").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField(field) if field == "colour"));
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in ["status", "status:", "!!status:200", "[x]status:200", "[1status:200", "json:noequals"] {
            assert!(FilterClause::parse(expr).is_err(), "'{}' should fail", expr);
        }
    }

    #[test]
    fn test_bad_regex_is_fatal() {
        assert!(matches!(
            FilterClause::parse("regex:(unclosed"),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_negation_truth_table() {
        let response = record(200, "");
        let cases = [
            ("status:200", true),
            ("!status:200", false),
            ("status:404", false),
            ("!status:404", true),
        ];
        for (expr, expected) in cases {
            let clause = FilterClause::parse(expr).unwrap();
            assert_eq!(clause.evaluate(&response), expected, "{}", expr);
            assert_eq!(
                clause.evaluate(&response),
                clause.predicate.test(&response) ^ clause.negated
            );
        }
    }

    #[test]
    fn test_numeric_fields() {
        let response = record(200, "one two three\nfour");
        assert!(FilterClause::parse("size:18").unwrap().evaluate(&response));
        assert!(FilterClause::parse("time:100-200").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("time:<100").unwrap().evaluate(&response));
        assert!(FilterClause::parse("words:4").unwrap().evaluate(&response));
        assert!(FilterClause::parse("lines:2").unwrap().evaluate(&response));
    }

    #[test]
    fn test_text_fields() {
        let response = record(200, "<html>Welcome admin</html>");
        assert!(FilterClause::parse("contains:admin").unwrap().evaluate(&response));
        assert!(FilterClause::parse("starts:<html>").unwrap().evaluate(&response));
        assert!(FilterClause::parse("ends:</html>").unwrap().evaluate(&response));
        assert!(FilterClause::parse("regex:Wel+come\\s+\\w+").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("contains:root").unwrap().evaluate(&response));
    }

    #[test]
    fn test_hash_field_is_case_insensitive() {
        let response = record(200, "abc");
        let upper = format!("hash:{}", response.hash.to_uppercase());
        assert!(FilterClause::parse(&upper).unwrap().evaluate(&response));
        assert!(!FilterClause::parse("hash:abc123").unwrap().evaluate(&response));
    }

    #[test]
    fn test_header_field() {
        let response = record(200, "");
        assert!(FilterClause::parse("header:server=apache|nginx").unwrap().evaluate(&response));
        assert!(FilterClause::parse("headers:SERVER").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("header:server=apache").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("header:x-missing").unwrap().evaluate(&response));
    }

    #[test]
    fn test_json_field() {
        let response = record(
            200,
            r#"{"status":"ok","data":{"items":[{"id":7},{"id":9}]},"enabled":true}"#,
        );
        assert!(FilterClause::parse("json:status=ok|up").unwrap().evaluate(&response));
        assert!(FilterClause::parse("json:data.items.1.id=9").unwrap().evaluate(&response));
        assert!(FilterClause::parse("json:enabled=true").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("json:data.items.5.id=9").unwrap().evaluate(&response));
        assert!(!FilterClause::parse("json:status=down").unwrap().evaluate(&response));
    }

    #[test]
    fn test_json_on_non_json_body_never_matches() {
        let response = record(200, "<html></html>");
        assert!(!FilterClause::parse("json:status=ok").unwrap().evaluate(&response));
        assert!(FilterClause::parse("!json:status=ok").unwrap().evaluate(&response));
    }

    #[test]
    fn test_reads_body() {
        assert!(FilterClause::parse("contains:x").unwrap().predicate.reads_body());
        assert!(FilterClause::parse("json:a=b").unwrap().predicate.reads_body());
        assert!(!FilterClause::parse("hash:abc").unwrap().predicate.reads_body());
        assert!(!FilterClause::parse("words:3").unwrap().predicate.reads_body());
    }
}
