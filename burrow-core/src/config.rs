// Scan configuration: TOML file, CLI overrides and pre-flight validation

use crate::error::{ConfigError, ConfigResult};
use crate::filters::FilterMode;
use burrow_scanner::RequestOptions;
use burrow_scanner::requester::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_PLACEHOLDER: &str = "$";
pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;

/// Which strategy drives the crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Classic when the URL contains the placeholder, recursive otherwise
    #[default]
    Auto,
    Recursive,
    Classic,
}

impl ScanMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ScanMode::Auto),
            "recursive" | "recurse" => Some(ScanMode::Recursive),
            "classic" => Some(ScanMode::Classic),
            _ => None,
        }
    }

    /// Never returns `Auto`
    pub fn resolve(self, url: &str, placeholder: &str) -> Self {
        match self {
            ScanMode::Auto if !placeholder.is_empty() && url.contains(placeholder) => {
                ScanMode::Classic
            }
            ScanMode::Auto => ScanMode::Recursive,
            other => other,
        }
    }
}

/// Extra per-node detail shown by reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowField {
    Hash,
    Headers,
    Body,
    Size,
    Time,
    Words,
    Lines,
}

impl ShowField {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hash" => Some(ShowField::Hash),
            "headers" | "header" => Some(ShowField::Headers),
            "body" => Some(ShowField::Body),
            "size" | "length" => Some(ShowField::Size),
            "time" => Some(ShowField::Time),
            "words" => Some(ShowField::Words),
            "lines" => Some(ShowField::Lines),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScanConfig {
    pub url: String,
    pub mode: ScanMode,
    pub max_depth: usize,
    pub threads: usize,
    /// Requests per second per worker, 0 = unthrottled
    pub throttle: u32,
    pub filter_mode: FilterMode,
    pub filters: Vec<String>,
    pub wordlists: Vec<PathBuf>,
    pub wordlist_filters: Vec<String>,
    pub transforms: Vec<String>,
    pub unique: bool,
    pub placeholder: String,
    pub permutations: bool,
    pub show: Vec<ShowField>,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// `Name: value` pairs sent with every request
    pub headers: Vec<String>,
    pub follow_redirects: bool,
    pub grace_period_ms: u64,
    pub state_file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            mode: ScanMode::Auto,
            max_depth: DEFAULT_MAX_DEPTH,
            threads: DEFAULT_THREADS,
            throttle: 0,
            filter_mode: FilterMode::And,
            filters: Vec::new(),
            wordlists: Vec::new(),
            wordlist_filters: Vec::new(),
            transforms: Vec::new(),
            unique: false,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            permutations: false,
            show: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            headers: Vec::new(),
            follow_redirects: false,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            state_file: None,
        }
    }
}

impl ScanConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Structural checks that do not need the wordlists
    pub fn validate(&self) -> ConfigResult<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Validation("a target URL is required".to_string()));
        }
        if self.placeholder.is_empty() {
            return Err(ConfigError::Validation("placeholder cannot be empty".to_string()));
        }

        // the placeholder may not be a legal URL character sequence
        let substituted = self.url.replace(self.placeholder.as_str(), "x");
        let parsed = Url::parse(&substituted).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if self.threads == 0 {
            return Err(ConfigError::Validation("threads must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        self.parsed_headers()?;
        Ok(())
    }

    pub fn parsed_headers(&self) -> ConfigResult<Vec<(String, String)>> {
        self.headers
            .iter()
            .map(|raw| match raw.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok((name.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(ConfigError::Validation(format!(
                    "header '{}' must look like 'Name: value'",
                    raw
                ))),
            })
            .collect()
    }

    pub fn request_options(&self, keep_body: bool) -> ConfigResult<RequestOptions> {
        let mut options = RequestOptions::default()
            .with_timeout(self.timeout_secs)
            .with_user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .with_follow_redirects(self.follow_redirects)
            .with_keep_body(keep_body || self.show.contains(&ShowField::Body));

        for (name, value) in self.parsed_headers()? {
            options = options.with_header(name, value);
        }
        Ok(options)
    }
}

/// Load a scan configuration from a TOML file
pub fn load_config(path: &Path) -> ConfigResult<ScanConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}
