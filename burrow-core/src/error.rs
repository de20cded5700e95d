use thiserror::Error;

/// Fatal, pre-flight configuration problems. Every one of these is raised
/// before the first request leaves the machine.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },

    #[error("Inverted range bound {lo}-{hi} (lower bound exceeds upper bound)")]
    InvertedRange { lo: u64, hi: u64 },

    #[error("Unknown filter field '{0}'")]
    UnknownField(String),

    #[error("Malformed filter expression '{0}'")]
    MalformedFilter(String),

    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("Malformed transform '{0}'")]
    MalformedTransform(String),

    #[error("Placeholder '{placeholder}' appears {found} time(s) in the URL, {reason}")]
    PlaceholderMismatch {
        placeholder: String,
        found: usize,
        reason: String,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors surfaced by a crawl run
#[derive(Debug, Error)]
pub enum BurrowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State file error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub type Result<T> = std::result::Result<T, BurrowError>;
