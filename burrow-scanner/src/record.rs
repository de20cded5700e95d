use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;

/// A single HTTP response, reduced to what the filter engine and reports need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub url: String,
    pub status_code: u16,
    pub content_length: u64,
    pub elapsed: Duration,
    /// Lower-case hex SHA-256 of the raw body bytes
    pub hash: String,
    pub word_count: u64,
    pub line_count: u64,
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ResponseRecord {
    /// Builds a record from raw response parts. `keep_body` decides whether the
    /// decoded body text is retained after hashing and counting.
    pub fn new(
        url: impl Into<String>,
        status_code: u16,
        body: &[u8],
        elapsed: Duration,
        headers: impl IntoIterator<Item = (String, String)>,
        keep_body: bool,
    ) -> Self {
        let text = String::from_utf8_lossy(body);

        Self {
            url: url.into(),
            status_code,
            content_length: body.len() as u64,
            elapsed,
            hash: content_hash(body),
            word_count: text.split_whitespace().count() as u64,
            line_count: text.lines().count() as u64,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            body: keep_body.then(|| text.into_owned()),
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body text, or the empty string when the body was not retained
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

pub fn content_hash(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
