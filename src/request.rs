//! Per-request inputs the deduplicator reads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Default page size when a request does not carry one
pub const DEFAULT_SIZE: i64 = 10;

/// Matching mode selected with the `dedupe` request parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeMode {
    #[default]
    Default,
    /// Same-layer fine-grained records may merge when their centers are close
    Geo,
}

impl DedupeMode {
    /// Parse a raw `dedupe` value. Unrecognized values fall back to `Default`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("geo") {
            DedupeMode::Geo
        } else {
            if !raw.is_empty() && !raw.eq_ignore_ascii_case("default") {
                warn!("Unrecognized dedupe mode '{}', using default", raw);
            }
            DedupeMode::Default
        }
    }
}

impl fmt::Display for DedupeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupeMode::Default => write!(f, "default"),
            DedupeMode::Geo => write!(f, "geo"),
        }
    }
}

impl<'de> Deserialize<'de> for DedupeMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(DedupeMode::parse).unwrap_or_default())
    }
}

/// Sanitized request parameters (`req.clean`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Page size; zero or negative yields an empty page
    #[serde(default = "default_size")]
    pub size: i64,

    /// Query text, only used for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub dedupe: DedupeMode,
}

fn default_size() -> i64 {
    DEFAULT_SIZE
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl RequestContext {
    pub fn new(size: i64) -> Self {
        Self {
            size,
            text: None,
            dedupe: DedupeMode::Default,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_dedupe(mut self, mode: DedupeMode) -> Self {
        self.dedupe = mode;
        self
    }

    /// Number of records the page may hold
    pub fn limit(&self) -> usize {
        usize::try_from(self.size).unwrap_or(0)
    }
}
