//! Data types that flow through the ingestion and query pipeline.
//!
//! A [`Fragment`] is produced once by the chunker and never mutated. At
//! query time the vector index returns [`RetrievedFragment`]s, the
//! re-ranker turns them into [`RankedFragment`]s, and the selector hands
//! back [`ContextFragment`]s together with a [`Confidence`] label.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Which part of the source document a fragment came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Text,
    Table,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Text => "text",
            Section::Table => "table",
        }
    }

    /// Prefix used when the fragment is placed in a prompt context block.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Text => "[Text]",
            Section::Table => "[Table]",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata supplied by ingestion for a whole source document.
///
/// `extra` is copied verbatim into every fragment cut from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub source_id: String,
    pub extra: Map<String, Value>,
}

impl SourceMetadata {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            extra: Map::new(),
        }
    }
}

/// Per-fragment metadata as stored alongside the embedding.
///
/// Field names on the wire match the index's stored JSON
/// (`chunk_start`, `chunk_end`, `chunk_strategy`). Every field defaults,
/// so partially populated rows still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    #[serde(default)]
    pub source_id: String,
    /// Character offset of the window start (before whitespace stripping).
    #[serde(default, rename = "chunk_start")]
    pub start: usize,
    /// Character offset one past the window end (before stripping).
    #[serde(default, rename = "chunk_end")]
    pub end: usize,
    #[serde(default, rename = "chunk_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub section: Section,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A contiguous slice of a source document with a stable identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub id: String,
    pub text: String,
    pub metadata: FragmentMetadata,
}

/// A fragment returned by the vector index for one query.
///
/// `vector_score` is whatever ordering key the index reports; it is never
/// overwritten by re-ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedFragment {
    pub id: String,
    pub text: String,
    pub metadata: FragmentMetadata,
    pub vector_score: f64,
}

/// A retrieved fragment with a relevance score from a scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFragment {
    pub fragment: RetrievedFragment,
    /// Raw scorer output (a model logit for cross-encoders), not normalized.
    pub relevance: f64,
}

impl RankedFragment {
    pub fn new(fragment: RetrievedFragment, relevance: f64) -> Self {
        Self {
            fragment,
            relevance,
        }
    }
}

/// A fragment chosen for the final context.
///
/// `relevance` is `None` when the fragment came from the raw vector
/// fallback rather than from re-ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFragment {
    pub fragment: RetrievedFragment,
    pub relevance: Option<f64>,
}

impl From<RankedFragment> for ContextFragment {
    fn from(ranked: RankedFragment) -> Self {
        Self {
            fragment: ranked.fragment,
            relevance: Some(ranked.relevance),
        }
    }
}

impl From<RetrievedFragment> for ContextFragment {
    fn from(fragment: RetrievedFragment) -> Self {
        Self {
            fragment,
            relevance: None,
        }
    }
}

/// How much the caller can trust the selected context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Re-ranking produced at least one fragment.
    High,
    /// Re-ranking produced nothing; raw vector matches were used instead.
    Low,
    /// No usable context.
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Low => "low",
            Confidence::None => "none",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback strategy applied when re-ranking returns nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Return no context at all.
    FailClosed,
    /// Fall back to the raw vector candidates.
    FailOpen,
    /// Same fallback as `FailOpen`, logged as a degraded retrieval.
    #[default]
    Hybrid,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::FailClosed => "fail_closed",
            Policy::FailOpen => "fail_open",
            Policy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_closed" => Ok(Policy::FailClosed),
            "fail_open" => Ok(Policy::FailOpen),
            "hybrid" => Ok(Policy::Hybrid),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_names() {
        let meta = FragmentMetadata {
            source_id: "report.pdf".to_string(),
            start: 700,
            end: 1500,
            strategy: "char_window_800_overlap_100".to_string(),
            section: Section::Table,
            extra: Map::new(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["chunk_start"], 700);
        assert_eq!(json["chunk_end"], 1500);
        assert_eq!(json["section"], "table");

        let back: FragmentMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_metadata_partial_row_defaults() {
        let meta: FragmentMetadata =
            serde_json::from_str(r#"{"source_id":"a","page":3}"#).unwrap();
        assert_eq!(meta.section, Section::Text);
        assert_eq!(meta.start, 0);
        assert_eq!(meta.extra.get("page"), Some(&Value::from(3)));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("hybrid".parse::<Policy>().unwrap(), Policy::Hybrid);
        assert_eq!("fail_open".parse::<Policy>().unwrap(), Policy::FailOpen);
        assert_eq!("fail_closed".parse::<Policy>().unwrap(), Policy::FailClosed);
        assert!(matches!(
            "strict".parse::<Policy>(),
            Err(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_confidence_labels() {
        assert_eq!(Confidence::High.to_string(), "high");
        assert_eq!(Confidence::Low.to_string(), "low");
        assert_eq!(Confidence::None.to_string(), "none");
    }
}
