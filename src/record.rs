use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier as delivered by the upstream table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One event row. Every field is optional; empty strings count as missing.
///
/// The upstream table uses German column names, which are accepted as
/// aliases so rows can be deserialized as they come off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Upstream title column; wins over `title` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titel: Option<String>,
    #[serde(default, alias = "datum", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, alias = "uhrzeit", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, alias = "dauer", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, alias = "ort", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, alias = "beschreibung", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, alias = "start_iso", skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(default, alias = "end_iso", skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<String>,
    #[serde(default)]
    pub published: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl EventRecord {
    pub fn title(&self) -> Option<&str> {
        present(&self.titel).or_else(|| present(&self.title))
    }

    /// Calendar date part, i.e. the first ten characters of `date`.
    /// Empty when the record carries no date.
    pub fn date_prefix(&self) -> String {
        present(&self.date)
            .map(|date| date.chars().take(10).collect())
            .unwrap_or_default()
    }

    pub fn time(&self) -> Option<&str> {
        self.time
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn duration(&self) -> &str {
        self.duration.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn location(&self) -> &str {
        present(&self.location).unwrap_or("")
    }

    pub fn description(&self) -> &str {
        present(&self.description).unwrap_or("")
    }

    /// Primary link, falling back to the attached document.
    pub fn url(&self) -> &str {
        present(&self.link)
            .or_else(|| present(&self.pdf_url))
            .unwrap_or("")
    }

    /// Explicit start and end instants, only when both are set.
    pub fn explicit_span(&self) -> Option<(&str, &str)> {
        Some((present(&self.start_timestamp)?, present(&self.end_timestamp)?))
    }
}
