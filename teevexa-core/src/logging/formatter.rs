//! Log line formatting

use chrono::{DateTime, Utc};
use std::str::FromStr;

/// How log lines are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    /// Example: {"timestamp":"2026-01-15T10:30:00Z","level":"INFO","target":"teevexa_core::gate","message":"..."}
    Json,

    /// Human-readable, the development default
    /// Example: 2026-01-15 10:30:00.000 INFO  [teevexa_core::gate] Staff area denied for u-1: client tier
    Human,

    /// key=value pairs
    /// Example: timestamp=2026-01-15T10:30:00Z level=INFO target=teevexa_core::gate message="..."
    Logfmt,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "pretty" => Ok(LogFormat::Human),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => Err(crate::Error::Config(format!(
                "Invalid log format '{}': must be json, human, or logfmt",
                other
            ))),
        }
    }
}

/// A single record, detached from `log::Record`
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: log::Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: log::Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self { timestamp: Utc::now(), level, target: target.into(), message: message.into() }
    }

    pub fn from_record(record: &log::Record) -> Self {
        Self::new(record.level(), record.target(), record.args().to_string())
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

fn format_json(entry: &LogEntry) -> String {
    serde_json::json!({
        "timestamp": entry.timestamp.to_rfc3339(),
        "level": entry.level.as_str(),
        "target": entry.target,
        "message": entry.message,
    })
    .to_string()
}

fn format_human(entry: &LogEntry) -> String {
    format!(
        "{} {:5} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.level.as_str(),
        entry.target,
        entry.message
    )
}

fn format_logfmt(entry: &LogEntry) -> String {
    format!(
        "timestamp={} level={} target={} message=\"{}\"",
        entry.timestamp.to_rfc3339(),
        entry.level.as_str(),
        entry.target,
        entry.message.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LogEntry {
        LogEntry::new(log::Level::Warn, "teevexa_core::roles", "No role row for \"u-1\"")
    }

    #[test]
    fn test_json_format() {
        let formatted = LogFormat::Json.format_entry(&entry());

        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["target"], "teevexa_core::roles");
        assert_eq!(parsed["message"], "No role row for \"u-1\"");
    }

    #[test]
    fn test_human_format() {
        let formatted = LogFormat::Human.format_entry(&entry());
        assert!(formatted.contains("WARN  [teevexa_core::roles] No role row"));
    }

    #[test]
    fn test_logfmt_escapes_quotes() {
        let formatted = LogFormat::Logfmt.format_entry(&entry());
        assert!(formatted.contains("level=WARN"));
        assert!(formatted.ends_with("message=\"No role row for \\\"u-1\\\"\""));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("logfmt".parse::<LogFormat>().unwrap(), LogFormat::Logfmt);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
