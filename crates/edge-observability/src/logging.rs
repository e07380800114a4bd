//! Structured logging with request context.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use edge_core::RequestId;
use serde::Serialize;
use serde_json::Value;

use crate::decision::DecisionRecord;

/// Error for unrecognized level or format names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log {kind}: {value:?}")]
pub struct LogSettingError {
    kind: &'static str,
    value: String,
}

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        })
    }
}

impl FromStr for LogLevel {
    type Err = LogSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LogSettingError {
                kind: "level",
                value: s.to_string(),
            }),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation.
    #[default]
    Json,
    /// `[LEVEL] message | k=v` lines, for local runs.
    Human,
}

impl FromStr for LogFormat {
    type Err = LogSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "human" | "text" => Ok(Self::Human),
            _ => Err(LogSettingError {
                kind: "format",
                value: s.to_string(),
            }),
        }
    }
}

/// One log line before formatting.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    /// Microseconds since the logger was created.
    pub elapsed_us: u64,
}

impl LogEntry {
    fn format(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Json => {
                serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
            }
            LogFormat::Human => {
                let mut line = format!("[{}] {} ({}us)", self.level, self.message, self.elapsed_us);
                for (key, value) in &self.fields {
                    line.push_str(&format!(" {}={}", key, value));
                }
                line
            }
        }
    }
}

/// Structured logger bound to one request.
///
/// Every line carries the request ID so a decision can be found next to
/// the request that produced it. Lines go to stderr, which the host captures.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    component: Option<String>,
    uri: Option<String>,
    start_time: Instant,
    min_level: LogLevel,
    format: LogFormat,
}

impl StructuredLogger {
    /// Create a logger at info level with JSON output.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            component: None,
            uri: None,
            start_time: Instant::now(),
            min_level: LogLevel::Info,
            format: LogFormat::Json,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Drop lines below `level`.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Log a message at error level.
    pub fn error(&self, message: &str) {
        self.entry(LogLevel::Error, message).emit();
    }

    /// Log a routing decision at info level.
    pub fn decision(&self, record: &DecisionRecord) {
        let mut entry = self.entry(LogLevel::Info, "experiment decision");
        entry.fields = record.to_fields();
        entry.emit();
    }

    /// Start a line with extra fields.
    pub fn entry(&self, level: LogLevel, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder {
            logger: self,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Format a line, or `None` when `level` is filtered out.
    pub fn render(
        &self,
        level: LogLevel,
        message: &str,
        fields: BTreeMap<String, Value>,
    ) -> Option<String> {
        if level < self.min_level {
            return None;
        }

        let entry = LogEntry {
            level,
            message: message.to_string(),
            request_id: self.request_id.to_string(),
            component: self.component.clone(),
            uri: self.uri.clone(),
            fields,
            elapsed_us: self.start_time.elapsed().as_micros() as u64,
        };
        Some(entry.format(self.format))
    }
}

/// A pending log line; fields are added fluently, then emitted.
pub struct LogBuilder<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, Value>,
}

impl LogBuilder<'_> {
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    pub fn render(self) -> Option<String> {
        self.logger.render(self.level, &self.message, self.fields)
    }

    pub fn emit(self) {
        if let Some(line) = self.render() {
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionOutcome;

    fn logger() -> StructuredLogger {
        StructuredLogger::new(RequestId::from_string("req-42"))
            .with_component("ab-router")
            .with_uri("/")
    }

    #[test]
    fn test_json_line_carries_context() {
        let line = logger()
            .entry(LogLevel::Info, "viewer request")
            .field("method", "GET")
            .field_bool("has_query", false)
            .render()
            .unwrap();

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["request_id"], "req-42");
        assert_eq!(value["component"], "ab-router");
        assert_eq!(value["uri"], "/");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["has_query"], false);
    }

    #[test]
    fn test_min_level_filters() {
        let logger = logger().with_min_level(LogLevel::Warn);
        assert!(logger.entry(LogLevel::Info, "quiet").render().is_none());
        assert!(logger.entry(LogLevel::Error, "loud").render().is_some());

        let logger = logger.with_min_level(LogLevel::Debug);
        assert!(logger.entry(LogLevel::Debug, "settings").render().is_some());
    }

    #[test]
    fn test_human_format() {
        let line = logger()
            .with_format(LogFormat::Human)
            .entry(LogLevel::Info, "hello")
            .field_i64("cookies", 3)
            .render()
            .unwrap();

        assert!(line.starts_with("[INFO] hello ("));
        assert!(line.ends_with("cookies=3"));
    }

    #[test]
    fn test_decision_fields_are_flattened() {
        let record = DecisionRecord {
            uri: "/".to_string(),
            variant: "B".to_string(),
            source: "cookie".to_string(),
            outcome: DecisionOutcome::Redirect,
            status: Some(302),
            location: Some("/blue/index.html".to_string()),
            set_cookie: None,
            draw: None,
        };

        let line = logger()
            .render(LogLevel::Info, "experiment decision", record.to_fields())
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["outcome"], "redirect");
        assert_eq!(value["location"], "/blue/index.html");
        assert!(value.get("set_cookie").is_none());
    }

    #[test]
    fn test_parse_level_and_format() {
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("verbose".parse::<LogLevel>().is_err());

        assert_eq!("human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
