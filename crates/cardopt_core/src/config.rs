//! Store configuration and connection-string parsing.
//!
//! # Responsibility
//! - Describe which SQLite target to open and whether to log statements.
//! - Parse `key=value;` connection strings into `StoreConfig`.
//!
//! # Invariants
//! - A parsed config always names exactly one target.
//! - Keys are matched case-insensitively with inner spaces/underscores ignored.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const MEMORY_TARGET: &str = ":memory:";

/// SQLite target for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTarget {
    /// Private in-memory database, discarded when the connection closes.
    Memory,
    /// Database file at the given path.
    File(PathBuf),
}

/// Configuration used by `db::open_store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub target: StoreTarget,
    /// Logs every executed statement at `debug` level.
    #[serde(default)]
    pub verbose_sql: bool,
}

/// Connection-string parse failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Segment has no `=` separator.
    MalformedSegment(String),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
    DuplicateKey(String),
    /// No `Data Source` was given.
    MissingTarget,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSegment(segment) => {
                write!(f, "connection string segment `{segment}` is not `key=value`")
            }
            Self::UnknownKey(key) => write!(f, "unknown connection string key `{key}`"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for connection string key `{key}`")
            }
            Self::DuplicateKey(key) => write!(f, "connection string key `{key}` given twice"),
            Self::MissingTarget => write!(f, "connection string must set `Data Source`"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKey {
    Target,
    VerboseSql,
}

impl StoreConfig {
    /// In-memory store without statement logging.
    pub fn in_memory() -> Self {
        Self {
            target: StoreTarget::Memory,
            verbose_sql: false,
        }
    }

    /// File-backed store without statement logging.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: StoreTarget::File(path.into()),
            verbose_sql: false,
        }
    }

    /// Returns a copy with statement logging switched on or off.
    pub fn with_verbose_sql(mut self, verbose_sql: bool) -> Self {
        self.verbose_sql = verbose_sql;
        self
    }

    /// Parses a connection string such as
    /// `Data Source=/var/lib/cardopt.db; Verbose SQL=true`.
    ///
    /// # Errors
    /// - Returns `MalformedSegment` for a non-empty segment without `=`.
    /// - Returns `UnknownKey` / `InvalidValue` / `DuplicateKey` for bad pairs.
    /// - Returns `MissingTarget` when no data source is present.
    pub fn from_connection_string(value: &str) -> Result<Self, ConfigError> {
        let mut target = None;
        let mut verbose_sql = None;

        for segment in value.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedSegment(segment.to_string()))?;
            let raw_key = raw_key.trim();
            let raw_value = raw_value.trim();

            match parse_key(raw_key)? {
                ConfigKey::Target => {
                    if target.is_some() {
                        return Err(ConfigError::DuplicateKey(raw_key.to_string()));
                    }
                    target = Some(parse_target(raw_key, raw_value)?);
                }
                ConfigKey::VerboseSql => {
                    if verbose_sql.is_some() {
                        return Err(ConfigError::DuplicateKey(raw_key.to_string()));
                    }
                    verbose_sql = Some(parse_bool(raw_key, raw_value)?);
                }
            }
        }

        Ok(Self {
            target: target.ok_or(ConfigError::MissingTarget)?,
            verbose_sql: verbose_sql.unwrap_or(false),
        })
    }
}

fn parse_key(raw_key: &str) -> Result<ConfigKey, ConfigError> {
    let normalized = raw_key
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "datasource" | "target" => Ok(ConfigKey::Target),
        "verbosesql" | "verbose" => Ok(ConfigKey::VerboseSql),
        _ => Err(ConfigError::UnknownKey(raw_key.to_string())),
    }
}

fn parse_target(key: &str, value: &str) -> Result<StoreTarget, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    if value.eq_ignore_ascii_case(MEMORY_TARGET) {
        return Ok(StoreTarget::Memory);
    }
    Ok(StoreTarget::File(PathBuf::from(value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
