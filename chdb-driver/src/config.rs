// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection-string parsing
//!
//! A DSN is a semicolon-separated list of `key=value` options:
//!
//! | key          | meaning                                            |
//! |--------------|----------------------------------------------------|
//! | `session`    | directory of a stateful session                    |
//! | `connection` | file URI of a single connection (`file:<path>`)    |
//! | `bufferSize` | read buffer (rows per batch) for columnar decoders |
//! | `driverType` | result format: CSV, TSV, JSON, ARROW, PARQUET      |
//! | `udfPath`    | directory holding user-defined function scripts   |
//!
//! An empty DSN selects in-memory mode. Unknown `key=value` options are kept
//! but ignored; bare words other than the `:memory:` flag are rejected.
//! Parsing never touches the filesystem.

use crate::engine::OutputFormat;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Bare flags accepted without a value; both select in-memory mode
const MEMORY_FLAGS: [&str; 2] = [":memory:", "memory"];

/// Batch size used by columnar decoders when `bufferSize` is absent
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Which kind of engine handle a connection uses
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Fresh ephemeral engine instance, nothing persisted
    #[default]
    InMemory,
    /// Stateful engine rooted at a directory, shared across opens
    Session(PathBuf),
    /// Single connection bound to a file URI such as `file:/tmp/x/chdb.db`
    Connection(String),
}

/// Result format requested from the engine
///
/// Each driver type maps to an engine output format that carries column
/// names and types, so the decoder can build column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverType {
    /// Row-oriented CSV text
    #[default]
    Csv,
    /// Row-oriented tab-separated text
    Tsv,
    /// JSON document with metadata and row arrays
    Json,
    /// Arrow IPC stream
    Arrow,
    /// Parquet file
    Parquet,
}

impl DriverType {
    /// Engine output format used when executing through the driver
    pub fn output_format(self) -> OutputFormat {
        match self {
            DriverType::Csv => OutputFormat::CsvWithNamesAndTypes,
            DriverType::Tsv => OutputFormat::TabSeparatedWithNamesAndTypes,
            DriverType::Json => OutputFormat::JsonCompact,
            DriverType::Arrow => OutputFormat::ArrowStream,
            DriverType::Parquet => OutputFormat::Parquet,
        }
    }
}

impl FromStr for DriverType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(DriverType::Csv),
            "tsv" | "tabseparated" => Ok(DriverType::Tsv),
            "json" | "jsoncompact" => Ok(DriverType::Json),
            "arrow" | "arrowstream" => Ok(DriverType::Arrow),
            "parquet" => Ok(DriverType::Parquet),
            _ => Err(Error::Config(format!(
                "Unknown driver type: {}. Valid options: CSV, TSV, JSON, ARROW, PARQUET",
                s
            ))),
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverType::Csv => "CSV",
            DriverType::Tsv => "TSV",
            DriverType::Json => "JSON",
            DriverType::Arrow => "ARROW",
            DriverType::Parquet => "PARQUET",
        };
        write!(f, "{}", name)
    }
}

/// Typed connection configuration parsed from a DSN
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionConfig {
    pub mode: Mode,
    pub buffer_size: Option<usize>,
    pub driver_type: DriverType,
    pub udf_path: Option<PathBuf>,
    /// Unrecognized options, kept for diagnostics
    pub extra: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Configuration for an in-memory handle with the given driver type
    pub fn in_memory(driver_type: DriverType) -> Self {
        Self {
            driver_type,
            ..Self::default()
        }
    }

    /// Configuration for a session rooted at `dir`
    pub fn session(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::Session(dir.into()),
            ..Self::default()
        }
    }

    /// Batch size for columnar decoders
    pub fn decode_batch_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }
}

impl FromStr for ConnectionConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_dsn(s)
    }
}

impl fmt::Display for ConnectionConfig {
    /// Canonical DSN; parsing it yields an equal configuration
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match &self.mode {
            Mode::InMemory => {}
            Mode::Session(dir) => parts.push(format!("session={}", dir.display())),
            Mode::Connection(uri) => parts.push(format!("connection={}", uri)),
        }
        if let Some(size) = self.buffer_size {
            parts.push(format!("bufferSize={}", size));
        }
        if self.driver_type != DriverType::default() {
            parts.push(format!("driverType={}", self.driver_type));
        }
        if let Some(udf) = &self.udf_path {
            parts.push(format!("udfPath={}", udf.display()));
        }
        for (key, value) in &self.extra {
            parts.push(format!("{}={}", key, value));
        }
        write!(f, "{}", parts.join(";"))
    }
}

/// Parse a DSN into a [`ConnectionConfig`]
///
/// Fails fast: the first malformed token aborts parsing and no partial
/// configuration is returned.
pub fn parse_dsn(dsn: &str) -> Result<ConnectionConfig> {
    let mut config = ConnectionConfig::default();
    let mut session: Option<String> = None;
    let mut connection: Option<String> = None;
    let mut memory_flag = false;

    for raw in dsn.split(';') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        let Some((key, value)) = token.split_once('=') else {
            if MEMORY_FLAGS.contains(&token) {
                memory_flag = true;
                continue;
            }
            return Err(Error::Config(format!(
                "invalid option '{}': expected key=value",
                token
            )));
        };

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(Error::Config(format!(
                "invalid option '{}': empty key",
                token
            )));
        }

        match key {
            "session" => session = Some(require_value(key, value)?.to_string()),
            "connection" => connection = Some(require_value(key, value)?.to_string()),
            "bufferSize" => config.buffer_size = Some(parse_buffer_size(value)?),
            "driverType" => config.driver_type = value.parse()?,
            "udfPath" => config.udf_path = Some(PathBuf::from(require_value(key, value)?)),
            _ => {
                log::debug!("Ignoring unknown connection option '{}'", key);
                config.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    config.mode = match (session, connection) {
        (Some(_), Some(_)) => {
            return Err(Error::Config(
                "options 'session' and 'connection' are mutually exclusive".to_string(),
            ))
        }
        (Some(_), None) | (None, Some(_)) if memory_flag => {
            return Err(Error::Config(
                "':memory:' cannot be combined with 'session' or 'connection'".to_string(),
            ))
        }
        (Some(dir), None) => Mode::Session(PathBuf::from(dir)),
        (None, Some(uri)) => Mode::Connection(uri),
        (None, None) => Mode::InMemory,
    };

    Ok(config)
}

fn require_value<'a>(key: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::Config(format!("option '{}' requires a value", key)));
    }
    Ok(value)
}

fn parse_buffer_size(value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(Error::Config(format!(
            "invalid bufferSize '{}': expected a positive integer",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_matrix() {
        let cases = [
            ("", true),
            ("udfPath=qq", true),
            ("udfPath=qq;session=ss", true),
            ("session=sssss", true),
            ("session=s2;udfPath=u1", true),
            ("session=s3;udfPath=u2;fooobar=ssss", true),
            ("foo;bar", false),
        ];
        for (dsn, ok) in cases {
            assert_eq!(parse_dsn(dsn).is_ok(), ok, "dsn {:?}", dsn);
        }
    }

    #[test]
    fn test_modes() {
        assert_eq!(parse_dsn("").unwrap().mode, Mode::InMemory);
        assert_eq!(
            parse_dsn("session=/tmp/s").unwrap().mode,
            Mode::Session(PathBuf::from("/tmp/s"))
        );
        assert_eq!(
            parse_dsn("connection=file:/tmp/c/chdb.db").unwrap().mode,
            Mode::Connection("file:/tmp/c/chdb.db".to_string())
        );
        assert_eq!(parse_dsn(":memory:;bufferSize=8").unwrap().mode, Mode::InMemory);
    }

    #[test]
    fn test_session_and_connection_conflict() {
        let err = parse_dsn("session=a;connection=file:b").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(parse_dsn("session=a;:memory:").is_err());
    }

    #[test]
    fn test_bare_token_error_names_token() {
        let err = parse_dsn("session=a;bogus").unwrap_err();
        assert!(err.to_string().contains("bogus"), "{}", err);
    }

    #[test]
    fn test_typed_options() {
        let config = parse_dsn("session=/tmp/chdb_test/;bufferSize=1024;driverType=PARQUET").unwrap();
        assert_eq!(config.buffer_size, Some(1024));
        assert_eq!(config.driver_type, DriverType::Parquet);
        assert_eq!(config.decode_batch_size(), 1024);

        assert!(parse_dsn("bufferSize=0").is_err());
        assert!(parse_dsn("bufferSize=abc").is_err());
        assert!(parse_dsn("driverType=XML").is_err());
        assert!(parse_dsn("session=").is_err());
        assert!(parse_dsn("=value").is_err());
    }

    #[test]
    fn test_unknown_options_are_kept() {
        let config = parse_dsn("fooobar=ssss; trailing=1 ;").unwrap();
        assert_eq!(config.extra.get("fooobar").map(String::as_str), Some("ssss"));
        assert_eq!(config.extra.get("trailing").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_display_round_trip() {
        let config = parse_dsn("connection=file:/tmp/x.db?mode=ro;driverType=json;udfPath=/u;k=v").unwrap();
        let reparsed = parse_dsn(&config.to_string()).unwrap();
        assert_eq!(config, reparsed);
    }
}
