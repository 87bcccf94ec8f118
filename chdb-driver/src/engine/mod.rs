// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query engine contract
//!
//! The driver talks to the engine through two traits:
//! - [`Engine`] opens native handles for a resolved [`OpenTarget`]
//! - [`NativeHandle`] executes one SQL script and returns a fully
//!   materialized [`ResultBuffer`], then is closed
//!
//! Engines never stream: a result is either completely available or an error.
//! Implementations:
//! - [`LocalEngine`] - embedded engine backed by sled (default)
//! - `ChdbEngine` - binding to the native libchdb library (`libchdb` feature)

pub mod handle;
pub mod local;
#[cfg(feature = "libchdb")]
pub mod libchdb;

pub use handle::{EngineHandle, HandleKind};
pub use local::LocalEngine;
#[cfg(feature = "libchdb")]
pub use libchdb::ChdbEngine;

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Serialization format of a result buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    CsvWithNames,
    CsvWithNamesAndTypes,
    TabSeparated,
    TabSeparatedWithNames,
    TabSeparatedWithNamesAndTypes,
    JsonCompact,
    JsonEachRow,
    ArrowStream,
    Parquet,
}

impl OutputFormat {
    /// Engine-side format name
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Csv => "CSV",
            OutputFormat::CsvWithNames => "CSVWithNames",
            OutputFormat::CsvWithNamesAndTypes => "CSVWithNamesAndTypes",
            OutputFormat::TabSeparated => "TabSeparated",
            OutputFormat::TabSeparatedWithNames => "TabSeparatedWithNames",
            OutputFormat::TabSeparatedWithNamesAndTypes => "TabSeparatedWithNamesAndTypes",
            OutputFormat::JsonCompact => "JSONCompact",
            OutputFormat::JsonEachRow => "JSONEachRow",
            OutputFormat::ArrowStream => "ArrowStream",
            OutputFormat::Parquet => "Parquet",
        }
    }

    /// True for formats whose bytes are not text
    pub fn is_binary(self) -> bool {
        matches!(self, OutputFormat::ArrowStream | OutputFormat::Parquet)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "csvwithnames" => Ok(OutputFormat::CsvWithNames),
            "csvwithnamesandtypes" => Ok(OutputFormat::CsvWithNamesAndTypes),
            "tabseparated" | "tsv" => Ok(OutputFormat::TabSeparated),
            "tabseparatedwithnames" | "tsvwithnames" => Ok(OutputFormat::TabSeparatedWithNames),
            "tabseparatedwithnamesandtypes" | "tsvwithnamesandtypes" => {
                Ok(OutputFormat::TabSeparatedWithNamesAndTypes)
            }
            "jsoncompact" => Ok(OutputFormat::JsonCompact),
            "jsoneachrow" => Ok(OutputFormat::JsonEachRow),
            "arrowstream" => Ok(OutputFormat::ArrowStream),
            "parquet" => Ok(OutputFormat::Parquet),
            _ => Err(Error::Config(format!("Unknown output format: {}", s))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully materialized query result as produced by the engine
#[derive(Debug, Clone, Default)]
pub struct ResultBuffer {
    bytes: Vec<u8>,
    format: OutputFormat,
    elapsed: Duration,
    rows_read: u64,
    bytes_read: u64,
}

impl ResultBuffer {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            bytes,
            format,
            ..Self::default()
        }
    }

    /// Attach engine-side execution statistics
    pub fn with_stats(mut self, elapsed: Duration, rows_read: u64, bytes_read: u64) -> Self {
        self.elapsed = elapsed;
        self.rows_read = rows_read;
        self.bytes_read = bytes_read;
        self
    }

    pub fn buf(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Buffer contents as text; `None` for binary or non-UTF-8 payloads
    pub fn as_str(&self) -> Option<&str> {
        if self.format.is_binary() {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Resolved location an engine handle is opened against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// Ephemeral instance, discarded on close
    Memory,
    /// Session directory; already exists when the engine sees it
    Directory(PathBuf),
    /// Database file of a single connection
    File(PathBuf),
}

/// Engine options that do not select the target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub udf_path: Option<PathBuf>,
}

/// A live native connection or session
///
/// Implementations may assume calls are never concurrent; [`EngineHandle`]
/// serializes them.
pub trait NativeHandle: Send {
    /// Execute a SQL script and return its complete output
    fn execute(&mut self, sql: &str, format: OutputFormat) -> Result<ResultBuffer>;

    /// Release native resources. Called at most once.
    fn close(&mut self) -> Result<()>;
}

/// Factory for native handles
pub trait Engine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Open a native handle. On error nothing stays allocated.
    fn open(&self, target: &OpenTarget, options: &EngineOptions) -> Result<Box<dyn NativeHandle>>;
}

/// Engine used by [`Driver::default`](crate::Driver) and the one-shot helpers
pub fn default_engine() -> Arc<dyn Engine> {
    #[cfg(feature = "libchdb")]
    {
        Arc::new(ChdbEngine::new())
    }
    #[cfg(not(feature = "libchdb"))]
    {
        Arc::new(LocalEngine::new())
    }
}
