// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Embedded engine backed by sled
//!
//! Speaks a ClickHouse-compatible subset of SQL and produces results in the
//! same output formats as libchdb, so the driver can run without the native
//! library. Memory handles get a private temporary store; directory targets
//! share one persistent store per directory. A file target such as
//! `<dir>/chdb.db` keeps its data in `<dir>`, so a connection on that file
//! sees everything written by a session on `<dir>`.

mod error;
mod executor;
mod output;
mod parser;
mod store;
mod types;

pub use error::SqlError;
pub use types::DataType;

use super::{Engine, EngineOptions, NativeHandle, OpenTarget, OutputFormat, ResultBuffer};
use crate::error::Result;
use executor::{Executor, Outcome};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use store::Store;

/// Local engine driver
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalEngine;

impl LocalEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for LocalEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    fn open(&self, target: &OpenTarget, options: &EngineOptions) -> Result<Box<dyn NativeHandle>> {
        if let Some(udf) = &options.udf_path {
            log::debug!("Local engine ignores udfPath {}", udf.display());
        }
        let store = match target {
            OpenTarget::Memory => Store::temporary(),
            OpenTarget::Directory(dir) => Store::open(dir),
            OpenTarget::File(file) => Store::open(data_dir(file)),
        }
        .map_err(|e| crate::Error::Engine(format!("failed to open local store: {}", e)))?;
        Ok(Box::new(LocalHandle { store: Some(store) }))
    }
}

/// Directory holding the data of a database file
fn data_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// One open handle on a local store
pub struct LocalHandle {
    store: Option<Arc<Store>>,
}

impl LocalHandle {
    /// Run every statement of `sql`; the output of the last one is returned
    fn run_script(store: &Store, sql: &str, format: OutputFormat) -> Result<ResultBuffer> {
        let start = Instant::now();
        let statements = parser::parse_script(sql)?;
        if statements.is_empty() {
            return Err(SqlError::Syntax("empty query".to_string()).into());
        }

        let executor = Executor::new(store);
        let mut last = Outcome::Done;
        for statement in statements {
            last = executor.execute(statement)?;
        }

        match last {
            Outcome::Done => Ok(ResultBuffer::new(Vec::new(), format).with_stats(start.elapsed(), 0, 0)),
            Outcome::Rows(set, format_override) => {
                let format = format_override.unwrap_or(format);
                let bytes = output::encode(&set, format, start.elapsed())?;
                Ok(ResultBuffer::new(bytes, format).with_stats(
                    start.elapsed(),
                    set.rows_read,
                    set.bytes_read,
                ))
            }
        }
    }
}

impl NativeHandle for LocalHandle {
    fn execute(&mut self, sql: &str, format: OutputFormat) -> Result<ResultBuffer> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| crate::Error::Engine(crate::error::HANDLE_CLOSED.to_string()))?;
        Self::run_script(store, sql, format)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(store) = self.store.take() {
            if let Some(path) = store.path() {
                log::debug!("Flushing local store at {}", path.display());
            }
            store
                .flush()
                .map_err(|e| crate::Error::Engine(format!("failed to flush local store: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn memory_handle() -> Box<dyn NativeHandle> {
        LocalEngine::new()
            .open(&OpenTarget::Memory, &EngineOptions::default())
            .unwrap()
    }

    #[test]
    fn test_script_returns_last_output() {
        let mut handle = memory_handle();
        let buffer = handle
            .execute(
                "CREATE TABLE t (x UInt32) ENGINE = Memory; INSERT INTO t VALUES (1), (2), (3); SELECT x FROM t",
                OutputFormat::Csv,
            )
            .unwrap();
        assert_eq!(buffer.as_str(), Some("1\n2\n3\n"));
        assert_eq!(buffer.rows_read(), 3);
    }

    #[test]
    fn test_ddl_produces_empty_buffer() {
        let mut handle = memory_handle();
        let buffer = handle
            .execute("CREATE DATABASE IF NOT EXISTS d", OutputFormat::JsonCompact)
            .unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_format_clause_overrides_request() {
        let mut handle = memory_handle();
        let buffer = handle.execute("SELECT 1 FORMAT TSV", OutputFormat::Csv).unwrap();
        assert_eq!(buffer.format(), OutputFormat::TabSeparated);
        assert_eq!(buffer.as_str(), Some("1\n"));
    }

    #[test]
    fn test_sql_errors_map_to_exec() {
        let mut handle = memory_handle();
        assert!(matches!(handle.execute("SELEC 1", OutputFormat::Csv), Err(Error::Exec(_))));
        assert!(matches!(handle.execute("SELECT * FROM nope", OutputFormat::Csv), Err(Error::Exec(_))));
        assert!(matches!(handle.execute("  ;  ", OutputFormat::Csv), Err(Error::Exec(_))));
    }

    #[test]
    fn test_memory_handles_are_isolated() {
        let mut first = memory_handle();
        let mut second = memory_handle();
        first.execute("CREATE TABLE t (x UInt8) ENGINE = Memory", OutputFormat::Csv).unwrap();
        assert!(second.execute("SELECT * FROM t", OutputFormat::Csv).is_err());
    }

    #[test]
    fn test_file_target_stores_data_beside_the_file() {
        assert_eq!(data_dir(Path::new("/tmp/x/chdb.db")), Path::new("/tmp/x"));
        assert_eq!(data_dir(Path::new("chdb.db")), Path::new("."));
    }
}
