// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver and connection facade
//!
//! A [`Driver`] binds an [`Engine`] implementation; [`Driver::open`] parses a
//! DSN, opens one engine handle and wraps it in a [`Connection`]. Each
//! connection owns exactly one handle, so statements issued through the same
//! connection run one at a time.

use crate::config::{parse_dsn, ConnectionConfig};
use crate::engine::{default_engine, Engine, EngineHandle, HandleKind, OutputFormat, ResultBuffer};
use crate::error::Result;
use crate::result::{DecodeOptions, Row, Rows};
use crate::statement;
use crate::value::ToValue;
use std::fmt;
use std::sync::Arc;

/// Entry point that opens connections on one engine
#[derive(Clone)]
pub struct Driver {
    engine: Arc<dyn Engine>,
}

impl Driver {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Name of the bound engine
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Parse `dsn` and open a connection
    pub fn open(&self, dsn: &str) -> Result<Connection> {
        let config = parse_dsn(dsn)?;
        self.open_config(config)
    }

    /// Open a connection for an already parsed configuration
    pub fn open_config(&self, config: ConnectionConfig) -> Result<Connection> {
        let handle = EngineHandle::open(self.engine.as_ref(), &config)?;
        Ok(Connection { handle, config })
    }
}

impl Default for Driver {
    /// Driver on the default engine
    fn default() -> Self {
        Self::new(default_engine())
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver").field("engine", &self.engine.name()).finish()
    }
}

/// Outcome of a statement run for its side effects
///
/// The engine reports neither affected rows nor generated keys, so both
/// accessors return fixed values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    _private: (),
}

impl ExecResult {
    /// Always 0
    pub fn rows_affected(&self) -> u64 {
        0
    }

    /// Always `None`
    pub fn last_insert_id(&self) -> Option<i64> {
        None
    }
}

/// An open connection
///
/// `Connection` is `Send + Sync`; wrap it in an `Arc` to share it between
/// threads. Concurrent statements on one connection are serialized.
#[derive(Debug)]
pub struct Connection {
    handle: EngineHandle,
    config: ConnectionConfig,
}

impl Connection {
    /// Check that the connection is usable; runs no SQL
    pub fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    /// Run a query and decode its rows
    pub fn query(&self, sql: &str, args: &[&dyn ToValue]) -> Result<Rows> {
        let format = self.config.driver_type.output_format();
        let buffer = statement::execute(&self.handle, sql, args, format)?;
        Rows::decode(buffer, &DecodeOptions::from(&self.config))
    }

    /// Run a statement and discard its output
    pub fn exec(&self, sql: &str, args: &[&dyn ToValue]) -> Result<ExecResult> {
        let format = self.config.driver_type.output_format();
        statement::execute(&self.handle, sql, args, format)?;
        Ok(ExecResult::default())
    }

    /// Run a statement and return the engine output in `format`, undecoded
    pub fn query_raw(&self, sql: &str, args: &[&dyn ToValue], format: OutputFormat) -> Result<ResultBuffer> {
        statement::execute(&self.handle, sql, args, format)
    }

    /// Run a query expected to return at most one row
    ///
    /// Errors are deferred to [`Row::scan`].
    pub fn query_row(&self, sql: &str, args: &[&dyn ToValue]) -> Row {
        Row::new(self.query(sql, args))
    }

    /// Close the connection; later calls are no-ops
    pub fn close(&self) -> Result<()> {
        self.handle.close()
    }

    pub fn is_closed(&self) -> bool {
        !self.handle.is_open()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Flavour of the underlying engine handle
    pub fn kind(&self) -> HandleKind {
        self.handle.kind()
    }
}

/// Open a connection on the default driver
pub fn open(dsn: &str) -> Result<Connection> {
    Driver::default().open(dsn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::params;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_connection_is_send_sync() {
        assert_send_sync::<Connection>();
        assert_send_sync::<Driver>();
    }

    #[test]
    fn test_memory_query_scan() {
        let conn = open("").unwrap();
        conn.ping().unwrap();
        let mut rows = conn.query("SELECT 1, 'abc'", params![]).unwrap();
        assert_eq!(rows.columns().unwrap().len(), 2);
        let mut bar = 0i32;
        let mut foo = String::new();
        let mut seen = 0;
        while rows.next() {
            rows.scan(&mut [&mut bar, &mut foo]).unwrap();
            seen += 1;
        }
        assert_eq!((seen, bar, foo.as_str()), (1, 1, "abc"));
        rows.close();
    }

    #[test]
    fn test_bound_arguments() {
        let conn = open("").unwrap();
        let mut row = conn.query_row("SELECT ?, ?", params![1, "abc"]);
        let mut bar = 0i64;
        let mut foo = String::new();
        row.scan(&mut [&mut bar, &mut foo]).unwrap();
        assert_eq!((bar, foo.as_str()), (1, "abc"));
    }

    #[test]
    fn test_closed_connection() {
        let conn = open("").unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(conn.ping().unwrap_err().is_closed());
        assert!(conn.query("SELECT 1", params![]).unwrap_err().is_closed());
        assert!(conn.exec("SELECT 1", params![]).unwrap_err().is_closed());
    }

    #[test]
    fn test_exec_result_is_fixed() {
        let conn = open("").unwrap();
        let result = conn.exec("CREATE TABLE t (x UInt8) ENGINE = Memory", params![]).unwrap();
        assert_eq!(result.rows_affected(), 0);
        assert_eq!(result.last_insert_id(), None);
    }

    #[test]
    fn test_query_raw_ignores_driver_type() {
        let conn = open("driverType=PARQUET").unwrap();
        let buffer = conn.query_raw("SELECT ?", params![5], OutputFormat::Csv).unwrap();
        assert_eq!(buffer.as_str(), Some("5\n"));
    }

    #[test]
    fn test_bad_dsn_fails_before_engine() {
        assert!(matches!(open("foo;bar"), Err(Error::Config(_))));
    }
}
