// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! chdb-driver - connection-oriented SQL driver for the embedded chDB engine
//!
//! The engine runs in-process, executes whole SQL scripts and returns one
//! fully buffered result in a chosen output format. This crate puts a
//! familiar client interface on top of it: open a connection from a DSN,
//! ping it, run queries with `?` arguments and walk the rows with a cursor.
//!
//! # Quick Start
//!
//! ```ignore
//! use chdb_driver::{open, params};
//!
//! let conn = open("session=/tmp/chdb_demo;driverType=PARQUET")?;
//! conn.exec("CREATE TABLE IF NOT EXISTS t (id UInt32) ENGINE = MergeTree() ORDER BY id", params![])?;
//! conn.exec("INSERT INTO t VALUES (?), (?)", params![1, 2])?;
//!
//! let mut rows = conn.query("SELECT id FROM t", params![])?;
//! while rows.next() {
//!     let mut id = 0u32;
//!     rows.scan(&mut [&mut id])?;
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`config`] - DSN parsing into [`ConnectionConfig`]
//! - [`engine`] - engine contract, handle lifecycle and the bundled engines
//! - [`statement`] - placeholder binding and submission
//! - [`result`] - result decoding, [`Rows`] cursor and [`Row`]
//! - [`connection`] - [`Driver`] and [`Connection`] facade
//! - [`session`] - stateful sessions returning raw engine output

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod result;
pub mod session;
pub mod statement;
pub mod value;

pub use config::{parse_dsn, ConnectionConfig, DriverType, Mode};
pub use connection::{open, Connection, Driver, ExecResult};
pub use engine::{
    default_engine, Engine, EngineHandle, EngineOptions, HandleKind, LocalEngine, NativeHandle, OpenTarget,
    OutputFormat, ResultBuffer,
};
#[cfg(feature = "libchdb")]
pub use engine::ChdbEngine;
pub use error::{Error, Result};
pub use result::{Column, DecodeOptions, FromValue, Row, Rows, ScanTarget};
pub use session::Session;
pub use value::{ToValue, Value};

/// Run `sql` on a throwaway in-memory handle and decode the rows
///
/// The handle is closed before returning; nothing is shared between calls.
pub fn query(sql: &str, driver_type: Option<DriverType>) -> Result<Rows> {
    let config = ConnectionConfig::in_memory(driver_type.unwrap_or_default());
    let buffer = one_shot(&config, sql, config.driver_type.output_format())?;
    Rows::decode(buffer, &DecodeOptions::from(&config))
}

/// Run `sql` on a throwaway in-memory handle and return the raw output
///
/// Defaults to `CSV`.
pub fn query_buffer(sql: &str, format: Option<OutputFormat>) -> Result<ResultBuffer> {
    let config = ConnectionConfig::default();
    one_shot(&config, sql, format.unwrap_or_default())
}

fn one_shot(config: &ConnectionConfig, sql: &str, format: OutputFormat) -> Result<ResultBuffer> {
    let engine = default_engine();
    let handle = EngineHandle::open(engine.as_ref(), config)?;
    let result = handle.execute(sql, format);
    let closed = handle.close();
    let buffer = result?;
    closed?;
    Ok(buffer)
}
