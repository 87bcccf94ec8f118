// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the driver

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for driver operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or contradictory connection string
    #[error("Config error: {0}")]
    Config(String),

    /// Native open/close failure, or an operation on a closed handle
    #[error("Engine error: {0}")]
    Engine(String),

    /// SQL execution failure, including placeholder/argument mismatches
    #[error("Exec error: {0}")]
    Exec(String),

    /// Malformed or unrecognized result buffer
    #[error("Decode error: {0}")]
    Decode(String),

    /// Destination count or type does not match the result columns
    #[error("Scan error on column '{column}': {message}")]
    Scan { column: String, message: String },

    /// API misuse, e.g. scanning without a current row
    #[error("Usage error: {0}")]
    Usage(String),

    /// A single-row query produced no rows
    #[error("no rows in result set")]
    NoRows,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn scan(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Scan {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Copy of this error; I/O errors keep their kind and message
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Error::Config(m) => Error::Config(m.clone()),
            Error::Engine(m) => Error::Engine(m.clone()),
            Error::Exec(m) => Error::Exec(m.clone()),
            Error::Decode(m) => Error::Decode(m.clone()),
            Error::Scan { column, message } => Error::scan(column.clone(), message.clone()),
            Error::Usage(m) => Error::Usage(m.clone()),
            Error::NoRows => Error::NoRows,
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }

    /// True for errors raised because the handle was already closed
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Engine(msg) if msg == HANDLE_CLOSED)
    }
}

pub(crate) const HANDLE_CLOSED: &str = "handle is closed";
