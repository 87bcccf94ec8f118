// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Local engine errors

use thiserror::Error;

pub type SqlResult<T> = std::result::Result<T, SqlError>;

/// Errors raised while parsing or executing a statement
#[derive(Error, Debug)]
pub enum SqlError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Database {0} does not exist")]
    UnknownDatabase(String),

    #[error("Database {0} already exists")]
    DatabaseExists(String),

    #[error("Table {0} does not exist")]
    UnknownTable(String),

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Missing columns: '{0}'")]
    UnknownColumn(String),

    #[error("Type mismatch: {0}")]
    Type(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(String),
}

impl From<SqlError> for crate::Error {
    fn from(err: SqlError) -> Self {
        match err {
            SqlError::Storage(e) => crate::Error::Engine(format!("storage failure: {}", e)),
            SqlError::Io(e) => crate::Error::Engine(format!("storage failure: {}", e)),
            other => crate::Error::Exec(other.to_string()),
        }
    }
}
