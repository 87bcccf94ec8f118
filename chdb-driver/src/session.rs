// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stateful sessions with raw query output
//!
//! A [`Session`] keeps one directory-backed engine handle open and returns
//! engine output as-is, without decoding. Sessions created with
//! [`Session::temp`] own their directory and delete it on cleanup.

use crate::config::ConnectionConfig;
use crate::engine::{default_engine, Engine, EngineHandle, OutputFormat, ResultBuffer};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Session {
    handle: EngineHandle,
    path: PathBuf,
    is_temp: bool,
}

impl Session {
    /// Open a session rooted at `path` on the default engine
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_engine(default_engine().as_ref(), path)
    }

    /// Open a session rooted at `path` on `engine`
    pub fn with_engine(engine: &dyn Engine, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let handle = EngineHandle::open(engine, &ConnectionConfig::session(&path))?;
        Ok(Self {
            handle,
            path,
            is_temp: false,
        })
    }

    /// Open a session on a fresh temporary directory
    pub fn temp() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("chdb_session_{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&path)?;
        match Self::new(&path) {
            Ok(mut session) => {
                session.is_temp = true;
                Ok(session)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&path);
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temp(&self) -> bool {
        self.is_temp
    }

    /// Run `sql` and return the raw engine output; `CSV` when no format is given
    pub fn query(&self, sql: &str, format: Option<OutputFormat>) -> Result<ResultBuffer> {
        self.handle.execute(sql, format.unwrap_or_default())
    }

    /// Close the session handle; later queries fail
    pub fn close(&self) -> Result<()> {
        self.handle.close()
    }

    /// Close the session and delete its directory if it is temporary
    pub fn cleanup(&mut self) -> Result<()> {
        self.close()?;
        if self.is_temp && self.path.exists() {
            log::debug!("Removing temporary session directory {}", self.path.display());
            fs::remove_dir_all(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("Failed to clean up session at {}: {}", self.path.display(), e);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("is_temp", &self.is_temp)
            .field("open", &self.handle.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_session_round_trip() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(dir.path()).unwrap();
        session
            .query(
                "CREATE DATABASE IF NOT EXISTS testdb; \
                 CREATE TABLE IF NOT EXISTS testdb.testtable (id UInt32) ENGINE = MergeTree() ORDER BY id;",
                None,
            )
            .unwrap();
        session
            .query("USE testdb; INSERT INTO testtable VALUES (3), (1), (2);", None)
            .unwrap();
        let buffer = session.query("SELECT * FROM testtable;", None).unwrap();
        assert_eq!(buffer.as_str(), Some("1\n2\n3\n"));
        assert!(!session.is_temp());
    }

    #[test]
    #[serial]
    fn test_cleanup_keeps_caller_directory() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path()).unwrap();
        session.cleanup().unwrap();
        assert!(dir.path().exists());
        assert!(session.query("SELECT 1", None).unwrap_err().is_closed());
    }

    #[test]
    #[serial]
    fn test_temp_session_removes_directory() {
        let mut session = Session::temp().unwrap();
        let path = session.path().to_path_buf();
        assert!(session.is_temp());
        assert!(path.exists());
        session.query("SELECT 1", Some(OutputFormat::JsonCompact)).unwrap();
        session.cleanup().unwrap();
        assert!(!path.exists());
        session.cleanup().unwrap();
    }
}
