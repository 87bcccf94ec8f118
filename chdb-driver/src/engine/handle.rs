// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine handle lifecycle
//!
//! [`EngineHandle`] exclusively owns one native handle and enforces the
//! engine's single-flight rule: at most one statement runs on a handle at a
//! time, later callers block on the handle mutex until it is released.
//! Closing is idempotent and also happens on drop.

use super::{Engine, EngineOptions, NativeHandle, OpenTarget, OutputFormat, ResultBuffer};
use crate::config::{ConnectionConfig, Mode};
use crate::error::{Error, Result, HANDLE_CLOSED};
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// Flavour of an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Memory,
    Session,
    Connection,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Memory => "memory",
            HandleKind::Session => "session",
            HandleKind::Connection => "connection",
        };
        write!(f, "{}", name)
    }
}

/// An open engine connection or session
pub struct EngineHandle {
    id: Uuid,
    kind: HandleKind,
    target: OpenTarget,
    closed: AtomicBool,
    native: Mutex<Option<Box<dyn NativeHandle>>>,
}

impl EngineHandle {
    /// Open a handle for `config` on `engine`
    ///
    /// Session directories are created when missing. If the engine then fails
    /// to open, a directory created here is removed again (when still empty).
    pub fn open(engine: &dyn Engine, config: &ConnectionConfig) -> Result<Self> {
        let options = EngineOptions {
            udf_path: config.udf_path.clone(),
        };
        let (kind, target, created_dir) = resolve_target(&config.mode)?;

        let native = match engine.open(&target, &options) {
            Ok(native) => native,
            Err(e) => {
                if let Some(dir) = created_dir {
                    remove_dir_if_empty(&dir);
                }
                return Err(e);
            }
        };

        let handle = Self {
            id: Uuid::new_v4(),
            kind,
            target,
            closed: AtomicBool::new(false),
            native: Mutex::new(Some(native)),
        };
        log::debug!(
            "Opened {} handle {} on {} engine ({:?})",
            handle.kind,
            handle.id,
            engine.name(),
            handle.target
        );
        Ok(handle)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn target(&self) -> &OpenTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Verify the handle is still usable without running any SQL
    pub fn ping(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Engine(HANDLE_CLOSED.to_string()))
        }
    }

    /// Execute `sql` and return the full result
    ///
    /// Blocks while another statement runs on this handle. The engine call
    /// itself cannot be interrupted.
    pub fn execute(&self, sql: &str, format: OutputFormat) -> Result<ResultBuffer> {
        let mut guard = self.native.lock();
        let native = guard
            .as_mut()
            .ok_or_else(|| Error::Engine(HANDLE_CLOSED.to_string()))?;

        let start = Instant::now();
        let result = native.execute(sql, format);
        match &result {
            Ok(buffer) => log::debug!(
                "Handle {} executed query in {:?}: {} bytes of {}",
                self.id,
                start.elapsed(),
                buffer.len(),
                format
            ),
            Err(e) => log::debug!("Handle {} query failed: {}", self.id, e),
        }
        result
    }

    /// Release the native handle; later calls are no-ops
    pub fn close(&self) -> Result<()> {
        let native = self.native.lock().take();
        let Some(mut native) = native else {
            return Ok(());
        };
        self.closed.store(true, Ordering::Release);
        let result = native.close();
        log::debug!("Closed {} handle {}", self.kind, self.id);
        result
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close handle {}: {}", self.id, e);
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Map a configured mode onto an engine target
///
/// Returns the directory created for a session, if any, so a failed open can
/// undo it.
fn resolve_target(mode: &Mode) -> Result<(HandleKind, OpenTarget, Option<PathBuf>)> {
    match mode {
        Mode::InMemory => Ok((HandleKind::Memory, OpenTarget::Memory, None)),
        Mode::Session(dir) => {
            let created = if dir.exists() {
                if !dir.is_dir() {
                    return Err(Error::Engine(format!(
                        "session path {} is not a directory",
                        dir.display()
                    )));
                }
                None
            } else {
                fs::create_dir_all(dir).map_err(|e| {
                    Error::Engine(format!(
                        "failed to create session directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                Some(dir.clone())
            };
            Ok((HandleKind::Session, OpenTarget::Directory(dir.clone()), created))
        }
        Mode::Connection(uri) => {
            let Some(path) = connection_path(uri) else {
                return Ok((HandleKind::Connection, OpenTarget::Memory, None));
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    return Err(Error::Engine(format!(
                        "directory {} for connection {} does not exist",
                        parent.display(),
                        uri
                    )));
                }
            }
            Ok((HandleKind::Connection, OpenTarget::File(path), None))
        }
    }
}

/// Filesystem path of a connection URI; `None` for in-memory URIs
///
/// Accepts `file:<path>`, `file:///<path>` and bare paths. A `?query`
/// suffix is ignored.
pub fn connection_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file:").unwrap_or(uri);
    let rest = rest.split('?').next().unwrap_or_default();
    let rest = if rest.starts_with("///") { &rest[2..] } else { rest };
    if rest.is_empty() || rest == ":memory:" {
        None
    } else {
        Some(PathBuf::from(rest))
    }
}

fn remove_dir_if_empty(dir: &Path) {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        if let Err(e) = fs::remove_dir(dir) {
            log::warn!("Failed to remove directory {}: {}", dir.display(), e);
        }
    }
}
