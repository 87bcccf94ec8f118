// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Binding to the native libchdb library
//!
//! Each handle is one `chdb_conn` created with `connect_chdb`. Memory handles
//! run on a fresh temporary directory that is removed on close.

use super::{Engine, EngineOptions, NativeHandle, OpenTarget, OutputFormat, ResultBuffer};
use crate::error::{Error, Result};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::time::Duration;

mod ffi {
    use super::*;

    #[repr(C)]
    pub struct local_result_v2 {
        pub buf: *mut c_char,
        pub len: usize,
        pub _vec: *mut c_void,
        pub elapsed: f64,
        pub rows_read: u64,
        pub bytes_read: u64,
        pub error_message: *mut c_char,
    }

    #[repr(C)]
    pub struct chdb_conn {
        pub server: *mut c_void,
        pub connected: bool,
        pub queue: *mut c_void,
    }

    #[link(name = "chdb")]
    extern "C" {
        pub fn connect_chdb(argc: c_int, argv: *mut *mut c_char) -> *mut *mut chdb_conn;
        pub fn close_conn(conn: *mut *mut chdb_conn);
        pub fn query_conn(
            conn: *mut chdb_conn,
            query: *const c_char,
            format: *const c_char,
        ) -> *mut local_result_v2;
        pub fn free_result_v2(result: *mut local_result_v2);
    }
}

/// libchdb engine driver
#[derive(Debug, Default, Clone, Copy)]
pub struct ChdbEngine;

impl ChdbEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for ChdbEngine {
    fn name(&self) -> &'static str {
        "libchdb"
    }

    fn open(&self, target: &OpenTarget, options: &EngineOptions) -> Result<Box<dyn NativeHandle>> {
        let (path, temp_dir) = match target {
            OpenTarget::Memory => {
                let dir = std::env::temp_dir().join(format!("chdb_{}", uuid::Uuid::new_v4().simple()));
                std::fs::create_dir_all(&dir)?;
                (dir.clone(), Some(dir))
            }
            OpenTarget::Directory(dir) | OpenTarget::File(dir) => (dir.clone(), None),
        };

        match connect(&path, options) {
            Ok(conn) => Ok(Box::new(ChdbHandle { conn: Some(conn), temp_dir })),
            Err(e) => {
                if let Some(dir) = temp_dir {
                    let _ = std::fs::remove_dir_all(dir);
                }
                Err(e)
            }
        }
    }
}

fn engine_args(path: &Path, options: &EngineOptions) -> Vec<String> {
    let mut args = vec!["clickhouse".to_string(), format!("--path={}", path.display())];
    if let Some(udf) = &options.udf_path {
        args.push(format!("--user_scripts_path={}", udf.display()));
        args.push(format!(
            "--user_defined_executable_functions_config={}/*.xml",
            udf.display()
        ));
    }
    args
}

fn connect(path: &Path, options: &EngineOptions) -> Result<NonNull<*mut ffi::chdb_conn>> {
    let args = engine_args(path, options)
        .into_iter()
        .map(|arg| CString::new(arg).map_err(|_| Error::Engine("engine argument contains NUL".to_string())))
        .collect::<Result<Vec<CString>>>()?;
    let mut argv: Vec<*mut c_char> = args.iter().map(|a| a.as_ptr() as *mut c_char).collect();

    let conn = unsafe { ffi::connect_chdb(argv.len() as c_int, argv.as_mut_ptr()) };
    let conn = NonNull::new(conn)
        .filter(|c| unsafe { !(*c.as_ptr()).is_null() })
        .ok_or_else(|| Error::Engine(format!("failed to open chdb at {}", path.display())))?;
    log::debug!("Connected libchdb at {}", path.display());
    Ok(conn)
}

pub struct ChdbHandle {
    conn: Option<NonNull<*mut ffi::chdb_conn>>,
    temp_dir: Option<PathBuf>,
}

// The connection is only used behind the EngineHandle mutex
unsafe impl Send for ChdbHandle {}

impl NativeHandle for ChdbHandle {
    fn execute(&mut self, sql: &str, format: OutputFormat) -> Result<ResultBuffer> {
        let conn = self
            .conn
            .ok_or_else(|| Error::Engine(crate::error::HANDLE_CLOSED.to_string()))?;
        let query = CString::new(sql).map_err(|_| Error::Exec("query contains NUL".to_string()))?;
        let format_name = CString::new(format.name()).map_err(|_| Error::Exec("bad format name".to_string()))?;

        let raw = unsafe { ffi::query_conn(*conn.as_ptr(), query.as_ptr(), format_name.as_ptr()) };
        let result = NonNull::new(raw).ok_or_else(|| Error::Exec("chdb returned no result".to_string()))?;

        let buffer = unsafe {
            let r = result.as_ref();
            if !r.error_message.is_null() {
                let message = CStr::from_ptr(r.error_message).to_string_lossy().into_owned();
                Err(Error::Exec(message))
            } else {
                let bytes = if r.buf.is_null() || r.len == 0 {
                    Vec::new()
                } else {
                    std::slice::from_raw_parts(r.buf as *const u8, r.len).to_vec()
                };
                Ok(ResultBuffer::new(bytes, format).with_stats(
                    Duration::from_secs_f64(r.elapsed.max(0.0)),
                    r.rows_read,
                    r.bytes_read,
                ))
            }
        };
        unsafe { ffi::free_result_v2(result.as_ptr()) };
        buffer
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            unsafe { ffi::close_conn(conn.as_ptr()) };
        }
        if let Some(dir) = self.temp_dir.take() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
