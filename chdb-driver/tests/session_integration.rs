// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tests for stateful sessions

use chdb_driver::{Error, OutputFormat, Session};
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn test_session_state_survives_reopen() {
    let dir = TempDir::new().expect("Failed to create temp directory");

    {
        let mut session = Session::new(dir.path()).expect("Failed to open session");
        session
            .query(
                "CREATE DATABASE IF NOT EXISTS logs; \
                 CREATE TABLE logs.events (ts UInt64, msg String) ENGINE = MergeTree() ORDER BY ts; \
                 USE logs; \
                 INSERT INTO events VALUES (20, 'second'), (10, 'first');",
                None,
            )
            .expect("Failed to populate session");
        session.cleanup().expect("Failed to close session");
    }

    let session = Session::new(dir.path()).expect("Failed to reopen session");
    let buffer = session
        .query("SELECT msg FROM events ORDER BY ts DESC", Some(OutputFormat::TabSeparated))
        .expect("Query failed");
    assert_eq!(buffer.as_str(), Some("second\nfirst\n"));
    assert_eq!(buffer.rows_read(), 2);
}

#[test]
#[serial]
fn test_engine_errors_carry_message() {
    let session = Session::temp().expect("Failed to open temp session");
    match session.query("SELECT * FROM nowhere", None) {
        Err(Error::Exec(message)) => assert!(message.contains("nowhere"), "{}", message),
        other => panic!("expected exec error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_closed_session_rejects_queries() {
    let session = Session::temp().expect("Failed to open temp session");
    session.close().expect("Failed to close session");
    session.close().expect("Second close should be a no-op");
    let err = session.query("SELECT 1", None).unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
}

#[test]
#[serial]
fn test_drop_removes_temp_directory() {
    let session = Session::temp().expect("Failed to open temp session");
    let path = session.path().to_path_buf();
    drop(session);
    assert!(!path.exists());
}
