// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! End-to-end tests for the connection facade

use chdb_driver::{open, params, DriverType, Error, OutputFormat, Session, Value};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;

const CREATE_TABLE: &str = "CREATE DATABASE IF NOT EXISTS testdb; \
     CREATE TABLE IF NOT EXISTS testdb.testtable (id UInt32) ENGINE = MergeTree() ORDER BY id;";

/// Collect the single UInt32 column of every row
fn collect_ids(conn: &chdb_driver::Connection, sql: &str) -> Vec<u32> {
    let mut rows = conn.query(sql, params![]).expect("query failed");
    assert_eq!(rows.columns().expect("columns").len(), 1);
    let mut ids = Vec::new();
    while rows.next() {
        let mut id = 0u32;
        rows.scan(&mut [&mut id]).expect("scan failed");
        ids.push(id);
    }
    rows.close();
    ids
}

#[test]
fn test_select_literals() {
    let conn = open("").expect("open failed");
    conn.ping().expect("ping failed");

    let mut rows = conn.query("SELECT 1,'abc'", params![]).expect("query failed");
    assert_eq!(rows.columns().unwrap().len(), 2);
    let (mut bar, mut foo) = (0i32, String::new());
    assert!(rows.next());
    rows.scan(&mut [&mut bar, &mut foo]).unwrap();
    assert_eq!((bar, foo.as_str()), (1, "abc"));
    assert!(!rows.next());
}

#[test]
fn test_select_with_bound_arguments() {
    let conn = open("").expect("open failed");
    let mut rows = conn.query("SELECT ?, ?", params![1, "abc"]).expect("query failed");
    assert_eq!(rows.columns().unwrap().len(), 2);
    let (mut bar, mut foo) = (0i32, String::new());
    assert!(rows.next());
    rows.scan(&mut [&mut bar, &mut foo]).unwrap();
    assert_eq!((bar, foo.as_str()), (1, "abc"));
}

#[test]
#[serial]
fn test_dsn_acceptance_matrix() {
    let root = TempDir::new().unwrap();
    let dir = |name: &str| root.path().join(name).display().to_string();
    let cases = [
        (String::new(), true),
        ("udfPath=qq".to_string(), true),
        (format!("udfPath=qq;session={}", dir("ss")), true),
        (format!("session={}", dir("sssss")), true),
        (format!("session={};udfPath=u1", dir("s2")), true),
        (format!("session={};udfPath=u2;fooobar=ssss", dir("s3")), true),
        ("foo;bar".to_string(), false),
    ];
    for (dsn, ok) in cases {
        match open(&dsn) {
            Ok(conn) => {
                assert!(ok, "dsn {:?} should fail", dsn);
                conn.ping().expect("ping failed");
            }
            Err(e) => {
                assert!(!ok, "dsn {:?} failed: {}", dsn, e);
                assert!(matches!(e, Error::Config(_)));
            }
        }
    }
}

#[test]
#[serial]
fn test_session_shared_with_driver() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::new(dir.path()).expect("session failed");
    session.query(CREATE_TABLE, None).unwrap();
    session
        .query("USE testdb; INSERT INTO testtable VALUES (1), (2), (3);", None)
        .unwrap();
    let buffer = session.query("SELECT * FROM testtable;", None).unwrap();
    assert_eq!(buffer.as_str(), Some("1\n2\n3\n"));

    let conn = open(&format!("session={}", dir.path().display())).expect("open failed");
    conn.ping().unwrap();
    assert_eq!(collect_ids(&conn, "select * from testtable;"), vec![1, 2, 3]);

    drop(conn);
    session.cleanup().unwrap();
    assert!(dir.path().exists());
}

#[test]
#[serial]
fn test_connection_driver_only() {
    let dir = TempDir::new().unwrap();
    let conn = open(&format!("connection=file:{}/chdb.db", dir.path().display())).expect("open failed");
    conn.ping().unwrap();

    conn.exec(CREATE_TABLE, params![]).expect("create failed");
    conn.exec("INSERT INTO testdb.testtable VALUES (1), (2), (3);", params![])
        .expect("insert failed");
    assert_eq!(collect_ids(&conn, "select * from testdb.testtable;"), vec![1, 2, 3]);
}

#[test]
#[serial]
fn test_connection_sees_session_data() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::new(dir.path()).expect("session failed");
    session.query(CREATE_TABLE, None).unwrap();
    session
        .query("USE testdb; INSERT INTO testtable VALUES (1), (2), (3);", None)
        .unwrap();
    let buffer = session.query("SELECT * FROM testdb.testtable;", None).unwrap();
    assert_eq!(buffer.as_str(), Some("1\n2\n3\n"));

    let conn = open(&format!("connection=file:{}/chdb.db", dir.path().display())).expect("open failed");
    conn.ping().expect("ping failed");
    assert_eq!(collect_ids(&conn, "select * from testtable;"), vec![1, 2, 3]);

    drop(conn);
    session.cleanup().unwrap();
}

#[test]
#[serial]
fn test_reopen_relative_connection_dsn() {
    let dir = tempfile::Builder::new()
        .prefix("chdb_relative")
        .tempdir_in(".")
        .expect("Failed to create relative temp directory");
    let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
    let dsn = format!("connection=file:{}/chdb.db", name);

    let first = open(&dsn).expect("first open failed");
    first.exec(CREATE_TABLE, params![]).unwrap();
    first.exec("INSERT INTO testdb.testtable VALUES (5)", params![]).unwrap();

    let started = std::time::Instant::now();
    let second = open(&dsn).expect("second open failed");
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert_eq!(collect_ids(&second, "SELECT * FROM testdb.testtable"), vec![5]);
}

#[cfg(unix)]
#[test]
#[serial]
fn test_reopen_symlinked_connection_dsn() {
    let root = TempDir::new().unwrap();
    let real = root.path().join("real");
    std::fs::create_dir(&real).unwrap();
    let link = root.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let dsn = format!("connection=file:{}/chdb.db", link.display());

    let first = open(&dsn).expect("first open failed");
    first.exec(CREATE_TABLE, params![]).unwrap();
    first.exec("INSERT INTO testdb.testtable VALUES (8), (9)", params![]).unwrap();

    let second = open(&dsn).expect("second open failed");
    assert_eq!(collect_ids(&second, "SELECT * FROM testdb.testtable"), vec![8, 9]);

    let through_real = open(&format!("session={}", real.display())).expect("session open failed");
    assert_eq!(collect_ids(&through_real, "SELECT * FROM testdb.testtable"), vec![8, 9]);
}

#[test]
#[serial]
fn test_query_row_scans_once() {
    let dir = TempDir::new().unwrap();
    let conn = open(&format!("session={}", dir.path().display())).expect("open failed");
    conn.exec(CREATE_TABLE, params![]).unwrap();
    conn.exec("INSERT INTO testdb.testtable VALUES (1), (2), (3);", params![])
        .unwrap();

    let mut row = conn.query_row("select * from testdb.testtable;", params![]);
    assert!(row.err().is_none());
    let mut bar = 0u64;
    row.scan(&mut [&mut bar]).expect("first scan failed");
    assert_eq!(bar, 1);
    assert!(row.scan(&mut [&mut bar]).is_err());
}

#[test]
fn test_query_row_errors() {
    let conn = open("").unwrap();
    let mut row = conn.query_row("SELECT * FROM missing_table", params![]);
    assert!(matches!(row.err(), Some(Error::Exec(_))));
    let mut x = 0u8;
    assert!(matches!(row.scan(&mut [&mut x]), Err(Error::Exec(_))));

    conn.exec("CREATE TABLE empty (x UInt8) ENGINE = Memory", params![]).unwrap();
    let mut row = conn.query_row("SELECT x FROM empty", params![]);
    assert!(matches!(row.scan(&mut [&mut x]), Err(Error::NoRows)));
}

#[test]
fn test_placeholder_mismatch() {
    let conn = open("").unwrap();
    assert!(matches!(conn.query("SELECT ?", params![1, 2]), Err(Error::Exec(_))));
    let mut rows = conn.query("SELECT '?'", params![]).unwrap();
    assert!(rows.next());
    assert_eq!(rows.get::<String>(0).unwrap(), "?");
}

#[test]
fn test_scan_type_mismatch_names_column() {
    let conn = open("").unwrap();
    let mut rows = conn.query("SELECT 'abc' AS word", params![]).unwrap();
    assert!(rows.next());
    let mut n = 0i64;
    match rows.scan(&mut [&mut n]) {
        Err(Error::Scan { column, .. }) => assert_eq!(column, "word"),
        other => panic!("expected scan error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_every_driver_type_decodes_identically() {
    let dir = TempDir::new().unwrap();
    let setup = open(&format!("session={}", dir.path().display())).unwrap();
    setup
        .exec(
            "CREATE TABLE items (id UInt32, name String, score Float64, delta Int64, tag Nullable(String), ok Bool) \
             ENGINE = MergeTree() ORDER BY id",
            params![],
        )
        .unwrap();
    setup
        .exec(
            "INSERT INTO items VALUES (?, ?, ?, ?, ?, ?), (?, ?, ?, ?, ?, ?)",
            params![2, "b,\"q\"", -0.25, i64::MIN, None::<String>, false, 1, "a\tb", 1.5, 7, "x", true],
        )
        .unwrap();

    let expected = vec![
        vec![
            Value::UInt(1),
            Value::String("a\tb".into()),
            Value::Float(1.5),
            Value::Int(7),
            Value::String("x".into()),
            Value::Bool(true),
        ],
        vec![
            Value::UInt(2),
            Value::String("b,\"q\"".into()),
            Value::Float(-0.25),
            Value::Int(i64::MIN),
            Value::Null,
            Value::Bool(false),
        ],
    ];

    for driver_type in ["CSV", "TSV", "JSON", "ARROW", "PARQUET"] {
        let conn = open(&format!(
            "session={};driverType={};bufferSize=1",
            dir.path().display(),
            driver_type
        ))
        .unwrap();
        assert_eq!(conn.config().driver_type, driver_type.parse::<DriverType>().unwrap());

        let mut rows = conn.query("SELECT * FROM items", params![]).unwrap();
        assert_eq!(
            rows.columns().unwrap(),
            vec!["id", "name", "score", "delta", "tag", "ok"],
            "{}",
            driver_type
        );
        let mut decoded = Vec::new();
        while rows.next() {
            decoded.push(rows.values().unwrap().to_vec());
        }
        assert_eq!(decoded, expected, "{}", driver_type);
    }
}

#[test]
fn test_concurrent_queries_on_shared_connection() {
    let conn = Arc::new(open("").unwrap());
    conn.exec("CREATE TABLE n (x UInt64) ENGINE = Memory", params![]).unwrap();

    let workers: Vec<_> = (0..4u64)
        .map(|worker| {
            let conn = conn.clone();
            std::thread::spawn(move || {
                for i in 0..10u64 {
                    conn.exec("INSERT INTO n VALUES (?)", params![worker * 100 + i]).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut row = conn.query_row("SELECT count() FROM n", params![]);
    let mut count = 0u64;
    row.scan(&mut [&mut count]).unwrap();
    assert_eq!(count, 40);
}

#[test]
#[serial]
fn test_concurrent_inserts_from_independent_session_handles() {
    let dir = TempDir::new().unwrap();
    let dsn = format!("session={}", dir.path().display());
    let first = Arc::new(open(&dsn).expect("first open failed"));
    let second = Arc::new(open(&dsn).expect("second open failed"));
    first
        .exec("CREATE TABLE n (x UInt64) ENGINE = MergeTree() ORDER BY x", params![])
        .unwrap();

    let workers: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .enumerate()
        .map(|(worker, conn)| {
            std::thread::spawn(move || {
                for i in 0..20u64 {
                    conn.exec("INSERT INTO n VALUES (?)", params![worker as u64 * 100 + i])
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for conn in [&first, &second] {
        let mut row = conn.query_row("SELECT count() FROM n", params![]);
        let mut count = 0u64;
        row.scan(&mut [&mut count]).unwrap();
        assert_eq!(count, 40);
    }
}

#[test]
fn test_raw_buffer_formats() {
    let buffer = chdb_driver::query_buffer("SELECT 1 AS x FORMAT JSONEachRow", None).unwrap();
    assert_eq!(buffer.format(), OutputFormat::JsonEachRow);
    assert_eq!(buffer.as_str(), Some("{\"x\":1}\n"));

    let parquet = chdb_driver::query_buffer("SELECT 1", Some(OutputFormat::Parquet)).unwrap();
    assert!(parquet.as_str().is_none());
    assert!(parquet.buf().starts_with(b"PAR1"));
}
