// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property-based tests for connection-string parsing

use chdb_driver::{parse_dsn, ConnectionConfig, DriverType, Error, Mode};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Option values: no separators, no surrounding whitespace
fn option_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_/.:-]{1,24}"
}

fn driver_type() -> impl Strategy<Value = DriverType> {
    prop_oneof![
        Just(DriverType::Csv),
        Just(DriverType::Tsv),
        Just(DriverType::Json),
        Just(DriverType::Arrow),
        Just(DriverType::Parquet),
    ]
}

fn mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::InMemory),
        option_value().prop_map(|v| Mode::Session(PathBuf::from(v))),
        option_value().prop_map(|v| Mode::Connection(format!("file:{}", v))),
    ]
}

fn config() -> impl Strategy<Value = ConnectionConfig> {
    (
        mode(),
        prop::option::of(1..65_536usize),
        driver_type(),
        prop::option::of(option_value().prop_map(PathBuf::from)),
        prop::collection::btree_map("x[a-z]{1,8}", option_value(), 0..3),
    )
        .prop_map(|(mode, buffer_size, driver_type, udf_path, extra)| ConnectionConfig {
            mode,
            buffer_size,
            driver_type,
            udf_path,
            extra: extra.into_iter().collect::<BTreeMap<_, _>>(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the canonical DSN of a configuration parses back to it
    #[test]
    fn display_then_parse_is_identity(config in config()) {
        let dsn = config.to_string();
        let parsed = parse_dsn(&dsn).unwrap();
        prop_assert_eq!(parsed, config, "dsn {:?}", dsn);
    }

    /// Property: a bare word that is not a memory flag is always rejected
    #[test]
    fn bare_words_are_rejected(word in "[a-z]{1,12}", prefix in prop::option::of(option_value())) {
        prop_assume!(word != "memory");
        let dsn = match prefix {
            Some(dir) => format!("session={};{}", dir, word),
            None => word.clone(),
        };
        let err = parse_dsn(&dsn).unwrap_err();
        prop_assert!(matches!(err, Error::Config(_)));
        prop_assert!(err.to_string().contains(&word));
    }

    /// Property: session and connection together never parse
    #[test]
    fn session_and_connection_conflict(dir in option_value(), file in option_value()) {
        let dsn = format!("connection=file:{};session={}", file, dir);
        prop_assert!(parse_dsn(&dsn).is_err());
    }

    /// Property: parsing never creates the session directory
    #[test]
    fn parsing_has_no_side_effects(name in "[a-z]{8,16}") {
        let dir = std::env::temp_dir().join(format!("chdb_dsn_probe_{}", name));
        prop_assume!(!dir.exists());
        let config = parse_dsn(&format!("session={}", dir.display())).unwrap();
        prop_assert_eq!(config.mode, Mode::Session(dir.clone()));
        prop_assert!(!dir.exists());
    }

    /// Property: empty tokens and surrounding whitespace are ignored
    #[test]
    fn whitespace_and_empty_tokens_are_ignored(size in 1..10_000usize, pad in " {0,3}") {
        let dsn = format!(";{pad}bufferSize={size}{pad};;");
        let config = parse_dsn(&dsn).unwrap();
        prop_assert_eq!(config.buffer_size, Some(size));
        prop_assert_eq!(config.mode, Mode::InMemory);
    }
}
