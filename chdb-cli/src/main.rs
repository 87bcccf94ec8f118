// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! chdb command-line entry point

mod cli;

use clap::Parser;
use cli::{handle_query, handle_repl, handle_version, run_workload, Cli, Commands, WorkloadOptions};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match (cli.log_level, cli.verbose) {
        (Some(level), _) => level.to_level_filter(),
        (None, true) => log::LevelFilter::Debug,
        (None, false) => log::LevelFilter::Warn,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Version => {
            handle_version();
            Ok(())
        }
        Commands::Query { query, dsn, format } => handle_query(dsn, query, format),
        Commands::Repl { dsn } => handle_repl(dsn),
        Commands::Workload {
            dsn,
            rules,
            batch,
            min_interval,
            max_interval,
            rounds,
        } => run_workload(WorkloadOptions {
            dsn,
            rules,
            batch,
            min_interval: Duration::from_secs(min_interval),
            max_interval: Duration::from_secs(max_interval),
            rounds,
        }),
    }
}
