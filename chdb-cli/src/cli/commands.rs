// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for chdb

use clap::{Parser, Subcommand, ValueEnum};

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// chdb CLI - SQL on the embedded chDB engine
#[derive(Parser)]
#[command(name = "chdb")]
#[command(about = "chdb - run SQL against the embedded chDB engine")]
#[command(version)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show detailed version information
    Version,

    /// Execute a SQL query
    Query {
        /// The SQL query to execute
        query: String,

        /// Connection string, e.g. "session=/tmp/chdb;driverType=JSON"
        #[arg(long, default_value = "")]
        dsn: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Interactive SQL console (REPL)
    Repl {
        /// Connection string
        #[arg(long, default_value = "")]
        dsn: String,
    },

    /// Run concurrent insert/query rules against one connection
    Workload {
        /// Connection string
        #[arg(long, default_value = "session=/tmp/chdb_test/;bufferSize=1024;driverType=PARQUET")]
        dsn: String,

        /// Number of concurrent rules
        #[arg(long, default_value_t = 10)]
        rules: usize,

        /// Rows inserted per round
        #[arg(long, default_value_t = 100)]
        batch: usize,

        /// Shortest pause between rounds, in seconds
        #[arg(long, default_value_t = 10)]
        min_interval: u64,

        /// Longest pause between rounds, in seconds
        #[arg(long, default_value_t = 60)]
        max_interval: u64,

        /// Rounds per rule; runs until interrupted when omitted
        #[arg(long)]
        rounds: Option<u64>,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    /// Engine output as-is
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_workload_defaults() {
        let cli = Cli::parse_from(["chdb", "workload", "--rounds", "2"]);
        match cli.command {
            Commands::Workload {
                rules,
                batch,
                min_interval,
                max_interval,
                rounds,
                ..
            } => {
                assert_eq!((rules, batch, min_interval, max_interval), (10, 100, 10, 60));
                assert_eq!(rounds, Some(2));
            }
            _ => panic!("expected workload command"),
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("RAW".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
