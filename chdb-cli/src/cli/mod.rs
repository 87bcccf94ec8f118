// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for chdb
//!
//! Provides one-off query execution, an interactive SQL console (REPL)
//! and a concurrent insert/query workload.

pub mod commands;
pub mod handlers;
pub mod output;
pub mod workload;

pub use commands::{Cli, Commands};
pub use handlers::{handle_query, handle_repl, handle_version};
pub use workload::{run_workload, WorkloadOptions};
