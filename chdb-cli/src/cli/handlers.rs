// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for chdb

use chdb_driver::{open, params, Connection};
use colored::Colorize;
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::io::Write;
use std::path::Path;

use super::commands::OutputFormat;
use super::output::ResultFormatter;

/// Handle the query command (one-off query execution)
pub fn handle_query(dsn: String, query: String, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open(&dsn)?;

    if format == OutputFormat::Raw {
        let buffer = conn.query_raw(&query, params![], chdb_driver::OutputFormat::Csv)?;
        std::io::stdout().write_all(buffer.buf())?;
        log::info!(
            "{} rows read in {:?}",
            buffer.rows_read(),
            buffer.elapsed()
        );
        return Ok(());
    }

    match run_statement(&conn, &query, format) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            Err(e.into())
        }
    }
}

/// Handle the repl command
pub fn handle_repl(dsn: String) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open(&dsn)?;

    println!("{}", "chdb".bold().green());
    println!("Type 'help' for commands, 'exit' or 'quit' to exit");
    println!("Multi-line queries supported - use ';' to terminate");
    println!("{}", format!("Connection mode: {:?}", conn.config().mode).cyan());

    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(config)?;

    let history_path = ".chdb/.sql_history.txt";
    if let Some(parent) = Path::new(&history_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let _ = rl.load_history(&history_path);

    let mut query_buffer = String::new();

    loop {
        let prompt = if query_buffer.is_empty() { "chdb> " } else { "...> " };

        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !query_buffer.is_empty() {
                    query_buffer.clear();
                    println!("{}", "\nQuery buffer cleared".yellow());
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();

        if query_buffer.is_empty() {
            match trimmed.to_lowercase().as_str() {
                "exit" | "quit" => {
                    println!("{}", "Goodbye!".green());
                    break;
                }
                "help" => {
                    print_help();
                    continue;
                }
                "clear" => {
                    print!("\x1B[2J\x1B[1;1H");
                    std::io::stdout().flush()?;
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }

        query_buffer.push_str(&line);
        query_buffer.push('\n');

        if trimmed.ends_with(';') {
            let query = query_buffer.trim().to_string();
            rl.add_history_entry(&query)?;

            match run_statement(&conn, &query, OutputFormat::Table) {
                Ok(output) => println!("{}", output),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }

            query_buffer.clear();
        }
    }

    let _ = rl.save_history(&history_path);
    conn.close()?;

    Ok(())
}

/// Handle the version command
pub fn handle_version() {
    println!("{} {}", "chdb".bold().green(), env!("CARGO_PKG_VERSION"));
    println!("Engine: {}", chdb_driver::Driver::default().engine_name());
    println!("Default driver type: {}", chdb_driver::DriverType::default());
}

/// Run one statement and render its rows
fn run_statement(conn: &Connection, query: &str, format: OutputFormat) -> chdb_driver::Result<String> {
    let mut rows = conn.query(query, params![])?;
    ResultFormatter::format(&mut rows, format)
}

/// Print help message
fn print_help() {
    println!("{}", "Available commands:".bold().green());
    println!("  {}  - Show this help message", "help".cyan());
    println!("  {}  - Exit the SQL console", "exit/quit".cyan());
    println!("  {}  - Clear the screen", "clear".cyan());
    println!("\n{}", "Query syntax:".bold().green());
    println!("  Multi-line queries are supported");
    println!("  Terminate queries with semicolon (;)");
    println!("\n{}", "SQL examples:".bold().green());
    println!("  {}", "CREATE TABLE t (id UInt32, name String) ENGINE = MergeTree() ORDER BY id;".yellow());
    println!("  {}", "INSERT INTO t VALUES (1, 'one'), (2, 'two');".yellow());
    println!("  {}", "SELECT count(), max(id) FROM t WHERE id > 0;".yellow());
}
