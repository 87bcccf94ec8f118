// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution
//!
//! The engine has no placeholder protocol, so arguments are rendered as SQL
//! literals and spliced into the statement text before submission. Only `?`
//! outside quoted sections and comments counts as a placeholder.

use crate::engine::{EngineHandle, OutputFormat, ResultBuffer};
use crate::error::{Error, Result};
use crate::value::{ToValue, Value};

/// Substitute `args` into the `?` placeholders of `sql`
///
/// Without arguments the SQL is returned unchanged, even if it contains `?`.
pub fn bind(sql: &str, args: &[&dyn ToValue]) -> Result<String> {
    if args.is_empty() {
        return Ok(sql.to_string());
    }

    let positions = placeholder_positions(sql);
    if positions.len() != args.len() {
        return Err(Error::Exec(format!(
            "statement has {} placeholders but {} arguments were given",
            positions.len(),
            args.len()
        )));
    }

    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut last = 0;
    for (pos, arg) in positions.iter().zip(args) {
        out.push_str(&sql[last..*pos]);
        out.push_str(&render_literal(&arg.to_value()));
        last = pos + 1;
    }
    out.push_str(&sql[last..]);
    Ok(out)
}

/// Bind `args` and run the statement on `handle`
pub fn execute(
    handle: &EngineHandle,
    sql: &str,
    args: &[&dyn ToValue],
    format: OutputFormat,
) -> Result<ResultBuffer> {
    let composed = bind(sql, args)?;
    handle.execute(&composed, format)
}

/// Render a value as a SQL literal
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => render_float(*f),
        Value::String(s) => quote_bytes(s.as_bytes()),
        Value::Bytes(b) => quote_bytes(b),
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let literal = if f > 0.0 { "inf" } else { "-inf" };
        literal.to_string()
    } else {
        // Debug keeps a fractional part (`1.0`), so the literal stays a float
        format!("{:?}", f)
    }
}

fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('\'');
    let text = String::from_utf8_lossy(bytes);
    let valid_utf8 = matches!(text, std::borrow::Cow::Borrowed(_));
    if valid_utf8 {
        for c in text.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
    } else {
        for &b in bytes {
            match b {
                b'\\' => out.push_str("\\\\"),
                b'\'' => out.push_str("\\'"),
                0x20..=0x7e => out.push(b as char),
                _ => out.push_str(&format!("\\x{:02X}", b)),
            }
        }
    }
    out.push('\'');
    out
}

/// Byte offsets of every `?` placeholder in `sql`
fn placeholder_positions(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut positions = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'?' => {
                positions.push(i);
                i += 1;
            }
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, quote),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            _ => i += 1,
        }
    }
    positions
}

/// Index just past the quoted section opened at `start`
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}
