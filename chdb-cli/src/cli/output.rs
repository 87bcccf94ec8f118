// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result rendering for the terminal

use chdb_driver::{Rows, Value};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use super::commands::OutputFormat;

/// Renders decoded rows as table, JSON or CSV
pub struct ResultFormatter;

impl ResultFormatter {
    /// Consume `rows` and render them in `format`
    pub fn format(rows: &mut Rows, format: OutputFormat) -> chdb_driver::Result<String> {
        let columns = rows.columns()?;
        let mut data = Vec::new();
        while rows.next() {
            data.push(rows.values()?.to_vec());
        }
        rows.close();

        Ok(match format {
            OutputFormat::Table | OutputFormat::Raw => Self::table(&columns, &data),
            OutputFormat::Json => Self::json(&columns, &data),
            OutputFormat::Csv => Self::csv(&columns, &data),
        })
    }

    fn table(columns: &[String], data: &[Vec<Value>]) -> String {
        if columns.is_empty() {
            return "OK".to_string();
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.iter().map(Cell::new));
        for row in data {
            table.add_row(row.iter().map(|v| Cell::new(v.to_string())));
        }
        format!("{}\n{} row(s)", table, data.len())
    }

    fn json(columns: &[String], data: &[Vec<Value>]) -> String {
        let rows: Vec<serde_json::Value> = data
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(json_value))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    fn csv(columns: &[String], data: &[Vec<Value>]) -> String {
        let mut out = String::new();
        out.push_str(&columns.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","));
        for row in data {
            out.push('\n');
            let fields: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    Value::String(s) => csv_field(s),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&fields.join(","));
        }
        out
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::UInt(u) => serde_json::Value::from(*u),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chdb_driver::{params, open};

    fn sample() -> Rows {
        let conn = open("").unwrap();
        conn.query("SELECT 1 AS n, 'a,b' AS s", params![]).unwrap()
    }

    #[test]
    fn test_csv_rendering() {
        let out = ResultFormatter::format(&mut sample(), OutputFormat::Csv).unwrap();
        assert_eq!(out, "n,s\n1,\"a,b\"");
    }

    #[test]
    fn test_json_rendering() {
        let out = ResultFormatter::format(&mut sample(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["n"], serde_json::json!(1));
        assert_eq!(parsed[0]["s"], serde_json::json!("a,b"));
    }

    #[test]
    fn test_table_rendering() {
        let out = ResultFormatter::format(&mut sample(), OutputFormat::Table).unwrap();
        assert!(out.contains("a,b"));
        assert!(out.ends_with("1 row(s)"));
    }
}
