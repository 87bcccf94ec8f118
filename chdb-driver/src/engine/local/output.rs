// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result serialization in the engine's output formats

use super::error::{SqlError, SqlResult};
use super::executor::ResultSet;
use super::types::DataType;
use crate::engine::OutputFormat;
use crate::value::Value;
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, FixedSizeBinaryArray, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, NullArray, RecordBatch, RecordBatchOptions, UInt16Array,
    UInt32Array, UInt64Array, UInt8Array,
};
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{Field, Schema};
use parquet::arrow::arrow_writer::ArrowWriter;
use std::sync::Arc;
use std::time::Duration;

/// Serialize `set` in `format`
pub fn encode(set: &ResultSet, format: OutputFormat, elapsed: Duration) -> SqlResult<Vec<u8>> {
    match format {
        OutputFormat::Csv => Ok(delimited(set, Delimited::Csv, Header::None)),
        OutputFormat::CsvWithNames => Ok(delimited(set, Delimited::Csv, Header::Names)),
        OutputFormat::CsvWithNamesAndTypes => Ok(delimited(set, Delimited::Csv, Header::NamesAndTypes)),
        OutputFormat::TabSeparated => Ok(delimited(set, Delimited::Tsv, Header::None)),
        OutputFormat::TabSeparatedWithNames => Ok(delimited(set, Delimited::Tsv, Header::Names)),
        OutputFormat::TabSeparatedWithNamesAndTypes => {
            Ok(delimited(set, Delimited::Tsv, Header::NamesAndTypes))
        }
        OutputFormat::JsonCompact => json_compact(set, elapsed),
        OutputFormat::JsonEachRow => json_each_row(set),
        OutputFormat::ArrowStream => arrow_stream(set),
        OutputFormat::Parquet => parquet(set),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Delimited {
    Csv,
    Tsv,
}

#[derive(Clone, Copy, PartialEq)]
enum Header {
    None,
    Names,
    NamesAndTypes,
}

fn delimited(set: &ResultSet, style: Delimited, header: Header) -> Vec<u8> {
    let mut out = Vec::new();
    let separator = if style == Delimited::Csv { b',' } else { b'\t' };
    let write_text = |out: &mut Vec<u8>, text: &[u8]| match style {
        Delimited::Csv => csv_quoted(out, text),
        Delimited::Tsv => tsv_escaped(out, text),
    };

    if header != Header::None {
        for (i, column) in set.columns.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            write_text(&mut out, column.name.as_bytes());
        }
        out.push(b'\n');
    }
    if header == Header::NamesAndTypes {
        for (i, column) in set.columns.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            write_text(&mut out, column.data_type.to_string().as_bytes());
        }
        out.push(b'\n');
    }

    for row in &set.rows {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            match value {
                Value::Null => out.extend_from_slice(b"\\N"),
                Value::String(s) => write_text(&mut out, s.as_bytes()),
                Value::Bytes(b) => write_text(&mut out, b),
                other => out.extend_from_slice(scalar_text(other).as_bytes()),
            }
        }
        out.push(b'\n');
    }
    out
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Float(f) if f.is_nan() => "nan".to_string(),
        Value::Float(f) if f.is_infinite() => {
            let text = if *f > 0.0 { "inf" } else { "-inf" };
            text.to_string()
        }
        other => other.to_string(),
    }
}

fn csv_quoted(out: &mut Vec<u8>, text: &[u8]) {
    out.push(b'"');
    for &b in text {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

fn tsv_escaped(out: &mut Vec<u8>, text: &[u8]) {
    for &b in text {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0 => out.extend_from_slice(b"\\0"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            b'\'' => out.extend_from_slice(b"\\'"),
            other => out.push(other),
        }
    }
}

fn json_cell(value: &Value, data_type: &DataType) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        // 64-bit integers are quoted so JavaScript readers keep full precision
        Value::UInt(u) if data_type.is_wide_integer() => Json::String(u.to_string()),
        Value::Int(i) if data_type.is_wide_integer() => Json::String(i.to_string()),
        Value::UInt(u) => Json::from(*u),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
    }
}

fn json_compact(set: &ResultSet, elapsed: Duration) -> SqlResult<Vec<u8>> {
    let meta: Vec<serde_json::Value> = set
        .columns
        .iter()
        .map(|c| serde_json::json!({ "name": c.name, "type": c.data_type.to_string() }))
        .collect();
    let data: Vec<serde_json::Value> = set
        .rows
        .iter()
        .map(|row| {
            serde_json::Value::Array(
                row.iter()
                    .zip(&set.columns)
                    .map(|(v, c)| json_cell(v, &c.data_type))
                    .collect(),
            )
        })
        .collect();
    let document = serde_json::json!({
        "meta": meta,
        "data": data,
        "rows": set.rows.len(),
        "statistics": {
            "elapsed": elapsed.as_secs_f64(),
            "rows_read": set.rows_read,
            "bytes_read": set.bytes_read,
        }
    });
    let mut out = serde_json::to_vec_pretty(&document).map_err(|e| SqlError::Output(e.to_string()))?;
    out.push(b'\n');
    Ok(out)
}

fn json_each_row(set: &ResultSet) -> SqlResult<Vec<u8>> {
    let mut out = Vec::new();
    for row in &set.rows {
        out.push(b'{');
        for (i, (value, column)) in row.iter().zip(&set.columns).enumerate() {
            if i > 0 {
                out.push(b',');
            }
            serde_json::to_writer(&mut out, &column.name).map_err(|e| SqlError::Output(e.to_string()))?;
            out.push(b':');
            serde_json::to_writer(&mut out, &json_cell(value, &column.data_type))
                .map_err(|e| SqlError::Output(e.to_string()))?;
        }
        out.extend_from_slice(b"}\n");
    }
    Ok(out)
}

fn record_batch(set: &ResultSet) -> SqlResult<RecordBatch> {
    let mut fields = Vec::with_capacity(set.columns.len());
    let mut arrays = Vec::with_capacity(set.columns.len());
    for (idx, column) in set.columns.iter().enumerate() {
        let cells: Vec<&Value> = set.rows.iter().map(|row| &row[idx]).collect();
        let array = arrow_column(&column.data_type, &cells)?;
        fields.push(Field::new(
            column.name.as_str(),
            array.data_type().clone(),
            column.data_type.is_nullable(),
        ));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(set.rows.len()));
    RecordBatch::try_new_with_options(schema, arrays, &options).map_err(|e| SqlError::Output(e.to_string()))
}

fn int_cell(value: &Value) -> Option<i128> {
    match value {
        Value::Int(i) => Some(*i as i128),
        Value::UInt(u) => Some(*u as i128),
        Value::Bool(b) => Some(*b as i128),
        Value::Float(f) => Some(*f as i128),
        _ => None,
    }
}

fn bytes_cell(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.as_bytes().to_vec()),
        Value::Bytes(b) => Some(b.clone()),
        other => Some(other.to_string().into_bytes()),
    }
}

macro_rules! int_array {
    ($array:ty, $native:ty, $cells:expr) => {
        Arc::new(
            $cells
                .iter()
                .map(|v| int_cell(v).map(|n| n as $native))
                .collect::<$array>(),
        ) as ArrayRef
    };
}

fn arrow_column(data_type: &DataType, cells: &[&Value]) -> SqlResult<ArrayRef> {
    let array = match data_type.base() {
        DataType::UInt8 => int_array!(UInt8Array, u8, cells),
        DataType::UInt16 => int_array!(UInt16Array, u16, cells),
        DataType::UInt32 => int_array!(UInt32Array, u32, cells),
        DataType::UInt64 => int_array!(UInt64Array, u64, cells),
        DataType::Int8 => int_array!(Int8Array, i8, cells),
        DataType::Int16 => int_array!(Int16Array, i16, cells),
        DataType::Int32 => int_array!(Int32Array, i32, cells),
        DataType::Int64 => int_array!(Int64Array, i64, cells),
        DataType::Float32 => Arc::new(
            cells
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Float32Array>(),
        ) as ArrayRef,
        DataType::Float64 => Arc::new(cells.iter().map(|v| v.as_f64()).collect::<Float64Array>()) as ArrayRef,
        DataType::Bool => Arc::new(
            cells
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    other => int_cell(other).map(|n| n != 0),
                })
                .collect::<BooleanArray>(),
        ) as ArrayRef,
        DataType::String => Arc::new(cells.iter().map(|v| bytes_cell(v)).collect::<BinaryArray>()) as ArrayRef,
        DataType::FixedString(n) => {
            let array = FixedSizeBinaryArray::try_from_sparse_iter_with_size(
                cells.iter().map(|v| bytes_cell(v)),
                *n as i32,
            )
            .map_err(|e| SqlError::Output(e.to_string()))?;
            Arc::new(array) as ArrayRef
        }
        DataType::Nothing | DataType::Nullable(_) => Arc::new(NullArray::new(cells.len())) as ArrayRef,
    };
    Ok(array)
}

fn arrow_stream(set: &ResultSet) -> SqlResult<Vec<u8>> {
    let batch = record_batch(set)?;
    let mut out = Vec::new();
    {
        let mut writer =
            StreamWriter::try_new(&mut out, &batch.schema()).map_err(|e| SqlError::Output(e.to_string()))?;
        if batch.num_rows() > 0 {
            writer.write(&batch).map_err(|e| SqlError::Output(e.to_string()))?;
        }
        writer.finish().map_err(|e| SqlError::Output(e.to_string()))?;
    }
    Ok(out)
}

fn parquet(set: &ResultSet) -> SqlResult<Vec<u8>> {
    let batch = record_batch(set)?;
    let mut out = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut out, batch.schema(), None).map_err(|e| SqlError::Output(e.to_string()))?;
    if batch.num_rows() > 0 {
        writer.write(&batch).map_err(|e| SqlError::Output(e.to_string()))?;
    }
    writer.close().map_err(|e| SqlError::Output(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::local::store::ColumnDef;

    fn sample() -> ResultSet {
        ResultSet {
            columns: vec![
                ColumnDef {
                    name: "id".to_string(),
                    data_type: DataType::UInt64,
                },
                ColumnDef {
                    name: "name".to_string(),
                    data_type: DataType::Nullable(Box::new(DataType::String)),
                },
            ],
            rows: vec![
                vec![Value::UInt(1), Value::String("a,\"b\"".into())],
                vec![Value::UInt(2), Value::Null],
            ],
            rows_read: 2,
            bytes_read: 0,
        }
    }

    #[test]
    fn test_csv_output() {
        let out = encode(&sample(), OutputFormat::CsvWithNamesAndTypes, Duration::ZERO).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"id\",\"name\"\n\"UInt64\",\"Nullable(String)\"\n1,\"a,\"\"b\"\"\"\n2,\\N\n"
        );
        let raw = encode(&sample(), OutputFormat::Csv, Duration::ZERO).unwrap();
        assert!(raw.starts_with(b"1,"));
    }

    #[test]
    fn test_tsv_output_escapes() {
        let mut set = sample();
        set.rows[0][1] = Value::String("a\tb\nc".into());
        let out = encode(&set, OutputFormat::TabSeparated, Duration::ZERO).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\ta\\tb\\nc\n2\t\\N\n");
    }

    #[test]
    fn test_json_quotes_wide_integers() {
        let out = encode(&sample(), OutputFormat::JsonCompact, Duration::ZERO).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["data"][0][0], serde_json::json!("1"));
        assert_eq!(doc["data"][1][1], serde_json::Value::Null);
        assert_eq!(doc["meta"][1]["type"], serde_json::json!("Nullable(String)"));
        assert_eq!(doc["rows"], serde_json::json!(2));

        let each = encode(&sample(), OutputFormat::JsonEachRow, Duration::ZERO).unwrap();
        let first_line = String::from_utf8(each).unwrap().lines().next().unwrap().to_string();
        assert_eq!(first_line, r#"{"id":"1","name":"a,\"b\""}"#);
    }

    #[test]
    fn test_columnar_outputs_are_produced() {
        let arrow = encode(&sample(), OutputFormat::ArrowStream, Duration::ZERO).unwrap();
        assert!(!arrow.is_empty());
        let parquet = encode(&sample(), OutputFormat::Parquet, Duration::ZERO).unwrap();
        assert_eq!(&parquet[..4], b"PAR1");
    }
}
