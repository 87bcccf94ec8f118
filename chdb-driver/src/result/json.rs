// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! JSONCompact decoding

use super::{CellKind, Column, Decoded};
use crate::error::{Error, Result};
use crate::value::Value;
use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Deserialize)]
struct Document {
    meta: Vec<Meta>,
    #[serde(default)]
    data: Vec<Vec<Json>>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Decoded> {
    let document: Document =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(format!("invalid JSONCompact result: {}", e)))?;

    let columns: Vec<Column> = document
        .meta
        .into_iter()
        .map(|m| Column::new(m.name, m.type_name))
        .collect();
    let kinds: Vec<CellKind> = columns.iter().map(|c| CellKind::of(&c.type_name)).collect();

    let rows = document
        .data
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != columns.len() {
                return Err(Error::Decode(format!(
                    "row {} has {} cells, expected {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
            row.into_iter()
                .zip(&kinds)
                .map(|(cell, kind)| cell_value(cell, *kind))
                .collect::<Result<Vec<Value>>>()
        })
        .collect::<Result<Vec<Vec<Value>>>>()?;

    Ok(Decoded { columns, rows })
}

fn cell_value(cell: Json, kind: CellKind) -> Result<Value> {
    match (cell, kind) {
        (Json::Null, _) => Ok(Value::Null),
        (Json::Bool(b), _) => Ok(Value::Bool(b)),
        (Json::Number(n), CellKind::UInt) => n
            .as_u64()
            .map(Value::UInt)
            .ok_or_else(|| Error::Decode(format!("{} is not an unsigned integer", n))),
        (Json::Number(n), CellKind::Int) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| Error::Decode(format!("{} is not a signed integer", n))),
        (Json::Number(n), CellKind::Text) => Ok(Value::String(n.to_string())),
        (Json::Number(n), _) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| Error::Decode(format!("{} is not a number", n))),
        // 64-bit integers and special floats arrive quoted
        (Json::String(s), CellKind::Text) => Ok(Value::String(s)),
        (Json::String(s), kind) => kind.parse(&s),
        (nested, _) => Ok(Value::String(nested.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_document() {
        let doc = br#"{
            "meta": [{"name": "id", "type": "UInt64"}, {"name": "v", "type": "Nullable(Float64)"}, {"name": "s", "type": "String"}],
            "data": [["18446744073709551615", 1.5, "x"], ["2", null, "y"]],
            "rows": 2
        }"#;
        let decoded = decode(doc).unwrap();
        assert_eq!(decoded.columns.len(), 3);
        assert_eq!(
            decoded.rows,
            vec![
                vec![Value::UInt(u64::MAX), Value::Float(1.5), Value::String("x".into())],
                vec![Value::UInt(2), Value::Null, Value::String("y".into())],
            ]
        );
    }

    #[test]
    fn test_small_integers_are_numbers() {
        let doc = br#"{"meta": [{"name": "n", "type": "Int32"}], "data": [[-4]]}"#;
        assert_eq!(decode(doc).unwrap().rows, vec![vec![Value::Int(-4)]]);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(decode(b"not json").is_err());
        assert!(decode(br#"{"meta": [{"name": "n", "type": "Int32"}], "data": [[1, 2]]}"#).is_err());
        assert!(decode(br#"{"meta": [{"name": "n", "type": "UInt8"}], "data": [["x"]]}"#).is_err());
    }
}
