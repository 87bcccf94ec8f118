// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Column types of the local engine
//!
//! Type names follow ClickHouse. Values are kept in the shared [`Value`]
//! representation; [`DataType::coerce`] normalizes inserted values so every
//! stored cell matches its column type.

use super::error::{SqlError, SqlResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    Bool,
    Nullable(Box<DataType>),
    /// Type of a bare `NULL` literal
    Nothing,
}

impl DataType {
    /// Parse a type name such as `UInt32`, `Nullable(String)` or `FixedString(26)`
    ///
    /// `LowCardinality(T)` is accepted and stored as `T`.
    pub fn parse(name: &str) -> SqlResult<Self> {
        let name = name.trim();
        if let Some(inner) = wrapped(name, "Nullable") {
            let inner = DataType::parse(inner)?;
            return Ok(inner.into_nullable());
        }
        if let Some(inner) = wrapped(name, "LowCardinality") {
            return DataType::parse(inner);
        }
        if let Some(len) = wrapped(name, "FixedString") {
            let len = len
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| SqlError::Type(format!("invalid FixedString length in {}", name)))?;
            return Ok(DataType::FixedString(len));
        }

        let ty = match name {
            "UInt8" => DataType::UInt8,
            "UInt16" => DataType::UInt16,
            "UInt32" => DataType::UInt32,
            "UInt64" => DataType::UInt64,
            "Int8" => DataType::Int8,
            "Int16" => DataType::Int16,
            "Int32" => DataType::Int32,
            "Int64" => DataType::Int64,
            "Float32" => DataType::Float32,
            "Float64" => DataType::Float64,
            "String" => DataType::String,
            "Bool" => DataType::Bool,
            "Nothing" => DataType::Nothing,
            // SQL-standard aliases are case-insensitive
            other => match other.to_lowercase().as_str() {
                "tinyint" => DataType::Int8,
                "smallint" => DataType::Int16,
                "int" | "integer" => DataType::Int32,
                "bigint" => DataType::Int64,
                "float" | "real" => DataType::Float32,
                "double" => DataType::Float64,
                "text" | "varchar" | "char" | "blob" => DataType::String,
                "bool" | "boolean" => DataType::Bool,
                _ => return Err(SqlError::Type(format!("Unknown data type {}", name))),
            },
        };
        Ok(ty)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_) | DataType::Nothing)
    }

    /// Type without a `Nullable` wrapper
    pub fn base(&self) -> &DataType {
        match self {
            DataType::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn into_nullable(self) -> DataType {
        match self {
            DataType::Nullable(_) => self,
            DataType::Nothing => DataType::Nullable(Box::new(DataType::Nothing)),
            other => DataType::Nullable(Box::new(other)),
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self.base(),
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 | DataType::Bool
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self.base(),
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self.base(), DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_unsigned() || self.is_signed() || self.is_float()
    }

    /// 64-bit integers are quoted in JSON output
    pub fn is_wide_integer(&self) -> bool {
        matches!(self.base(), DataType::UInt64 | DataType::Int64)
    }

    /// Type ClickHouse assigns to a literal
    pub fn of_literal(value: &Value) -> DataType {
        match value {
            Value::Null => DataType::Nullable(Box::new(DataType::Nothing)),
            Value::Bool(_) => DataType::Bool,
            Value::UInt(u) => match *u {
                0..=0xFF => DataType::UInt8,
                0x100..=0xFFFF => DataType::UInt16,
                0x1_0000..=0xFFFF_FFFF => DataType::UInt32,
                _ => DataType::UInt64,
            },
            Value::Int(i) if *i >= 0 => DataType::of_literal(&Value::UInt(*i as u64)),
            Value::Int(i) => {
                if *i >= i8::MIN as i64 {
                    DataType::Int8
                } else if *i >= i16::MIN as i64 {
                    DataType::Int16
                } else if *i >= i32::MIN as i64 {
                    DataType::Int32
                } else {
                    DataType::Int64
                }
            }
            Value::Float(_) => DataType::Float64,
            Value::String(_) | Value::Bytes(_) => DataType::String,
        }
    }

    /// Zero value inserted for NULL into a non-nullable column
    pub fn default_value(&self) -> Value {
        match self {
            DataType::Nullable(_) | DataType::Nothing => Value::Null,
            DataType::Bool => Value::Bool(false),
            t if t.is_unsigned() => Value::UInt(0),
            t if t.is_signed() => Value::Int(0),
            t if t.is_float() => Value::Float(0.0),
            DataType::FixedString(n) => Value::String("\0".repeat(*n)),
            _ => Value::String(String::new()),
        }
    }

    /// Convert `value` into the canonical representation for this type
    pub fn coerce(&self, value: Value) -> SqlResult<Value> {
        if value.is_null() {
            return Ok(self.default_value());
        }
        match self {
            DataType::Nullable(inner) => inner.coerce(value),
            DataType::Nothing => Err(self.mismatch(&value)),
            DataType::UInt8 => self.unsigned(value, u8::MAX as u64),
            DataType::UInt16 => self.unsigned(value, u16::MAX as u64),
            DataType::UInt32 => self.unsigned(value, u32::MAX as u64),
            DataType::UInt64 => self.unsigned(value, u64::MAX),
            DataType::Int8 => self.signed(value, i8::MIN as i64, i8::MAX as i64),
            DataType::Int16 => self.signed(value, i16::MIN as i64, i16::MAX as i64),
            DataType::Int32 => self.signed(value, i32::MIN as i64, i32::MAX as i64),
            DataType::Int64 => self.signed(value, i64::MIN, i64::MAX),
            DataType::Float32 => Ok(Value::Float(self.float(&value)? as f32 as f64)),
            DataType::Float64 => Ok(Value::Float(self.float(&value)?)),
            DataType::Bool => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::UInt(u @ (0 | 1)) => Ok(Value::Bool(u == 1)),
                Value::Int(i @ (0 | 1)) => Ok(Value::Bool(i == 1)),
                Value::String(ref s) if s == "true" || s == "false" => Ok(Value::Bool(s == "true")),
                other => Err(self.mismatch(&other)),
            },
            DataType::String => Ok(text_value(into_bytes(value))),
            DataType::FixedString(n) => {
                let mut bytes = into_bytes(value);
                if bytes.len() > *n {
                    return Err(SqlError::Type(format!(
                        "Too large value for FixedString({}): {} bytes",
                        n,
                        bytes.len()
                    )));
                }
                bytes.resize(*n, 0);
                Ok(text_value(bytes))
            }
        }
    }

    fn unsigned(&self, value: Value, max: u64) -> SqlResult<Value> {
        let n: i128 = match &value {
            Value::UInt(u) => *u as i128,
            Value::Int(i) => *i as i128,
            Value::Bool(b) => *b as i128,
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i128,
            Value::String(s) => s
                .trim()
                .parse::<i128>()
                .map_err(|_| self.mismatch(&value))?,
            _ => return Err(self.mismatch(&value)),
        };
        if n < 0 || n > max as i128 {
            return Err(SqlError::Type(format!("Value {} is out of range for {}", value, self)));
        }
        Ok(Value::UInt(n as u64))
    }

    fn signed(&self, value: Value, min: i64, max: i64) -> SqlResult<Value> {
        let n: i128 = match &value {
            Value::UInt(u) => *u as i128,
            Value::Int(i) => *i as i128,
            Value::Bool(b) => *b as i128,
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i128,
            Value::String(s) => s
                .trim()
                .parse::<i128>()
                .map_err(|_| self.mismatch(&value))?,
            _ => return Err(self.mismatch(&value)),
        };
        if n < min as i128 || n > max as i128 {
            return Err(SqlError::Type(format!("Value {} is out of range for {}", value, self)));
        }
        Ok(Value::Int(n as i64))
    }

    fn float(&self, value: &Value) -> SqlResult<f64> {
        match value {
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| self.mismatch(value)),
            other => other.as_f64().ok_or_else(|| self.mismatch(other)),
        }
    }

    fn mismatch(&self, value: &Value) -> SqlError {
        SqlError::Type(format!("cannot convert {} '{}' to {}", value.kind(), value, self))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::FixedString(n) => write!(f, "FixedString({})", n),
            DataType::Nullable(inner) => write!(f, "Nullable({})", inner),
            other => {
                let name = match other {
                    DataType::UInt8 => "UInt8",
                    DataType::UInt16 => "UInt16",
                    DataType::UInt32 => "UInt32",
                    DataType::UInt64 => "UInt64",
                    DataType::Int8 => "Int8",
                    DataType::Int16 => "Int16",
                    DataType::Int32 => "Int32",
                    DataType::Int64 => "Int64",
                    DataType::Float32 => "Float32",
                    DataType::Float64 => "Float64",
                    DataType::String => "String",
                    DataType::Bool => "Bool",
                    _ => "Nothing",
                };
                write!(f, "{}", name)
            }
        }
    }
}

/// Inner text of `Name(...)`
fn wrapped<'a>(name: &'a str, wrapper: &str) -> Option<&'a str> {
    name.strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn into_bytes(value: Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.into_bytes(),
        Value::Bytes(b) => b,
        other => other.to_string().into_bytes(),
    }
}

fn text_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(s) => Value::String(s),
        Err(e) => Value::Bytes(e.into_bytes()),
    }
}

/// Append an order-preserving encoding of `value` to `out`
///
/// Byte-wise comparison of two encodings matches [`compare_values`] for
/// values of the same column, with NULL sorting first.
pub fn encode_key(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(0x00),
        Value::Int(i) => {
            out.push(0x02);
            out.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        Value::UInt(u) => {
            // A column never mixes signed and unsigned cells
            out.push(0x02);
            out.extend_from_slice(&u.to_be_bytes());
        }
        Value::Float(f) => {
            out.push(0x03);
            let bits = f.to_bits();
            let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
            out.extend_from_slice(&ordered.to_be_bytes());
        }
        Value::Bool(b) => {
            out.push(0x04);
            out.push(*b as u8);
        }
        Value::String(s) => encode_bytes(s.as_bytes(), out),
        Value::Bytes(b) => encode_bytes(b, out),
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(0x05);
    for &b in bytes {
        if b == 0 {
            out.extend_from_slice(&[0x00, 0xFF]);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&[0x00, 0x00]);
}

/// Order two values; `None` when either side is NULL or they are incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    use Value::*;
    match (a, b) {
        (Null, _) | (_, Null) => None,
        (Int(x), Int(y)) => Some(x.cmp(y)),
        (UInt(x), UInt(y)) => Some(x.cmp(y)),
        (Int(x), UInt(y)) => Some((*x as i128).cmp(&(*y as i128))),
        (UInt(x), Int(y)) => Some((*x as i128).cmp(&(*y as i128))),
        (String(x), String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (Bytes(x), Bytes(y)) => Some(x.cmp(y)),
        (String(x), Bytes(y)) => Some(x.as_bytes().cmp(y.as_slice())),
        (Bytes(x), String(y)) => Some(x.as_slice().cmp(y.as_bytes())),
        (String(_) | Bytes(_), other) if other.as_f64().is_some() => {
            let parsed = a.to_string().trim().parse::<f64>().ok()?;
            parsed.partial_cmp(&other.as_f64()?)
        }
        (_, String(_) | Bytes(_)) if a.as_f64().is_some() => {
            compare_values(b, a).map(std::cmp::Ordering::reverse)
        }
        (x, y) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_parse_type_names() {
        assert_eq!(DataType::parse("UInt32").unwrap(), DataType::UInt32);
        assert_eq!(DataType::parse("FixedString(26)").unwrap(), DataType::FixedString(26));
        assert_eq!(
            DataType::parse("Nullable(String)").unwrap(),
            DataType::Nullable(Box::new(DataType::String))
        );
        assert_eq!(DataType::parse("LowCardinality(String)").unwrap(), DataType::String);
        assert_eq!(DataType::parse("BIGINT").unwrap(), DataType::Int64);
        assert!(DataType::parse("Decimal(10, 2)").is_err());
        assert!(DataType::parse("FixedString(0)").is_err());
        assert_eq!(DataType::parse("Nullable(Int8)").unwrap().to_string(), "Nullable(Int8)");
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(DataType::of_literal(&Value::UInt(1)), DataType::UInt8);
        assert_eq!(DataType::of_literal(&Value::UInt(300)), DataType::UInt16);
        assert_eq!(DataType::of_literal(&Value::Int(-1)), DataType::Int8);
        assert_eq!(DataType::of_literal(&Value::Int(-40_000)), DataType::Int32);
        assert_eq!(DataType::of_literal(&Value::Float(0.5)), DataType::Float64);
        assert_eq!(DataType::of_literal(&Value::String("abc".into())), DataType::String);
        assert_eq!(DataType::of_literal(&Value::Null).to_string(), "Nullable(Nothing)");
    }

    #[test]
    fn test_coerce() {
        assert_eq!(DataType::UInt8.coerce(Value::UInt(200)).unwrap(), Value::UInt(200));
        assert!(DataType::UInt8.coerce(Value::UInt(300)).is_err());
        assert!(DataType::UInt32.coerce(Value::Int(-1)).is_err());
        assert_eq!(DataType::Int16.coerce(Value::UInt(5)).unwrap(), Value::Int(5));
        assert_eq!(DataType::Float64.coerce(Value::UInt(2)).unwrap(), Value::Float(2.0));
        assert_eq!(DataType::UInt64.coerce(Value::Null).unwrap(), Value::UInt(0));
        assert_eq!(
            DataType::Nullable(Box::new(DataType::UInt64)).coerce(Value::Null).unwrap(),
            Value::Null
        );
        assert_eq!(
            DataType::FixedString(4).coerce(Value::String("ab".into())).unwrap(),
            Value::String("ab\0\0".into())
        );
        assert!(DataType::FixedString(2).coerce(Value::String("abc".into())).is_err());
        assert!(DataType::UInt8.coerce(Value::String("x".into())).is_err());
    }

    #[test]
    fn test_key_encoding_preserves_order() {
        let ordered = [
            Value::Null,
            Value::Int(i64::MIN),
            Value::Int(-1),
            Value::Int(0),
            Value::Int(7),
            Value::Int(i64::MAX),
        ];
        let keys: Vec<Vec<u8>> = ordered
            .iter()
            .map(|v| {
                let mut out = Vec::new();
                encode_key(v, &mut out);
                out
            })
            .collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }

        let mut small = Vec::new();
        let mut large = Vec::new();
        encode_key(&Value::UInt(255), &mut small);
        encode_key(&Value::UInt(u64::MAX), &mut large);
        assert!(small < large);

        let mut a = Vec::new();
        let mut b = Vec::new();
        encode_key(&Value::Float(-2.5), &mut a);
        encode_key(&Value::Float(1.0), &mut b);
        assert!(a < b);

        let mut short = Vec::new();
        let mut long = Vec::new();
        encode_key(&Value::String("ab".into()), &mut short);
        encode_key(&Value::String("ab\0".into()), &mut long);
        assert!(short < long);
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&Value::Int(-1), &Value::UInt(1)), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::Float(0.5), &Value::UInt(1)), Some(Ordering::Less));
        assert_eq!(
            compare_values(&Value::String("10".into()), &Value::UInt(9)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_values(&Value::Null, &Value::UInt(1)), None);
    }
}
