// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ArrowStream and Parquet decoding

use super::{Column, Decoded};
use crate::error::{Error, Result};
use crate::value::Value;
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Decimal128Array, FixedSizeBinaryArray, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, LargeBinaryArray, LargeStringArray, RecordBatch, StringArray,
    UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_ipc::reader::StreamReader;
use arrow_schema::{DataType, Schema, TimeUnit};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::any::type_name;
use std::io::Cursor;

pub(crate) fn decode_arrow(bytes: &[u8]) -> Result<Decoded> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)
        .map_err(|e| Error::Decode(format!("invalid Arrow stream: {}", e)))?;
    let mut decoded = Decoded {
        columns: columns_of(&reader.schema()),
        rows: Vec::new(),
    };
    for batch in reader {
        let batch = batch.map_err(|e| Error::Decode(format!("invalid Arrow batch: {}", e)))?;
        append_batch(&mut decoded.rows, &batch)?;
    }
    Ok(decoded)
}

pub(crate) fn decode_parquet(bytes: &[u8], batch_size: usize) -> Result<Decoded> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .map_err(|e| Error::Decode(format!("invalid Parquet file: {}", e)))?;
    let mut decoded = Decoded {
        columns: columns_of(builder.schema()),
        rows: Vec::new(),
    };
    let reader = builder
        .with_batch_size(batch_size)
        .build()
        .map_err(|e| Error::Decode(format!("invalid Parquet file: {}", e)))?;
    for batch in reader {
        let batch = batch.map_err(|e| Error::Decode(format!("invalid Parquet row group: {}", e)))?;
        append_batch(&mut decoded.rows, &batch)?;
    }
    Ok(decoded)
}

fn columns_of(schema: &Schema) -> Vec<Column> {
    schema
        .fields()
        .iter()
        .map(|field| {
            let base = engine_type_name(field.data_type());
            let type_name = if field.is_nullable() && !matches!(field.data_type(), DataType::Null) {
                format!("Nullable({})", base)
            } else {
                base
            };
            Column::new(field.name().as_str(), type_name)
        })
        .collect()
}

/// Engine type name for an Arrow type
fn engine_type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Null => "Nullable(Nothing)".to_string(),
        DataType::Boolean => "Bool".to_string(),
        DataType::Int8 => "Int8".to_string(),
        DataType::Int16 => "Int16".to_string(),
        DataType::Int32 => "Int32".to_string(),
        DataType::Int64 => "Int64".to_string(),
        DataType::UInt8 => "UInt8".to_string(),
        DataType::UInt16 => "UInt16".to_string(),
        DataType::UInt32 => "UInt32".to_string(),
        DataType::UInt64 => "UInt64".to_string(),
        DataType::Float32 => "Float32".to_string(),
        DataType::Float64 => "Float64".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary => "String".to_string(),
        DataType::FixedSizeBinary(n) => format!("FixedString({})", n),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            format!("Decimal({}, {})", precision, scale)
        }
        DataType::Date32 => "Date32".to_string(),
        DataType::Date64 => "Date".to_string(),
        DataType::Timestamp(TimeUnit::Second, _) => "DateTime".to_string(),
        DataType::Timestamp(unit, _) => format!("DateTime64({})", fraction_digits(unit)),
        DataType::List(field) | DataType::LargeList(field) | DataType::FixedSizeList(field, _) => {
            format!("Array({})", engine_type_name(field.data_type()))
        }
        DataType::Struct(fields) => {
            let inner: Vec<String> = fields.iter().map(|f| engine_type_name(f.data_type())).collect();
            format!("Tuple({})", inner.join(", "))
        }
        DataType::Map(entries, _) => match entries.data_type() {
            DataType::Struct(kv) if kv.len() == 2 => format!(
                "Map({}, {})",
                engine_type_name(kv[0].data_type()),
                engine_type_name(kv[1].data_type())
            ),
            other => format!("Map({})", other),
        },
        DataType::Dictionary(_, value_type) => format!("LowCardinality({})", engine_type_name(value_type)),
        other => other.to_string(),
    }
}

fn fraction_digits(unit: &TimeUnit) -> usize {
    match unit {
        TimeUnit::Second => 0,
        TimeUnit::Millisecond => 3,
        TimeUnit::Microsecond => 6,
        TimeUnit::Nanosecond => 9,
    }
}

fn append_batch(rows: &mut Vec<Vec<Value>>, batch: &RecordBatch) -> Result<()> {
    let start = rows.len();
    rows.extend((0..batch.num_rows()).map(|_| Vec::with_capacity(batch.num_columns())));
    for column in batch.columns() {
        let column = plain_column(column)?;
        for (row_idx, row) in rows[start..].iter_mut().enumerate() {
            row.push(value_from_array(&column, row_idx)?);
        }
    }
    Ok(())
}

/// Dictionary-encoded columns decoded to their value type
fn plain_column(column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Dictionary(_, value_type) => arrow_cast::cast(column.as_ref(), value_type.as_ref())
            .map_err(|e| Error::Decode(format!("cannot unpack dictionary column: {}", e))),
        _ => Ok(column.clone()),
    }
}

fn value_from_array(array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(downcast_array::<BooleanArray>(array)?.value(row)),
        DataType::Int8 => Value::Int(downcast_array::<Int8Array>(array)?.value(row) as i64),
        DataType::Int16 => Value::Int(downcast_array::<Int16Array>(array)?.value(row) as i64),
        DataType::Int32 => Value::Int(downcast_array::<Int32Array>(array)?.value(row) as i64),
        DataType::Int64 => Value::Int(downcast_array::<Int64Array>(array)?.value(row)),
        DataType::UInt8 => Value::UInt(downcast_array::<UInt8Array>(array)?.value(row) as u64),
        DataType::UInt16 => Value::UInt(downcast_array::<UInt16Array>(array)?.value(row) as u64),
        DataType::UInt32 => Value::UInt(downcast_array::<UInt32Array>(array)?.value(row) as u64),
        DataType::UInt64 => Value::UInt(downcast_array::<UInt64Array>(array)?.value(row)),
        DataType::Float32 => Value::Float(downcast_array::<Float32Array>(array)?.value(row) as f64),
        DataType::Float64 => Value::Float(downcast_array::<Float64Array>(array)?.value(row)),
        DataType::Utf8 => Value::String(downcast_array::<StringArray>(array)?.value(row).to_string()),
        DataType::LargeUtf8 => Value::String(downcast_array::<LargeStringArray>(array)?.value(row).to_string()),
        DataType::Binary => binary_value(downcast_array::<BinaryArray>(array)?.value(row)),
        DataType::LargeBinary => binary_value(downcast_array::<LargeBinaryArray>(array)?.value(row)),
        DataType::FixedSizeBinary(_) => binary_value(downcast_array::<FixedSizeBinaryArray>(array)?.value(row)),
        DataType::Decimal128(_, scale) => {
            Value::String(format_decimal(downcast_array::<Decimal128Array>(array)?.value(row), *scale))
        }
        DataType::Timestamp(unit, _) => {
            let pattern = match unit {
                TimeUnit::Second => "%Y-%m-%d %H:%M:%S",
                TimeUnit::Millisecond => "%Y-%m-%d %H:%M:%S%.3f",
                TimeUnit::Microsecond => "%Y-%m-%d %H:%M:%S%.6f",
                TimeUnit::Nanosecond => "%Y-%m-%d %H:%M:%S%.9f",
            };
            let options = FormatOptions::default()
                .with_timestamp_format(Some(pattern))
                .with_timestamp_tz_format(Some(pattern));
            Value::String(display_value(array, row, &options)?)
        }
        // Dates, wide decimals and nested values travel as their text rendering
        _ => Value::String(display_value(array, row, &FormatOptions::default())?),
    };
    Ok(value)
}

fn display_value(array: &ArrayRef, row: usize, options: &FormatOptions) -> Result<String> {
    let formatter = ArrayFormatter::try_new(array.as_ref(), options)
        .map_err(|e| Error::Decode(format!("cannot render {} value: {}", array.data_type(), e)))?;
    Ok(formatter.value(row).to_string())
}

/// Decimal text with exactly `scale` fraction digits
fn format_decimal(value: i128, scale: i8) -> String {
    if scale <= 0 {
        return value.saturating_mul(10i128.pow(scale.unsigned_abs() as u32)).to_string();
    }
    let divisor = 10i128.pow(scale as u32);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let divisor = divisor as u128;
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / divisor,
        magnitude % divisor,
        width = scale as usize
    )
}

/// Engine strings travel as binary columns; text stays text
fn binary_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::Bytes(bytes.to_vec()),
    }
}

fn downcast_array<T: 'static>(array: &ArrayRef) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Decode(format!(
            "expected {} but found {}",
            type_name::<T>(),
            array.data_type()
        ))
    })
}
