// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result decoding and row cursors
//!
//! The engine hands back one immutable [`ResultBuffer`]. [`Rows::decode`]
//! turns it into column metadata plus decoded cells up front, so every
//! decode problem surfaces at query time; the cursor itself is just an index
//! over the decoded rows.

mod columnar;
mod convert;
mod json;
mod text;

pub use convert::{FromValue, ScanTarget};

use crate::config::{ConnectionConfig, DEFAULT_BUFFER_SIZE};
use crate::engine::{OutputFormat, ResultBuffer};
use crate::error::{Error, Result};
use crate::value::Value;
use std::time::Duration;

const NO_ROW: &str = "no row available";

/// Name and engine type name of a result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Rows per record batch for columnar formats
    pub batch_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl From<&ConnectionConfig> for DecodeOptions {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            batch_size: config.decode_batch_size(),
        }
    }
}

/// Columns and cells produced by a format decoder
#[derive(Debug, Default)]
pub(crate) struct Decoded {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// How a cell of a given engine type is read from text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Int,
    UInt,
    Float,
    Bool,
    Null,
    Text,
}

impl CellKind {
    /// Classify an engine type name; wrappers such as `Nullable(..)` are unwrapped
    pub fn of(type_name: &str) -> Self {
        let mut name = type_name.trim();
        loop {
            let inner = ["Nullable(", "LowCardinality("]
                .iter()
                .find_map(|prefix| name.strip_prefix(prefix))
                .and_then(|rest| rest.strip_suffix(')'));
            match inner {
                Some(inner) => name = inner.trim(),
                None => break,
            }
        }
        match name {
            "UInt8" | "UInt16" | "UInt32" | "UInt64" => CellKind::UInt,
            "Int8" | "Int16" | "Int32" | "Int64" => CellKind::Int,
            "Float32" | "Float64" => CellKind::Float,
            "Bool" | "Boolean" => CellKind::Bool,
            "Nothing" => CellKind::Null,
            _ => CellKind::Text,
        }
    }

    /// Parse the unescaped text of a cell
    pub fn parse(self, text: &str) -> Result<Value> {
        let bad = || Error::Decode(format!("cannot parse {:?} as {:?} cell", text, self));
        match self {
            CellKind::UInt => text.trim().parse().map(Value::UInt).map_err(|_| bad()),
            CellKind::Int => text.trim().parse().map(Value::Int).map_err(|_| bad()),
            CellKind::Float => text.trim().parse().map(Value::Float).map_err(|_| bad()),
            CellKind::Bool => match text.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(bad()),
            },
            CellKind::Null => Ok(Value::Null),
            CellKind::Text => Ok(Value::String(text.to_string())),
        }
    }
}

/// Decode `buffer` into its columns and rows
pub(crate) fn decode_buffer(buffer: &ResultBuffer, options: &DecodeOptions) -> Result<Decoded> {
    if buffer.is_empty() {
        return Ok(Decoded::default());
    }
    let decoded = match buffer.format() {
        OutputFormat::CsvWithNamesAndTypes => text::decode(buffer.buf(), text::Dialect::Csv, true)?,
        OutputFormat::CsvWithNames => text::decode(buffer.buf(), text::Dialect::Csv, false)?,
        OutputFormat::TabSeparatedWithNamesAndTypes => text::decode(buffer.buf(), text::Dialect::Tsv, true)?,
        OutputFormat::TabSeparatedWithNames => text::decode(buffer.buf(), text::Dialect::Tsv, false)?,
        OutputFormat::JsonCompact => json::decode(buffer.buf())?,
        OutputFormat::ArrowStream => columnar::decode_arrow(buffer.buf())?,
        OutputFormat::Parquet => columnar::decode_parquet(buffer.buf(), options.batch_size)?,
        other => {
            return Err(Error::Decode(format!(
                "format {} carries no column metadata and cannot be decoded into rows",
                other
            )))
        }
    };
    log::debug!(
        "Decoded {} buffer: {} columns, {} rows",
        buffer.format(),
        decoded.columns.len(),
        decoded.rows.len()
    );
    Ok(decoded)
}

/// Forward-only cursor over a decoded result
///
/// ```ignore
/// let mut rows = conn.query("SELECT id, name FROM users", params![])?;
/// while rows.next() {
///     let (mut id, mut name) = (0u64, String::new());
///     rows.scan(&mut [&mut id, &mut name])?;
/// }
/// ```
#[derive(Debug)]
pub struct Rows {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    current: Option<usize>,
    exhausted: bool,
    closed: bool,
    elapsed: Duration,
    rows_read: u64,
}

impl Rows {
    /// Decode a complete engine result
    pub fn decode(buffer: ResultBuffer, options: &DecodeOptions) -> Result<Self> {
        let decoded = decode_buffer(&buffer, options)?;
        Ok(Self {
            columns: decoded.columns,
            rows: decoded.rows,
            current: None,
            exhausted: false,
            closed: false,
            elapsed: buffer.elapsed(),
            rows_read: buffer.rows_read(),
        })
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.columns.iter().map(|c| c.name.clone()).collect())
    }

    /// Engine type names, parallel to [`columns`](Self::columns)
    pub fn column_types(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.columns.iter().map(|c| c.type_name.clone()).collect())
    }

    /// Number of decoded rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advance to the next row; false once the rows are exhausted or closed
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.closed || self.exhausted {
            return false;
        }
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.rows.len() {
            self.current = Some(next);
            true
        } else {
            self.current = None;
            self.exhausted = true;
            false
        }
    }

    /// Copy the current row into `dest`, one destination per column
    pub fn scan(&self, dest: &mut [&mut dyn ScanTarget]) -> Result<()> {
        let row = self.current_row()?;
        if dest.len() != self.columns.len() {
            return Err(Error::scan(
                "*",
                format!(
                    "expected {} destination arguments, got {}",
                    self.columns.len(),
                    dest.len()
                ),
            ));
        }
        for ((target, value), column) in dest.iter_mut().zip(row).zip(&self.columns) {
            target
                .assign(value)
                .map_err(|message| Error::scan(column.name.as_str(), message))?;
        }
        Ok(())
    }

    /// Convert one cell of the current row
    pub fn get<T: FromValue>(&self, idx: usize) -> Result<T> {
        let row = self.current_row()?;
        let value = row
            .get(idx)
            .ok_or_else(|| Error::Usage(format!("column index {} out of range", idx)))?;
        T::from_value(value).map_err(|message| Error::scan(self.columns[idx].name.as_str(), message))
    }

    /// Cells of the current row
    pub fn values(&self) -> Result<&[Value]> {
        self.current_row()
    }

    /// Release the decoded data; later calls are no-ops
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.rows = Vec::new();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Engine-side execution time
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Rows the engine read to produce this result
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Usage("rows are closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn current_row(&self) -> Result<&[Value]> {
        self.current
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Usage(NO_ROW.to_string()))
    }
}

/// Result of a single-row query
///
/// The first [`scan`](Row::scan) consumes the row; every later call fails.
#[derive(Debug)]
pub struct Row {
    state: RowState,
}

#[derive(Debug)]
enum RowState {
    Pending(Rows),
    Failed(Error),
    Consumed(Option<Error>),
}

impl Row {
    pub(crate) fn new(result: Result<Rows>) -> Self {
        let state = match result {
            Ok(rows) => RowState::Pending(rows),
            Err(e) => RowState::Failed(e),
        };
        Self { state }
    }

    /// Error raised by the query itself, if any
    pub fn err(&self) -> Option<&Error> {
        match &self.state {
            RowState::Failed(e) => Some(e),
            RowState::Consumed(e) => e.as_ref(),
            RowState::Pending(_) => None,
        }
    }

    /// Scan the first row into `dest` and close the result
    pub fn scan(&mut self, dest: &mut [&mut dyn ScanTarget]) -> Result<()> {
        let state = std::mem::replace(&mut self.state, RowState::Consumed(None));
        match state {
            RowState::Pending(mut rows) => {
                let result = if rows.next() { rows.scan(dest) } else { Err(Error::NoRows) };
                rows.close();
                result
            }
            RowState::Failed(e) => {
                let returned = e.replicate();
                self.state = RowState::Consumed(Some(e));
                Err(returned)
            }
            consumed @ RowState::Consumed(_) => {
                self.state = consumed;
                Err(Error::Usage("row already scanned".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(text: &str) -> ResultBuffer {
        ResultBuffer::new(text.as_bytes().to_vec(), OutputFormat::CsvWithNamesAndTypes)
    }

    fn sample_rows() -> Rows {
        Rows::decode(
            csv("\"id\",\"name\"\n\"UInt32\",\"Nullable(String)\"\n1,\"a\"\n2,\\N\n"),
            &DecodeOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_cursor_walk() {
        let mut rows = sample_rows();
        assert_eq!(rows.columns().unwrap(), vec!["id", "name"]);
        assert_eq!(rows.column_types().unwrap(), vec!["UInt32", "Nullable(String)"]);
        assert!(matches!(rows.values(), Err(Error::Usage(_))));

        let mut id = 0u32;
        let mut name: Option<String> = None;
        assert!(rows.next());
        rows.scan(&mut [&mut id, &mut name]).unwrap();
        assert_eq!((id, name.as_deref()), (1, Some("a")));
        assert!(rows.next());
        rows.scan(&mut [&mut id, &mut name]).unwrap();
        assert_eq!((id, name.as_deref()), (2, None));
        assert!(!rows.next());
        assert!(!rows.next());
        assert!(rows.is_exhausted());
        assert!(matches!(rows.scan(&mut [&mut id, &mut name]), Err(Error::Usage(_))));
    }

    #[test]
    fn test_scan_errors_name_column() {
        let mut rows = sample_rows();
        rows.next();
        let mut id = 0u32;
        assert!(matches!(rows.scan(&mut [&mut id]), Err(Error::Scan { .. })));

        rows.next();
        let mut name = String::new();
        match rows.scan(&mut [&mut id, &mut name]) {
            Err(Error::Scan { column, .. }) => assert_eq!(column, "name"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(rows.get::<u64>(0).unwrap(), 2);
        assert!(rows.get::<u64>(5).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut rows = sample_rows();
        rows.close();
        rows.close();
        assert!(rows.is_closed());
        assert!(!rows.next());
        assert!(matches!(rows.columns(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_empty_buffer_has_no_columns() {
        let mut rows = Rows::decode(csv(""), &DecodeOptions::default()).unwrap();
        assert!(rows.columns().unwrap().is_empty());
        assert!(!rows.next());
    }

    #[test]
    fn test_headerless_formats_are_rejected() {
        let buffer = ResultBuffer::new(b"1\n".to_vec(), OutputFormat::Csv);
        assert!(matches!(
            Rows::decode(buffer, &DecodeOptions::default()),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_row_consumed_once() {
        let mut row = Row::new(Ok(sample_rows()));
        let mut id = 0u64;
        let mut name: Option<String> = None;
        row.scan(&mut [&mut id, &mut name]).unwrap();
        assert_eq!(id, 1);
        assert!(matches!(row.scan(&mut [&mut id, &mut name]), Err(Error::Usage(_))));
        assert!(row.err().is_none());
    }

    #[test]
    fn test_row_without_rows() {
        let empty = Rows::decode(csv("\"x\"\n\"UInt8\"\n"), &DecodeOptions::default()).unwrap();
        let mut row = Row::new(Ok(empty));
        let mut x = 0u8;
        assert!(matches!(row.scan(&mut [&mut x]), Err(Error::NoRows)));
    }

    #[test]
    fn test_row_reports_query_error() {
        let mut row = Row::new(Err(Error::Exec("boom".to_string())));
        assert!(matches!(row.err(), Some(Error::Exec(_))));
        let mut x = 0u8;
        assert!(matches!(row.scan(&mut [&mut x]), Err(Error::Exec(_))));
        assert!(matches!(row.err(), Some(Error::Exec(_))));
        assert!(matches!(row.scan(&mut [&mut x]), Err(Error::Usage(_))));
    }

    #[test]
    fn test_cell_kinds() {
        assert_eq!(CellKind::of("Nullable(UInt64)"), CellKind::UInt);
        assert_eq!(CellKind::of("LowCardinality(Nullable(String))"), CellKind::Text);
        assert_eq!(CellKind::of("Int128"), CellKind::Text);
        assert_eq!(CellKind::of("Nullable(Nothing)"), CellKind::Null);
        assert_eq!(CellKind::Float.parse("inf").unwrap(), Value::Float(f64::INFINITY));
        assert!(CellKind::Int.parse("abc").is_err());
    }

    #[test]
    fn test_decimals_keep_every_digit() {
        assert_eq!(CellKind::of("Nullable(Decimal(38, 2))"), CellKind::Text);
        let text = "12345678901234567.89";
        let buffer = ResultBuffer::new(
            format!("d\nDecimal(38, 2)\n{}\n", text).into_bytes(),
            OutputFormat::TabSeparatedWithNamesAndTypes,
        );
        let mut rows = Rows::decode(buffer, &DecodeOptions::default()).unwrap();
        assert!(rows.next());
        assert_eq!(rows.get::<String>(0).unwrap(), text);
        assert_eq!(rows.get::<f64>(0).unwrap(), 12345678901234567.89);
    }
}
