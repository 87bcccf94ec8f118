// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CSV and TabSeparated decoding

use super::{CellKind, Column, Decoded};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Csv,
    Tsv,
}

/// One raw field; `quoted` fields are never NULL
struct Field {
    text: String,
    quoted: bool,
}

impl Field {
    fn is_null(&self) -> bool {
        !self.quoted && self.text == "\\N"
    }
}

/// Decode a buffer whose first record holds column names and, when
/// `with_types` is set, whose second record holds the engine type names
pub(crate) fn decode(bytes: &[u8], dialect: Dialect, with_types: bool) -> Result<Decoded> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode(format!("result is not UTF-8: {}", e)))?;
    let mut records = match dialect {
        Dialect::Csv => csv_records(text)?,
        Dialect::Tsv => tsv_records(text)?,
    }
    .into_iter();

    let names = records
        .next()
        .ok_or_else(|| Error::Decode("missing header row".to_string()))?;
    let types = if with_types {
        let types = records
            .next()
            .ok_or_else(|| Error::Decode("missing type row".to_string()))?;
        if types.len() != names.len() {
            return Err(Error::Decode(format!(
                "header has {} names but {} types",
                names.len(),
                types.len()
            )));
        }
        types.into_iter().map(|f| f.text).collect()
    } else {
        vec!["String".to_string(); names.len()]
    };

    let columns: Vec<Column> = names
        .into_iter()
        .zip(types)
        .map(|(name, type_name)| Column::new(name.text, type_name))
        .collect();
    let kinds: Vec<CellKind> = columns.iter().map(|c| CellKind::of(&c.type_name)).collect();

    let mut rows = Vec::new();
    for (line, record) in records.enumerate() {
        if record.len() != columns.len() {
            return Err(Error::Decode(format!(
                "row {} has {} fields, expected {}",
                line + 1,
                record.len(),
                columns.len()
            )));
        }
        let row = record
            .iter()
            .zip(&kinds)
            .map(|(field, kind)| {
                if field.is_null() {
                    Ok(Value::Null)
                } else if field.quoted {
                    // Quoted numbers still parse by type; quoted text stays text
                    match kind {
                        CellKind::Text | CellKind::Null => Ok(Value::String(field.text.clone())),
                        kind => kind.parse(&field.text),
                    }
                } else {
                    kind.parse(&field.text)
                }
            })
            .collect::<Result<Vec<Value>>>()?;
        rows.push(row);
    }

    Ok(Decoded { columns, rows })
}

/// Split CSV text into records; quoted fields may span lines and use `""`
fn csv_records(text: &str) -> Result<Vec<Vec<Field>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        let mut field = String::new();
        let mut quoted = false;
        if chars.peek() == Some(&'"') {
            quoted = true;
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err(Error::Decode("unterminated quoted CSV field".to_string())),
                }
            }
        }
        while let Some(&c) = chars.peek() {
            if c == ',' || c == '\n' || c == '\r' {
                break;
            }
            if quoted {
                return Err(Error::Decode(format!("unexpected {:?} after quoted CSV field", c)));
            }
            field.push(c);
            chars.next();
        }
        record.push(Field { text: field, quoted });

        match chars.next() {
            Some(',') => continue,
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                records.push(std::mem::take(&mut record));
            }
            Some('\n') => records.push(std::mem::take(&mut record)),
            Some(c) => return Err(Error::Decode(format!("unexpected {:?} in CSV record", c))),
            None => {
                // A trailing newline leaves one empty unquoted field behind
                let blank = record.len() == 1 && !record[0].quoted && record[0].text.is_empty();
                if !blank {
                    records.push(record);
                }
                break;
            }
        }
    }
    Ok(records)
}

/// Split TabSeparated text into records and unescape every field
fn tsv_records(text: &str) -> Result<Vec<Vec<Field>>> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            line.split('\t').map(tsv_field).collect::<Result<Vec<Field>>>()
        })
        .collect()
}

fn tsv_field(raw: &str) -> Result<Field> {
    if raw == "\\N" {
        return Ok(Field {
            text: raw.to_string(),
            quoted: false,
        });
    }
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('t') => '\t',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some(other) => other,
            None => return Err(Error::Decode("dangling escape in TSV field".to_string())),
        };
        text.push(escaped);
    }
    Ok(Field { text, quoted: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_with_types() {
        let decoded = decode(
            b"\"n\",\"s\",\"f\"\n\"Int64\",\"String\",\"Nullable(Float64)\"\n-1,\"a,\"\"b\"\"\nc\",\\N\n2,\"\\N\",1.5\n",
            Dialect::Csv,
            true,
        )
        .unwrap();
        assert_eq!(decoded.columns[2], Column::new("f", "Nullable(Float64)"));
        assert_eq!(
            decoded.rows,
            vec![
                vec![Value::Int(-1), Value::String("a,\"b\"\nc".into()), Value::Null],
                vec![Value::Int(2), Value::String("\\N".into()), Value::Float(1.5)],
            ]
        );
    }

    #[test]
    fn test_tsv_unescapes() {
        let decoded = decode(
            b"a\tb\nUInt8\tString\n1\tx\\ty\\\\z\n2\t\\N\n",
            Dialect::Tsv,
            true,
        )
        .unwrap();
        assert_eq!(decoded.rows[0][1], Value::String("x\ty\\z".into()));
        assert_eq!(decoded.rows[1], vec![Value::UInt(2), Value::Null]);
    }

    #[test]
    fn test_names_only_keeps_text() {
        let decoded = decode(b"\"x\"\n7\n", Dialect::Csv, false).unwrap();
        assert_eq!(decoded.columns[0].type_name, "String");
        assert_eq!(decoded.rows, vec![vec![Value::String("7".into())]]);
    }

    #[test]
    fn test_malformed_input() {
        assert!(decode(b"\"a\",\"b\"\n\"UInt8\"\n", Dialect::Csv, true).is_err());
        assert!(decode(b"\"a\"\n\"UInt8\"\n1,2\n", Dialect::Csv, true).is_err());
        assert!(decode(b"\"a\"\n\"UInt8\"\nx\n", Dialect::Csv, true).is_err());
        assert!(decode(b"\"a\n", Dialect::Csv, false).is_err());
    }
}
