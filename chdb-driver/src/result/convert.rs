// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Conversions from decoded cells into scan destinations

use crate::value::Value;

/// Conversion from a decoded cell
///
/// Errors are plain messages; the cursor wraps them into
/// [`Error::Scan`](crate::Error::Scan) together with the column name.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

/// A scan destination
///
/// Every [`FromValue`] type is a destination, so `&mut i64`, `&mut String`,
/// `&mut Option<u32>` and friends can be passed to `scan` directly.
pub trait ScanTarget {
    fn assign(&mut self, value: &Value) -> Result<(), String>;
}

impl<T: FromValue> ScanTarget for T {
    fn assign(&mut self, value: &Value) -> Result<(), String> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

fn null_into(target: &str) -> String {
    format!("cannot scan NULL into {}", target)
}

fn out_of_range(value: &Value, target: &str) -> String {
    format!("value {} out of range for {}", value, target)
}

fn text_of(value: &Value) -> Option<Result<&str, String>> {
    match value {
        Value::String(s) => Some(Ok(s.as_str())),
        Value::Bytes(b) => Some(std::str::from_utf8(b).map_err(|e| e.to_string())),
        _ => None,
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, String> {
                let target = stringify!($t);
                match value {
                    Value::Null => Err(null_into(target)),
                    Value::Int(i) => <$t>::try_from(*i).map_err(|_| out_of_range(value, target)),
                    Value::UInt(u) => <$t>::try_from(*u).map_err(|_| out_of_range(value, target)),
                    Value::Bool(b) => Ok(<$t>::from(*b as u8)),
                    Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                        <$t>::try_from(*f as i128).map_err(|_| out_of_range(value, target))
                    }
                    Value::Float(_) => Err(format!("cannot convert {} to {} without loss", value, target)),
                    Value::String(_) | Value::Bytes(_) => {
                        let text = text_of(value).unwrap_or(Ok(""))?;
                        text.trim()
                            .parse::<$t>()
                            .map_err(|_| format!("cannot parse {:?} as {}", text, target))
                    }
                }
            }
        }
    )*};
}

int_from_value!(i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for i8 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let wide = i16::from_value(value)?;
        i8::try_from(wide).map_err(|_| out_of_range(value, "i8"))
    }
}

macro_rules! float_from_value {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, String> {
                let target = stringify!($t);
                match value {
                    Value::Null => Err(null_into(target)),
                    Value::Int(i) => Ok(*i as $t),
                    Value::UInt(u) => Ok(*u as $t),
                    Value::Float(f) => Ok(*f as $t),
                    Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                    Value::String(_) | Value::Bytes(_) => {
                        let text = text_of(value).unwrap_or(Ok(""))?;
                        text.trim()
                            .parse::<$t>()
                            .map_err(|_| format!("cannot parse {:?} as {}", text, target))
                    }
                }
            }
        }
    )*};
}

float_from_value!(f32, f64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(null_into("bool")),
            Value::Bool(b) => Ok(*b),
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            Value::String(_) | Value::Bytes(_) => {
                let text = text_of(value).unwrap_or(Ok(""))?;
                match text.trim().to_lowercase().as_str() {
                    "true" | "1" => Ok(true),
                    "false" | "0" => Ok(false),
                    _ => Err(format!("cannot parse {:?} as bool", text)),
                }
            }
            other => Err(format!("cannot convert {} to bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(null_into("String")),
            Value::String(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(null_into("bytes")),
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => Ok(s.clone().into_bytes()),
            other => Ok(other.to_string().into_bytes()),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i64::from_value(&Value::UInt(3)).unwrap(), 3);
        assert_eq!(u32::from_value(&Value::String(" 42 ".into())).unwrap(), 42);
        assert_eq!(i8::from_value(&Value::Int(-5)).unwrap(), -5);
        assert!(u8::from_value(&Value::Int(-1)).is_err());
        assert!(u8::from_value(&Value::UInt(256)).is_err());
        assert!(i32::from_value(&Value::String("abc".into())).is_err());
        assert!(i32::from_value(&Value::Float(1.5)).is_err());
        assert_eq!(i32::from_value(&Value::Float(2.0)).unwrap(), 2);
        assert!(i64::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_text_and_option_conversions() {
        assert_eq!(String::from_value(&Value::UInt(7)).unwrap(), "7");
        assert_eq!(String::from_value(&Value::Bytes(b"abc".to_vec())).unwrap(), "abc");
        assert_eq!(Option::<u8>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<u8>::from_value(&Value::UInt(1)).unwrap(), Some(1));
        assert!(bool::from_value(&Value::String("true".into())).unwrap());
        assert_eq!(f64::from_value(&Value::Int(-2)).unwrap(), -2.0);
    }

    #[test]
    fn test_scan_target_assigns() {
        let mut target = 0u64;
        target.assign(&Value::UInt(9)).unwrap();
        assert_eq!(target, 9);
        assert!(target.assign(&Value::String("x".into())).is_err());
        assert_eq!(target, 9);
    }
}
