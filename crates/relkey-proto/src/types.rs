//! Column type tags and the storage conversions they select.
//!
//! Every [`TypeTag`] fixes one bind conversion ([`TypeTag::to_raw`], domain
//! value to storage form) and one load conversion ([`TypeTag::from_raw`],
//! storage form to domain value). Dates travel as text in `Y/M/D` form,
//! date-times as `Y/M/D H:m:s`, timestamps as `Y/M/D H:m:s.u`, and exact
//! decimals as their canonical string.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::decimal::ExactDecimal;
use crate::error::Error;
use crate::value::Value;

/// Text layout of a date column.
pub const DATE_FORMAT: &str = "%Y/%m/%d";
/// Text layout of a datetime column.
pub const DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
/// Text layout of a timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// 64-bit signed integer.
    Integer,
    /// UTF-8 string.
    String,
    /// Boolean stored as 0/1.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time, second precision.
    DateTime,
    /// Date and time, microsecond precision.
    Timestamp,
    /// Exact decimal.
    Decimal,
}

/// A value in storage representation, as bound to or fetched from an executor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL.
    Null,
    /// Integer storage class.
    Integer(i64),
    /// Floating point storage class.
    Real(f64),
    /// Text storage class.
    Text(String),
}

impl RawValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("NULL"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Real(r) => write!(f, "{r}"),
            RawValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Real(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Decimal => "decimal",
        };
        f.write_str(name)
    }
}

impl TypeTag {
    /// Bind conversion: domain value to storage form.
    pub fn to_raw(self, value: &Value) -> Result<RawValue, Error> {
        if value.is_null() {
            return Ok(RawValue::Null);
        }
        let reject = || Error::conversion(self, format!("{value:?}"));
        match self {
            TypeTag::Integer => match value {
                Value::Integer(i) => Ok(RawValue::Integer(*i)),
                Value::Boolean(b) => Ok(RawValue::Integer(i64::from(*b))),
                Value::Decimal(d) => d.to_i64().map(RawValue::Integer).ok_or_else(reject),
                Value::String(s) => parse_integer(s).map(RawValue::Integer).ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::String => Ok(RawValue::Text(value.to_string())),
            TypeTag::Boolean => match value {
                Value::Boolean(b) => Ok(RawValue::Integer(i64::from(*b))),
                Value::Integer(i) => Ok(RawValue::Integer(i64::from(*i != 0))),
                Value::Decimal(d) => Ok(RawValue::Integer(i64::from(!d.is_zero()))),
                Value::String(s) => parse_bool(s)
                    .map(|b| RawValue::Integer(i64::from(b)))
                    .ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::Date => {
                let date = match value {
                    Value::Date(d) => Some(*d),
                    Value::DateTime(dt) | Value::Timestamp(dt) => Some(dt.date()),
                    Value::String(s) => parse_date(s),
                    _ => None,
                };
                date.map(|d| RawValue::Text(d.format(DATE_FORMAT).to_string()))
                    .ok_or_else(reject)
            }
            TypeTag::DateTime | TypeTag::Timestamp => {
                let datetime = match value {
                    Value::Date(d) => d.and_hms_opt(0, 0, 0),
                    Value::DateTime(dt) | Value::Timestamp(dt) => Some(*dt),
                    Value::String(s) => parse_datetime(s),
                    _ => None,
                };
                let layout = if self == TypeTag::DateTime {
                    DATETIME_FORMAT
                } else {
                    TIMESTAMP_FORMAT
                };
                datetime
                    .map(|dt| RawValue::Text(dt.format(layout).to_string()))
                    .ok_or_else(reject)
            }
            TypeTag::Decimal => match value {
                Value::Decimal(d) => Ok(RawValue::Text(d.to_string())),
                Value::Integer(i) => Ok(RawValue::Text(i.to_string())),
                Value::String(s) => s
                    .parse::<ExactDecimal>()
                    .map(|d| RawValue::Text(d.to_string()))
                    .map_err(|_| reject()),
                _ => Err(reject()),
            },
        }
    }

    /// Load conversion: storage form to domain value.
    pub fn from_raw(self, raw: &RawValue) -> Result<Value, Error> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let reject = || Error::conversion(self, raw);
        match self {
            TypeTag::Integer => match raw {
                RawValue::Integer(i) => Ok(Value::Integer(*i)),
                RawValue::Real(r) if r.fract() == 0.0 && r.abs() < 9.007_199_254_740_992e15 => {
                    Ok(Value::Integer(*r as i64))
                }
                RawValue::Text(s) => parse_integer(s).map(Value::Integer).ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::String => Ok(Value::String(match raw {
                RawValue::Text(s) => s.clone(),
                RawValue::Integer(i) => i.to_string(),
                RawValue::Real(r) => r.to_string(),
                RawValue::Null => String::new(),
            })),
            TypeTag::Boolean => match raw {
                RawValue::Integer(i) => Ok(Value::Boolean(*i != 0)),
                RawValue::Real(r) => Ok(Value::Boolean(*r != 0.0)),
                RawValue::Text(s) => parse_bool(s).map(Value::Boolean).ok_or_else(reject),
                RawValue::Null => Ok(Value::Null),
            },
            TypeTag::Date => match raw {
                RawValue::Text(s) => parse_date(s).map(Value::Date).ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::DateTime => match raw {
                RawValue::Text(s) => parse_datetime(s).map(Value::DateTime).ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::Timestamp => match raw {
                RawValue::Text(s) => parse_datetime(s).map(Value::Timestamp).ok_or_else(reject),
                _ => Err(reject()),
            },
            TypeTag::Decimal => match raw {
                RawValue::Text(s) => s.parse().map(Value::Decimal).map_err(|_| reject()),
                RawValue::Integer(i) => Ok(Value::Decimal(ExactDecimal::from_i64(*i))),
                RawValue::Real(r) => r
                    .to_string()
                    .parse()
                    .map(Value::Decimal)
                    .map_err(|_| reject()),
                RawValue::Null => Ok(Value::Null),
            },
        }
    }

    /// Run a value through bind then load conversion.
    ///
    /// Normalizes wire forms: `"7"` in an integer column becomes `Integer(7)`.
    pub fn coerce(self, value: &Value) -> Result<Value, Error> {
        self.from_raw(&self.to_raw(value)?)
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<ExactDecimal>().ok()?.to_i64())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Split `text` into its date and optional time part, with `/` separators.
fn split_datetime(text: &str) -> (String, Option<&str>) {
    let text = text.trim();
    match text.split_once([' ', 'T']) {
        Some((date, time)) => (date.replace('-', "/"), Some(time.trim())),
        None => (text.replace('-', "/"), None),
    }
}

/// Parse a `Y/M/D` (or `Y-M-D`) date, ignoring any time part.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let (date, _) = split_datetime(text);
    NaiveDate::parse_from_str(&date, DATE_FORMAT).ok()
}

/// Parse `Y/M/D[ H:m[:s[.u]]]`; a bare date means midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = split_datetime(text);
    let Some(time) = time else {
        return NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .ok()?
            .and_hms_opt(0, 0, 0);
    };
    let joined = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&joined, "%Y/%m/%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&joined, "%Y/%m/%d %H:%M"))
        .ok()
}
