//! Value and row types for wsbench-rdbc
//!
//! Covers the column types the benchmark schema uses (customer, address,
//! phone, test suite and call tables): integers, booleans, text, dates,
//! timestamps and UUIDs.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{DriverError, DriverResult};

/// A column value, either bound as a statement parameter or read from a
/// cursor row.
///
/// Timestamps of benchmark calls travel as `Int64` nanoseconds, customer
/// and suite identifiers as `Uuid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL in any column
    Null,
    /// `ok` flag of a call
    Bool(bool),
    /// Small codes such as the phone type
    Int16(i16),
    /// Counters such as a suite's thread count
    Int32(i32),
    /// Sequence numbers and nanosecond timestamps
    Int64(i64),
    /// Floating point measures
    Float64(f64),
    /// Names, addresses, descriptions
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Calendar date, e.g. a birth date
    Date(NaiveDate),
    /// Local timestamp
    DateTime(NaiveDateTime),
    /// Row identifier
    Uuid(Uuid),
}

impl Value {
    /// `true` for [`Value::Null`]
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Column type name used in conversion error messages
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int16(_) => "SMALLINT",
            Self::Int32(_) => "INTEGER",
            Self::Int64(_) => "BIGINT",
            Self::Float64(_) => "DOUBLE PRECISION",
            Self::String(_) => "VARCHAR",
            Self::Bytes(_) => "BYTEA",
            Self::Date(_) => "DATE",
            Self::DateTime(_) => "TIMESTAMP",
            Self::Uuid(_) => "UUID",
        }
    }

    /// Booleans, or integers read as `!= 0`
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            Self::Int16(_) | Self::Int32(_) | Self::Int64(_) => self.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    /// Any integer column widened to `i64`; numeric text is parsed
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(n) => Some((*n).into()),
            Self::Int32(n) => Some((*n).into()),
            Self::Int64(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Narrowed to `i16`, `None` when out of range
    pub fn as_i16(&self) -> Option<i16> {
        self.as_i64()?.try_into().ok()
    }

    /// Narrowed to `i32`, `None` when out of range
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64()?.try_into().ok()
    }

    /// Float or integer column as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// Borrowed text
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Date, the date part of a timestamp, or `YYYY-MM-DD` text
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            Self::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// UUID column or its text form
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

/// `None` binds as NULL
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Conversion of one column value into a Rust type, used to read
/// single-column results
pub trait FromValue: Sized {
    /// Convert `value`, or fail with a type conversion error
    fn from_value(value: &Value) -> DriverResult<Self>;
}

fn unreadable(value: &Value, wanted: &str) -> DriverError {
    DriverError::type_conversion(format!("{} cannot be read as {}", value.sql_type(), wanted))
}

macro_rules! from_value {
    ($($ty:ty => $accessor:ident as $wanted:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> DriverResult<Self> {
                    value.$accessor().ok_or_else(|| unreadable(value, $wanted))
                }
            }
        )*
    };
}

from_value! {
    bool => as_bool as "BOOLEAN",
    i16 => as_i16 as "SMALLINT",
    i32 => as_i32 as "INTEGER",
    i64 => as_i64 as "BIGINT",
    f64 => as_f64 as "DOUBLE PRECISION",
    NaiveDate => as_date as "DATE",
    Uuid => as_uuid as "UUID",
}

impl FromValue for String {
    fn from_value(value: &Value) -> DriverResult<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| unreadable(value, "VARCHAR"))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> DriverResult<Self> {
        Ok(value.clone())
    }
}

/// NULL reads as `None`
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

/// Cursor row as ordered column values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Row with `columns[i]` naming `values[i]`
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len(), "one value per column");
        Self { columns, values }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` for a row without columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in select order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in select order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at 0-based `idx`
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of the column named `name`, ignoring ASCII case
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))?;
        self.get(idx)
    }

    /// Column name to value
    pub fn into_map(self) -> HashMap<String, Value> {
        let Self { columns, values } = self;
        columns.into_iter().zip(values).collect()
    }

    /// Value at `idx`, or a type conversion error if the column is missing
    pub fn try_get(&self, idx: usize) -> DriverResult<&Value> {
        self.get(idx).ok_or_else(|| {
            DriverError::type_conversion(format!(
                "column index {} out of range ({} columns)",
                idx,
                self.len()
            ))
        })
    }

    /// Non-null string at `idx`
    pub fn try_string(&self, idx: usize) -> DriverResult<String> {
        self.try_opt_string(idx)?
            .ok_or_else(|| self.conversion_error(idx, "VARCHAR"))
    }

    /// Nullable string at `idx`
    pub fn try_opt_string(&self, idx: usize) -> DriverResult<Option<String>> {
        match self.try_get(idx)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.conversion_error(idx, "VARCHAR")),
        }
    }

    /// Non-null i16 at `idx`
    pub fn try_i16(&self, idx: usize) -> DriverResult<i16> {
        self.try_get(idx)?
            .as_i16()
            .ok_or_else(|| self.conversion_error(idx, "SMALLINT"))
    }

    /// Non-null i64 at `idx`
    pub fn try_i64(&self, idx: usize) -> DriverResult<i64> {
        self.try_get(idx)?
            .as_i64()
            .ok_or_else(|| self.conversion_error(idx, "BIGINT"))
    }

    /// Nullable date at `idx`
    pub fn try_opt_date(&self, idx: usize) -> DriverResult<Option<NaiveDate>> {
        match self.try_get(idx)? {
            Value::Null => Ok(None),
            v => v
                .as_date()
                .map(Some)
                .ok_or_else(|| self.conversion_error(idx, "DATE")),
        }
    }

    /// Non-null UUID at `idx`
    pub fn try_uuid(&self, idx: usize) -> DriverResult<Uuid> {
        self.try_get(idx)?
            .as_uuid()
            .ok_or_else(|| self.conversion_error(idx, "UUID"))
    }

    fn conversion_error(&self, idx: usize, wanted: &str) -> DriverError {
        let column = self.columns.get(idx).map(String::as_str).unwrap_or("?");
        let found = self.values.get(idx).map(Value::sql_type).unwrap_or("?");
        DriverError::type_conversion(format!(
            "column {} ({}) holds {}, expected {}",
            idx, column, found, wanted
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int16(0).as_bool(), Some(false));
        assert_eq!(Value::String("yes".into()).as_bool(), None);
        assert_eq!(Value::String(" 17 ".into()).as_i64(), Some(17));
        assert_eq!(Value::Int64(70_000).as_i16(), None);
        assert_eq!(Value::Int32(3).as_f64(), Some(3.0));
        assert_eq!(
            Value::String("1815-12-10".into()).as_date(),
            NaiveDate::from_ymd_opt(1815, 12, 10)
        );
    }

    #[test]
    fn test_option_binds_null() {
        assert_eq!(Value::from(Some(4_i16)), Value::Int16(4));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(None::<NaiveDate>).sql_type(), "NULL");
    }

    #[test]
    fn test_phone_row_access() {
        let row = Row::new(
            vec!["PHONE_TYPE".into(), "NUMBER".into()],
            vec![Value::Int16(2), Value::from("+33 6 00 00 00 00")],
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.try_i16(0).unwrap(), 2);
        assert_eq!(row.get_by_name("number"), row.get(1));
        assert_eq!(row.try_string(1).unwrap(), "+33 6 00 00 00 00");
        assert_eq!(row.try_opt_string(0).unwrap_err().category, ErrorCategory::TypeConversion);
    }

    #[test]
    fn test_row_typed_access_errors() {
        let row = Row::new(vec!["id".into()], vec![Value::String("nope".into())]);

        let err = row.try_uuid(0).unwrap_err();
        assert_eq!(err.category, ErrorCategory::TypeConversion);
        assert!(err.message.contains("expected UUID"));

        let err = row.try_get(3).unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_from_value() {
        assert_eq!(i64::from_value(&Value::Int16(7)).unwrap(), 7);
        assert_eq!(Option::<String>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(&Value::from("Ada")).unwrap().as_deref(),
            Some("Ada")
        );

        let err = Uuid::from_value(&Value::Int32(1)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::TypeConversion);
        assert_eq!(err.message, "INTEGER cannot be read as UUID");
    }
}
