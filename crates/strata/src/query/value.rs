//! Runtime values for statement parameters and row data.

/// A runtime SQL value.
///
/// Used for statement parameters and for the cells of a [`Row`](super::Row).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL
    Null,

    /// Boolean
    Bool(bool),

    /// 16-bit signed integer (SMALLINT)
    I16(i16),

    /// 32-bit signed integer (INT / INTEGER)
    I32(i32),

    /// 64-bit signed integer (BIGINT)
    I64(i64),

    /// 64-bit float (DOUBLE)
    F64(f64),

    /// Text (VARCHAR, TEXT, LONGTEXT)
    String(String),
}

impl Value {
    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            // MySQL's text protocol hands every cell back as text.
            Value::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }
}

// Convenient From impls
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A value could not be converted into the requested Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {found} into {expected}")]
pub struct ConvertError {
    pub expected: &'static str,
    pub found: String,
}

impl ConvertError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: format!("{found:?}"),
        }
    }
}

/// Conversion from a runtime [`Value`] into a Rust field type.
///
/// Conversions are lenient across integer widths, between integers and
/// booleans (booleans are stored as 1-width integers), and from numeric text.
/// NULL only converts into `Option<T>`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_integer()
            .ok_or_else(|| ConvertError::new("i64", &value))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_integer()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| ConvertError::new("i32", &value))
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_integer()
            .and_then(|v| i16::try_from(v).ok())
            .ok_or_else(|| ConvertError::new("i16", &value))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match &value {
            Value::Bool(v) => Ok(*v),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => other
                .as_integer()
                .map(|v| v != 0)
                .ok_or_else(|| ConvertError::new("bool", &value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match &value {
            Value::F64(v) => Ok(*v),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| ConvertError::new("f64", &value)),
            other => other
                .as_integer()
                .map(|v| v as f64)
                .ok_or_else(|| ConvertError::new("f64", &value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Bool(v) => Ok(v.to_string()),
            Value::I16(v) => Ok(v.to_string()),
            Value::I32(v) => Ok(v.to_string()),
            Value::I64(v) => Ok(v.to_string()),
            Value::F64(v) => Ok(v.to_string()),
            Value::Null => Err(ConvertError::new("String", &Value::Null)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConvertError> {
        Ok(value)
    }
}
