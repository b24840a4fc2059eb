// used for timestamps held by cells
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
// used to print out readable forms of a data type
use std::fmt;

use crate::error::{RepoError, Result};

// ------------- Value kinds -------------
/// The semantic type a key is created with. It never changes for the lifetime of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Bool,
    Json,
    TimestampUtc,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Bool,
        ValueKind::Json,
        ValueKind::TimestampUtc,
    ];
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::String => "String",
            ValueKind::Bool => "Bool",
            ValueKind::Json => "Json",
            ValueKind::TimestampUtc => "TimestampUtc",
        }
    }
}
impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Stored scalars -------------
/// A value as it is held inside a cell, always of the cell's own kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedScalar {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Json(String),
    Timestamp(DateTime<Utc>),
}

impl TypedScalar {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedScalar::Integer(_) => ValueKind::Integer,
            TypedScalar::Float(_) => ValueKind::Float,
            TypedScalar::Str(_) => ValueKind::String,
            TypedScalar::Bool(_) => ValueKind::Bool,
            TypedScalar::Json(_) => ValueKind::Json,
            TypedScalar::Timestamp(_) => ValueKind::TimestampUtc,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedScalar::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedScalar::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedScalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
    /// Text of a `String` or `Json` scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedScalar::Str(s) | TypedScalar::Json(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            TypedScalar::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Canonical text form, used when a key is read for display.
impl fmt::Display for TypedScalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypedScalar::Integer(i) => write!(f, "{}", i),
            TypedScalar::Float(x) => write!(f, "{}", x),
            TypedScalar::Str(s) | TypedScalar::Json(s) => write!(f, "{}", s),
            TypedScalar::Bool(b) => write!(f, "{}", b),
            TypedScalar::Timestamp(t) => write!(f, "{}", render_timestamp(t)),
        }
    }
}

// ------------- Incoming values -------------
/// Anything a caller may hand to a write. The cell decides how (and whether) it
/// becomes a [`TypedScalar`] of its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    // A JSON scalar behaves exactly like the plain value it holds, only
    // arrays and objects remain JSON.
    fn unwrap_json_scalar(self) -> Value {
        match self {
            Value::Json(serde_json::Value::Null) => Value::Null,
            Value::Json(serde_json::Value::Bool(b)) => Value::Bool(b),
            Value::Json(serde_json::Value::String(s)) => Value::Text(s),
            Value::Json(serde_json::Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    // without arbitrary precision every number is representable as f64
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => other,
        }
    }
    fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => format!("bool {}", b),
            Value::Int(i) => format!("integer {}", i),
            Value::UInt(u) => format!("unsigned integer {}", u),
            Value::Float(x) => format!("float {}", x),
            Value::Text(s) => format!("string {:?}", s),
            Value::Timestamp(t) => format!("timestamp {}", t.to_rfc3339()),
            Value::Json(j) => format!("json {}", j),
        }
    }
}

/// The `to_string`-style rendering used when a value is stored as text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", render_timestamp(&t.with_timezone(&Utc))),
            Value::Json(serde_json::Value::String(s)) => write!(f, "{}", s),
            Value::Json(j) => write!(f, "{}", j),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )*
    };
}
value_from!(Int, i64: i8, i16, i32, i64, u8, u16, u32);
value_from!(UInt, u64: u64);
value_from!(Float, f64: f32, f64);
value_from!(Bool, bool: bool);
value_from!(Text, String: String, &str, &String);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}
impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}
impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Timestamp(v.fixed_offset())
    }
}
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc().fixed_offset())
    }
}
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}
impl From<TypedScalar> for Value {
    fn from(v: TypedScalar) -> Self {
        match v {
            TypedScalar::Integer(i) => Value::Int(i),
            TypedScalar::Float(x) => Value::Float(x),
            TypedScalar::Str(s) | TypedScalar::Json(s) => Value::Text(s),
            TypedScalar::Bool(b) => Value::Bool(b),
            TypedScalar::Timestamp(t) => Value::Timestamp(t.fixed_offset()),
        }
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ------------- Coercion -------------
/// Turns an incoming value into a scalar of `kind`.
///
/// With `enforce` set only native values and exact parses are accepted; without it a
/// generic conversion is attempted as a last resort. `Null` always clears the cell.
/// Unsigned values above `i64::MAX` and unparsable integer strings fail either way.
pub fn coerce(kind: ValueKind, enforce: bool, value: Value) -> Result<Option<TypedScalar>> {
    let value = match kind {
        ValueKind::Json => value,
        _ => value.unwrap_json_scalar(),
    };
    if value.is_null() {
        return Ok(None);
    }
    let scalar = match kind {
        ValueKind::Integer => coerce_integer(enforce, value)?,
        ValueKind::Float => coerce_float(enforce, value)?,
        ValueKind::Bool => coerce_bool(enforce, value)?,
        ValueKind::String => match value {
            Value::Text(s) => TypedScalar::Str(s),
            other if !enforce => TypedScalar::Str(other.to_string()),
            other => return Err(enforcement(kind, &other)),
        },
        ValueKind::Json => match value {
            Value::Text(s) => TypedScalar::Json(s),
            Value::Json(j) => TypedScalar::Json(j.to_string()),
            other if !enforce => TypedScalar::Json(other.to_string()),
            other => return Err(enforcement(kind, &other)),
        },
        ValueKind::TimestampUtc => coerce_timestamp(enforce, value)?,
    };
    Ok(Some(scalar))
}

fn coerce_integer(enforce: bool, value: Value) -> Result<TypedScalar> {
    let kind = ValueKind::Integer;
    let i = match value {
        Value::Int(i) => i,
        Value::UInt(u) => i64::try_from(u).map_err(|_| {
            conversion(kind, &value, "value does not fit into a signed 64-bit integer")
        })?,
        Value::Text(ref s) => match s.trim().parse::<i64>() {
            Ok(i) => i,
            Err(_) if enforce => return Err(enforcement(kind, &value)),
            Err(e) => return Err(conversion(kind, &value, &e.to_string())),
        },
        other if enforce => return Err(enforcement(kind, &other)),
        Value::Bool(b) => i64::from(b),
        Value::Float(x) => {
            let rounded = x.round_ties_even();
            // i64::MAX is not representable as f64, so the upper bound is exclusive
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                return Err(conversion(kind, &value, "value is outside the signed 64-bit range"));
            }
            rounded as i64
        }
        other => return Err(conversion(kind, &other, "no numeric conversion exists")),
    };
    Ok(TypedScalar::Integer(i))
}

fn coerce_float(enforce: bool, value: Value) -> Result<TypedScalar> {
    let kind = ValueKind::Float;
    let x = match value {
        Value::Float(x) => x,
        Value::Int(i) => i as f64,
        Value::UInt(u) => u as f64,
        Value::Text(ref s) => match s.trim().parse::<f64>() {
            Ok(x) => x,
            Err(_) if enforce => return Err(enforcement(kind, &value)),
            Err(e) => return Err(conversion(kind, &value, &e.to_string())),
        },
        other if enforce => return Err(enforcement(kind, &other)),
        Value::Bool(b) => {
            if b {
                1.0
            } else {
                0.0
            }
        }
        other => return Err(conversion(kind, &other, "no numeric conversion exists")),
    };
    Ok(TypedScalar::Float(x))
}

fn coerce_bool(enforce: bool, value: Value) -> Result<TypedScalar> {
    let kind = ValueKind::Bool;
    let b = match value {
        Value::Bool(b) => b,
        Value::Int(i) => i != 0,
        Value::UInt(u) => u != 0,
        Value::Text(ref s) => match parse_bool(s) {
            Some(b) => b,
            None if enforce => return Err(enforcement(kind, &value)),
            None => return Err(conversion(kind, &value, "expected \"true\" or \"false\"")),
        },
        other if enforce => return Err(enforcement(kind, &other)),
        Value::Float(x) => x != 0.0,
        other => return Err(conversion(kind, &other, "no boolean conversion exists")),
    };
    Ok(TypedScalar::Bool(b))
}

fn coerce_timestamp(enforce: bool, value: Value) -> Result<TypedScalar> {
    let kind = ValueKind::TimestampUtc;
    let t = match value {
        Value::Timestamp(t) => t.with_timezone(&Utc),
        Value::Text(ref s) => match parse_timestamp(s) {
            Some(t) => t,
            None if enforce => return Err(enforcement(kind, &value)),
            None => return Err(conversion(kind, &value, "unrecognized date/time format")),
        },
        other if enforce => return Err(enforcement(kind, &other)),
        // numbers are taken as seconds since the Unix epoch
        Value::Int(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| conversion(kind, &value, "seconds out of range"))?,
        Value::Float(secs) if secs.is_finite() => {
            let whole = secs.floor();
            let nanos = (((secs - whole) * 1e9) as u32).min(999_999_999);
            if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
                return Err(conversion(kind, &value, "seconds out of range"));
            }
            DateTime::from_timestamp(whole as i64, nanos)
                .ok_or_else(|| conversion(kind, &value, "seconds out of range"))?
        }
        other => return Err(conversion(kind, &other, "no date/time conversion exists")),
    };
    Ok(TypedScalar::Timestamp(t))
}

fn enforcement(kind: ValueKind, value: &Value) -> RepoError {
    RepoError::TypeEnforcement { kind, given: value.describe() }
}

fn conversion(kind: ValueKind, value: &Value, message: &str) -> RepoError {
    RepoError::Conversion {
        kind,
        given: value.describe(),
        message: message.to_string(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses the date/time shapes accepted by timestamp cells. Strings without an
/// offset are taken to be UTC already.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(t.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

pub fn render_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_behave_like_plain_values() {
        let v = Value::from(serde_json::json!(42)).unwrap_json_scalar();
        assert_eq!(v, Value::Int(42));
        let v = Value::from(serde_json::json!("x")).unwrap_json_scalar();
        assert_eq!(v, Value::Text("x".into()));
        let v = Value::from(serde_json::json!([1])).unwrap_json_scalar();
        assert!(matches!(v, Value::Json(_)));
    }

    #[test]
    fn timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 12:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn canonical_rendering() {
        assert_eq!(TypedScalar::Float(1.0).to_string(), "1");
        assert_eq!(TypedScalar::Float(0.75).to_string(), "0.75");
        assert_eq!(TypedScalar::Bool(true).to_string(), "true");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(TypedScalar::Timestamp(t).to_string(), "2024-05-01T12:30:00Z");
    }
}
