use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use allocative::{Allocative, Key, Visitor};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::data_type::DataType;

/// Represents a single data value stored in the database.
///
/// This enum wraps all supported Rust types into a single type that can be
/// passed around the engine. It includes support for SQL `NULL` values.
/// There is no implicit coercion between variants: conversions happen only
/// through [`Value::cast`] and numeric arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// represents an empty or missing value.
    Null,
    /// A 64-bit signed integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for efficient,
    /// thread-safe sharing and cheap cloning.
    Text(Arc<str>),
    /// A boolean value.
    Bool(bool),
    /// A date or timestamp without time zone.
    DateTime(NaiveDateTime),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// An ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the inner integer value if this is a [Value::Int].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    /// Otherwise, returns `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Returns the logical [DataType] corresponding to this value.
    ///
    /// Returns `None` for [Value::Null] and [Value::List], which have no
    /// column type of their own.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Int(_) => Some(DataType::BigInt),
            Self::Float(_) => Some(DataType::Double),
            Self::Text(_) => Some(DataType::Text),
            Self::Bool(_) => Some(DataType::Boolean),
            Self::DateTime(_) => Some(DataType::Timestamp),
            Self::Blob(_) => Some(DataType::Blob),
        }
    }

    /// Truthiness used by WHERE, HAVING, ON and CASE conditions.
    ///
    /// `NULL` and `FALSE` exclude a row; numbers are true when non-zero and
    /// strings when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::DateTime(_) | Self::Blob(_) => true,
        }
    }

    /// Three-valued logic view of the value: `None` stands for unknown.
    pub fn to_logic(&self) -> Option<bool> {
        if self.is_null() {
            None
        } else {
            Some(self.is_truthy())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::DateTime(_) => 4,
            Self::Blob(_) => 5,
            Self::List(_) => 6,
        }
    }

    /// Total ordering over every value, used by ORDER BY, MIN/MAX, grouping and
    /// DISTINCT.
    ///
    /// Values of different kinds order by kind (`NULL` first, then booleans,
    /// numbers, strings, datetimes, blobs and lists). Integers and floats
    /// compare numerically, strings lexicographically and datetimes by instant.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(l), Self::Int(r)) => l.cmp(r),
            (Self::Int(l), Self::Float(r)) => (*l as f64).total_cmp(r),
            (Self::Float(l), Self::Int(r)) => l.total_cmp(&(*r as f64)),
            (Self::Float(l), Self::Float(r)) => l.total_cmp(r),
            (Self::Text(l), Self::Text(r)) => l.cmp(r),
            (Self::Bool(l), Self::Bool(r)) => l.cmp(r),
            (Self::DateTime(l), Self::DateTime(r)) => l.cmp(r),
            (Self::Blob(l), Self::Blob(r)) => l.cmp(r),
            (Self::List(l), Self::List(r)) => {
                for (a, b) in l.iter().zip(r) {
                    let ord = a.total_cmp(b);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                l.len().cmp(&r.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Equality under the total ordering (`1 = 1.0`, `NULL` equals `NULL`).
    pub fn same_as(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }

    /// Converts the value to `data_type`. Conversions that make no sense
    /// (`CAST('abc' AS INTEGER)`) produce `NULL` instead of an error.
    pub fn cast(&self, data_type: DataType, length: Option<u32>) -> Value {
        if self.is_null() {
            return Value::Null;
        }
        match data_type {
            DataType::SmallInt | DataType::Integer | DataType::BigInt => match self {
                Self::Int(i) => Self::Int(*i),
                Self::Float(f) if f.is_finite() => Self::Int(f.trunc() as i64),
                Self::Bool(b) => Self::Int(i64::from(*b)),
                Self::Text(s) => {
                    let s = s.trim();
                    match s.parse::<i64>() {
                        Ok(i) => Self::Int(i),
                        Err(_) => match s.parse::<f64>() {
                            Ok(f) if f.is_finite() => Self::Int(f.trunc() as i64),
                            _ => Self::Null,
                        },
                    }
                }
                _ => Self::Null,
            },
            DataType::Decimal | DataType::Real | DataType::Double => match self {
                Self::Int(i) => Self::Float(*i as f64),
                Self::Float(f) => Self::Float(*f),
                Self::Bool(b) => Self::Float(if *b { 1.0 } else { 0.0 }),
                Self::Text(s) => s.trim().parse::<f64>().map_or(Self::Null, Self::Float),
                _ => Self::Null,
            },
            DataType::Char | DataType::Varchar | DataType::Text => {
                let text = match self {
                    Self::Text(s) => s.to_string(),
                    other => other.to_string(),
                };
                match length {
                    Some(n) => Self::Text(text.chars().take(n as usize).collect::<String>().into()),
                    None => Self::Text(text.into()),
                }
            }
            DataType::Boolean => match self {
                Self::Bool(b) => Self::Bool(*b),
                Self::Int(i) => Self::Bool(*i != 0),
                Self::Float(f) => Self::Bool(*f != 0.0),
                Self::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "1" | "on" => Self::Bool(true),
                    "false" | "f" | "no" | "n" | "0" | "off" => Self::Bool(false),
                    _ => Self::Null,
                },
                _ => Self::Null,
            },
            DataType::Date => match self {
                Self::DateTime(dt) => Self::DateTime(dt.date().and_time(NaiveTime::MIN)),
                Self::Text(s) => parse_datetime(s)
                    .map_or(Self::Null, |dt| Self::DateTime(dt.date().and_time(NaiveTime::MIN))),
                _ => Self::Null,
            },
            DataType::Timestamp => match self {
                Self::DateTime(dt) => Self::DateTime(*dt),
                Self::Text(s) => parse_datetime(s).map_or(Self::Null, Self::DateTime),
                _ => Self::Null,
            },
            DataType::Time => match self {
                Self::DateTime(dt) => Self::Text(dt.time().format("%H:%M:%S").to_string().into()),
                Self::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
                    .map_or(Self::Null, |t| Self::Text(t.format("%H:%M:%S").to_string().into())),
                _ => Self::Null,
            },
            DataType::Blob => match self {
                Self::Blob(bytes) => Self::Blob(bytes.clone()),
                Self::Text(s) => Self::Blob(s.as_bytes().to_vec()),
                _ => Self::Null,
            },
        }
    }
}

/// Parses the textual datetime forms accepted by CAST and typed literals.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Self::DateTime(dt) => {
                if dt.and_utc().timestamp_subsec_nanos() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.6f"))
                }
            }
            Self::Blob(bytes) => {
                f.write_str("X'")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                f.write_str("'")
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl Allocative for Value {
    fn visit<'a, 'b: 'a>(&self, visitor: &'a mut Visitor<'b>) {
        let mut visitor = visitor.enter_self_sized::<Self>();
        match self {
            Self::Text(s) => visitor.visit_simple(Key::new("text"), s.len()),
            Self::Blob(bytes) => visitor.visit_field(Key::new("blob"), bytes),
            Self::List(items) => visitor.visit_field(Key::new("list"), items),
            _ => {}
        }
        visitor.exit();
    }
}
