use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use framesql_types::Timestamp;

use crate::error::BridgeError;
use crate::relational::RelationalType;

/// A single cell as the embedded engines see it.
///
/// Appenders receive values in the canonical variant of their column's
/// [`RelationalType`] (see [`NativeValue::cast`]); result readers may produce any
/// variant and rely on [`push_native`](crate::push_native) to coerce.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Fixed-point value `value * 10^-scale`.
    Decimal { value: i128, scale: i8 },
    Text(String),
    Timestamp(Timestamp),
    Date(NaiveDate),
    Json(serde_json::Value),
    Blob(Vec<u8>),
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "NULL",
            NativeValue::Bool(_) => "boolean",
            NativeValue::Int8(_) => "int8",
            NativeValue::Int16(_) => "int16",
            NativeValue::Int32(_) => "int32",
            NativeValue::Int64(_) => "int64",
            NativeValue::UInt8(_) => "uint8",
            NativeValue::UInt16(_) => "uint16",
            NativeValue::UInt32(_) => "uint32",
            NativeValue::UInt64(_) => "uint64",
            NativeValue::Float32(_) => "float32",
            NativeValue::Float64(_) => "float64",
            NativeValue::Decimal { .. } => "decimal",
            NativeValue::Text(_) => "text",
            NativeValue::Timestamp(_) => "timestamp",
            NativeValue::Date(_) => "date",
            NativeValue::Json(_) => "json",
            NativeValue::Blob(_) => "blob",
        }
    }

    /// Integer variants widened to `i128`. Other variants return `None`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            NativeValue::Int8(v) => Some(v.into()),
            NativeValue::Int16(v) => Some(v.into()),
            NativeValue::Int32(v) => Some(v.into()),
            NativeValue::Int64(v) => Some(v.into()),
            NativeValue::UInt8(v) => Some(v.into()),
            NativeValue::UInt16(v) => Some(v.into()),
            NativeValue::UInt32(v) => Some(v.into()),
            NativeValue::UInt64(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Any numeric variant as `f64`; decimals are down-cast.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            NativeValue::Float32(v) => Some(v.into()),
            NativeValue::Float64(v) => Some(v),
            NativeValue::Decimal { value, scale } => Some(decimal_to_f64(value, scale)),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    /// Coerce into the canonical variant for a column of type `target`.
    ///
    /// NULL stays NULL. Integers are range-checked, any numeric converts to a float
    /// target, and text is parsed for timestamp and JSON targets.
    pub fn cast(self, target: RelationalType) -> Result<NativeValue, BridgeError> {
        if self.is_null() {
            return Ok(NativeValue::Null);
        }
        let name = target.sql_name();
        let value = match target {
            RelationalType::TinyInt => NativeValue::Int8(self.integer(name)?),
            RelationalType::SmallInt => NativeValue::Int16(self.integer(name)?),
            RelationalType::Integer => NativeValue::Int32(self.integer(name)?),
            RelationalType::BigInt => NativeValue::Int64(self.integer(name)?),
            RelationalType::UTinyInt => NativeValue::UInt8(self.integer(name)?),
            RelationalType::USmallInt => NativeValue::UInt16(self.integer(name)?),
            RelationalType::UInteger => NativeValue::UInt32(self.integer(name)?),
            RelationalType::UBigInt => NativeValue::UInt64(self.integer(name)?),
            RelationalType::Float => match self {
                NativeValue::Float32(v) => NativeValue::Float32(v),
                other => {
                    let v = other.as_f64().ok_or_else(|| BridgeError::mismatch(&other, name))?;
                    NativeValue::Float32(v as f32)
                }
            },
            RelationalType::Double | RelationalType::Decimal => {
                let v = self.as_f64().ok_or_else(|| BridgeError::mismatch(&self, name))?;
                NativeValue::Float64(v)
            }
            RelationalType::Boolean => match self {
                NativeValue::Bool(v) => NativeValue::Bool(v),
                other => match other.as_i128() {
                    Some(v) => NativeValue::Bool(v != 0),
                    None => return Err(BridgeError::mismatch(&other, name)),
                },
            },
            RelationalType::Varchar => match self {
                NativeValue::Text(v) => NativeValue::Text(v),
                NativeValue::Json(v) => NativeValue::Text(v.to_string()),
                other => return Err(BridgeError::mismatch(&other, name)),
            },
            RelationalType::Timestamp => NativeValue::Timestamp(self.timestamp(name)?),
            RelationalType::Date => match self {
                NativeValue::Date(v) => NativeValue::Date(v),
                other => NativeValue::Date(other.timestamp(name)?.date_naive()),
            },
            RelationalType::Json => match self {
                NativeValue::Json(v) => NativeValue::Json(v),
                NativeValue::Text(text) => NativeValue::Json(parse_json(text)?),
                other => return Err(BridgeError::mismatch(&other, name)),
            },
            RelationalType::Blob => match self {
                NativeValue::Blob(v) => NativeValue::Blob(v),
                NativeValue::Text(v) => NativeValue::Blob(v.into_bytes()),
                other => return Err(BridgeError::mismatch(&other, name)),
            },
        };
        Ok(value)
    }

    /// Convert to an integer type, accepting floats with no fractional part.
    pub(crate) fn integer<T>(&self, target: &'static str) -> Result<T, BridgeError>
    where
        T: TryFrom<i128>,
    {
        let wide = match *self {
            NativeValue::Float32(v) if v.fract() == 0.0 => v as i128,
            NativeValue::Float64(v) if v.fract() == 0.0 => v as i128,
            NativeValue::Bool(v) => i128::from(v),
            _ => self
                .as_i128()
                .ok_or_else(|| BridgeError::mismatch(self, target))?,
        };
        T::try_from(wide).map_err(|_| BridgeError::OutOfRange {
            value: wide.to_string(),
            target,
        })
    }

    pub(crate) fn timestamp(&self, target: &'static str) -> Result<Timestamp, BridgeError> {
        match self {
            NativeValue::Timestamp(v) => Ok(*v),
            NativeValue::Date(date) => Ok(midnight_utc(*date)),
            NativeValue::Text(text) => parse_timestamp(text),
            other => Err(BridgeError::mismatch(other, target)),
        }
    }

    /// Render as a SQL literal. Used to match placeholder sentinels in `UPDATE`
    /// statements, so the rendering must equal what text-storing engines persist.
    pub fn to_sql_literal(&self) -> String {
        match self {
            NativeValue::Null => "NULL".to_string(),
            NativeValue::Bool(v) => String::from(if *v { "TRUE" } else { "FALSE" }),
            NativeValue::Int8(v) => v.to_string(),
            NativeValue::Int16(v) => v.to_string(),
            NativeValue::Int32(v) => v.to_string(),
            NativeValue::Int64(v) => v.to_string(),
            NativeValue::UInt8(v) => v.to_string(),
            NativeValue::UInt16(v) => v.to_string(),
            NativeValue::UInt32(v) => v.to_string(),
            NativeValue::UInt64(v) => v.to_string(),
            NativeValue::Float32(v) => format!("{:?}", f64::from(*v)),
            NativeValue::Float64(v) => format!("{v:?}"),
            NativeValue::Decimal { value, scale } => format!("{:?}", decimal_to_f64(*value, *scale)),
            NativeValue::Text(v) => quote_sql_string(v),
            NativeValue::Timestamp(v) => quote_sql_string(&format_timestamp(v)),
            NativeValue::Date(v) => quote_sql_string(&v.format("%Y-%m-%d").to_string()),
            NativeValue::Json(v) => quote_sql_string(&v.to_string()),
            NativeValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }
}

fn decimal_to_f64(value: i128, scale: i8) -> f64 {
    value as f64 / 10f64.powi(i32::from(scale))
}

fn parse_json(text: String) -> Result<serde_json::Value, BridgeError> {
    serde_json::from_str(&text).map_err(|_| BridgeError::Parse {
        text,
        target: "JSON",
    })
}

pub(crate) fn midnight_utc(date: NaiveDate) -> Timestamp {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote_sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Text form used by engines that store timestamps as strings.
///
/// RFC 3339 in UTC with a `Z` suffix and only as many fractional digits as needed.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a timestamp as written by [`format_timestamp`] or by SQL date functions
/// (`YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DD`). Offset-free text is taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<Timestamp, BridgeError> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }
    Err(BridgeError::Parse {
        text: text.to_string(),
        target: "TIMESTAMP",
    })
}
