use framesql_types::{FieldType, FieldValues, Timestamp};

use crate::error::BridgeError;
use crate::native::{NativeValue, format_timestamp, parse_timestamp};

/// The cell at `row` as a bare native value. NULL cells and rows past the end of the
/// column yield [`NativeValue::Null`].
pub fn native_value_at(values: &FieldValues, row: usize) -> NativeValue {
    macro_rules! cell {
        (nullable $vec:expr, $variant:ident) => {
            $vec.get(row)
                .cloned()
                .flatten()
                .map_or(NativeValue::Null, NativeValue::$variant)
        };
        ($vec:expr, $variant:ident) => {
            $vec.get(row).cloned().map_or(NativeValue::Null, NativeValue::$variant)
        };
    }

    match values {
        FieldValues::Int8(v) => cell!(v, Int8),
        FieldValues::NullableInt8(v) => cell!(nullable v, Int8),
        FieldValues::Int16(v) => cell!(v, Int16),
        FieldValues::NullableInt16(v) => cell!(nullable v, Int16),
        FieldValues::Int32(v) => cell!(v, Int32),
        FieldValues::NullableInt32(v) => cell!(nullable v, Int32),
        FieldValues::Int64(v) => cell!(v, Int64),
        FieldValues::NullableInt64(v) => cell!(nullable v, Int64),
        FieldValues::UInt8(v) => cell!(v, UInt8),
        FieldValues::NullableUInt8(v) => cell!(nullable v, UInt8),
        FieldValues::UInt16(v) => cell!(v, UInt16),
        FieldValues::NullableUInt16(v) => cell!(nullable v, UInt16),
        FieldValues::UInt32(v) => cell!(v, UInt32),
        FieldValues::NullableUInt32(v) => cell!(nullable v, UInt32),
        FieldValues::UInt64(v) => cell!(v, UInt64),
        FieldValues::NullableUInt64(v) => cell!(nullable v, UInt64),
        FieldValues::Float32(v) => cell!(v, Float32),
        FieldValues::NullableFloat32(v) => cell!(nullable v, Float32),
        FieldValues::Float64(v) => cell!(v, Float64),
        FieldValues::NullableFloat64(v) => cell!(nullable v, Float64),
        FieldValues::Bool(v) => cell!(v, Bool),
        FieldValues::NullableBool(v) => cell!(nullable v, Bool),
        FieldValues::String(v) => cell!(v, Text),
        FieldValues::NullableString(v) => cell!(nullable v, Text),
        FieldValues::Time(v) => cell!(v, Timestamp),
        FieldValues::NullableTime(v) => cell!(nullable v, Timestamp),
        FieldValues::Json(v) => cell!(v, Json),
        FieldValues::NullableJson(v) => cell!(nullable v, Json),
        FieldValues::Unknown(v) => cell!(nullable v, Text),
    }
}

/// Append `value` to `values`, converting it to the column's frame type.
///
/// NULL becomes `None` in nullable columns and is an error in plain ones.
pub fn push_native(values: &mut FieldValues, value: NativeValue) -> Result<(), BridgeError> {
    let target = values.field_type();
    match values {
        FieldValues::Int8(v) => push_plain(v, value, target),
        FieldValues::NullableInt8(v) => push_nullable(v, value),
        FieldValues::Int16(v) => push_plain(v, value, target),
        FieldValues::NullableInt16(v) => push_nullable(v, value),
        FieldValues::Int32(v) => push_plain(v, value, target),
        FieldValues::NullableInt32(v) => push_nullable(v, value),
        FieldValues::Int64(v) => push_plain(v, value, target),
        FieldValues::NullableInt64(v) => push_nullable(v, value),
        FieldValues::UInt8(v) => push_plain(v, value, target),
        FieldValues::NullableUInt8(v) => push_nullable(v, value),
        FieldValues::UInt16(v) => push_plain(v, value, target),
        FieldValues::NullableUInt16(v) => push_nullable(v, value),
        FieldValues::UInt32(v) => push_plain(v, value, target),
        FieldValues::NullableUInt32(v) => push_nullable(v, value),
        FieldValues::UInt64(v) => push_plain(v, value, target),
        FieldValues::NullableUInt64(v) => push_nullable(v, value),
        FieldValues::Float32(v) => push_plain(v, value, target),
        FieldValues::NullableFloat32(v) => push_nullable(v, value),
        FieldValues::Float64(v) => push_plain(v, value, target),
        FieldValues::NullableFloat64(v) => push_nullable(v, value),
        FieldValues::Bool(v) => push_plain(v, value, target),
        FieldValues::NullableBool(v) => push_nullable(v, value),
        FieldValues::String(v) => push_plain(v, value, target),
        FieldValues::NullableString(v) => push_nullable(v, value),
        FieldValues::Time(v) => push_plain(v, value, target),
        FieldValues::NullableTime(v) => push_nullable(v, value),
        FieldValues::Json(v) => push_plain(v, value, target),
        FieldValues::NullableJson(v) => push_nullable(v, value),
        FieldValues::Unknown(v) => push_nullable(v, value),
    }
}

fn push_plain<T: FromNative>(
    column: &mut Vec<T>,
    value: NativeValue,
    target: FieldType,
) -> Result<(), BridgeError> {
    if value.is_null() {
        return Err(BridgeError::UnexpectedNull { target });
    }
    column.push(T::from_native(value)?);
    Ok(())
}

fn push_nullable<T: FromNative>(
    column: &mut Vec<Option<T>>,
    value: NativeValue,
) -> Result<(), BridgeError> {
    let cell = match value {
        NativeValue::Null => None,
        value => Some(T::from_native(value)?),
    };
    column.push(cell);
    Ok(())
}

/// Conversion from a non-NULL native value into a frame cell.
trait FromNative: Sized {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError>;
}

macro_rules! from_native_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromNative for $ty {
                fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
                    value.integer($name)
                }
            }
        )*
    };
}

from_native_int! {
    i8 => "int8",
    i16 => "int16",
    i32 => "int32",
    i64 => "int64",
    u8 => "uint8",
    u16 => "uint16",
    u32 => "uint32",
    u64 => "uint64",
}

impl FromNative for f64 {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        value
            .as_f64()
            .ok_or_else(|| BridgeError::mismatch(&value, "float64"))
    }
}

impl FromNative for f32 {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        match value {
            NativeValue::Float32(v) => Ok(v),
            other => other
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| BridgeError::mismatch(&other, "float32")),
        }
    }
}

impl FromNative for bool {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        match value {
            NativeValue::Bool(v) => Ok(v),
            other => other
                .as_i128()
                .map(|v| v != 0)
                .ok_or_else(|| BridgeError::mismatch(&other, "bool")),
        }
    }
}

impl FromNative for String {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        match value {
            NativeValue::Text(v) => Ok(v),
            NativeValue::Json(v) => Ok(v.to_string()),
            NativeValue::Timestamp(v) => Ok(format_timestamp(&v)),
            NativeValue::Date(v) => Ok(v.format("%Y-%m-%d").to_string()),
            NativeValue::Blob(bytes) => String::from_utf8(bytes).map_err(|_| BridgeError::Mismatch {
                found: "blob",
                target: "string",
            }),
            other => match other.as_i128() {
                Some(v) => Ok(v.to_string()),
                None => other
                    .as_f64()
                    .map(|v| v.to_string())
                    .ok_or_else(|| BridgeError::mismatch(&other, "string")),
            },
        }
    }
}

impl FromNative for Timestamp {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        match value {
            NativeValue::Text(text) => parse_timestamp(&text),
            other => other.timestamp("time"),
        }
    }
}

impl FromNative for serde_json::Value {
    fn from_native(value: NativeValue) -> Result<Self, BridgeError> {
        match value {
            NativeValue::Json(v) => Ok(v),
            NativeValue::Text(text) => {
                serde_json::from_str(&text).map_err(|_| BridgeError::Parse {
                    text,
                    target: "json",
                })
            }
            other => Err(BridgeError::mismatch(&other, "json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn nullable_cells_unwrap_to_bare_values() {
        let values = FieldValues::from(vec![Some(4_i16), None]);
        assert_eq!(native_value_at(&values, 0), NativeValue::Int16(4));
        assert_eq!(native_value_at(&values, 1), NativeValue::Null);
        assert_eq!(native_value_at(&values, 9), NativeValue::Null);
    }

    #[test]
    fn null_into_plain_column_is_unexpected() {
        let mut values = FieldValues::with_capacity(FieldType::Int32, 1);
        let err = push_native(&mut values, NativeValue::Null).unwrap_err();
        assert!(matches!(err, BridgeError::UnexpectedNull { target: FieldType::Int32 }));
        assert!(err.to_string().starts_with("unexpected type"));
    }

    #[test]
    fn null_into_nullable_column_is_none() {
        let mut values = FieldValues::with_capacity(FieldType::NullableTime, 1);
        push_native(&mut values, NativeValue::Null).unwrap();
        assert_eq!(values, FieldValues::NullableTime(vec![None]));
    }

    #[test]
    fn decimals_land_as_float64() {
        let mut values = FieldValues::with_capacity(FieldType::NullableFloat64, 1);
        push_native(&mut values, NativeValue::Decimal { value: 250, scale: 1 }).unwrap();
        assert_eq!(values, FieldValues::NullableFloat64(vec![Some(25.0)]));
    }

    #[test]
    fn integers_are_narrowed_with_range_checks() {
        let mut values = FieldValues::with_capacity(FieldType::UInt8, 2);
        push_native(&mut values, NativeValue::Int64(200)).unwrap();
        assert!(push_native(&mut values, NativeValue::Int64(256)).is_err());
        assert_eq!(values, FieldValues::UInt8(vec![200]));
    }

    #[test]
    fn text_backed_engines_round_trip_time_and_json() {
        let mut times = FieldValues::with_capacity(FieldType::Time, 2);
        push_native(&mut times, NativeValue::Text("2020-01-02T03:04:05Z".into())).unwrap();
        push_native(
            &mut times,
            NativeValue::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()),
        )
        .unwrap();
        assert_eq!(
            times,
            FieldValues::Time(vec![
                Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            ])
        );

        let mut json = FieldValues::with_capacity(FieldType::NullableJson, 1);
        push_native(&mut json, NativeValue::Text(r#"{"a":1}"#.into())).unwrap();
        assert_eq!(
            json,
            FieldValues::NullableJson(vec![Some(serde_json::json!({"a": 1}))])
        );
    }

    #[test]
    fn booleans_accept_integer_storage() {
        let mut values = FieldValues::with_capacity(FieldType::Bool, 2);
        push_native(&mut values, NativeValue::Int64(1)).unwrap();
        push_native(&mut values, NativeValue::Int64(0)).unwrap();
        assert_eq!(values, FieldValues::Bool(vec![true, false]));
    }
}
