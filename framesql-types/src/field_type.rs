use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a [`Field`](crate::Field).
///
/// The set is closed. Every type except [`FieldType::Unknown`] has a nullable twin whose
/// values are stored as `Option<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Int8,
    NullableInt8,
    Int16,
    NullableInt16,
    Int32,
    NullableInt32,
    Int64,
    NullableInt64,
    UInt8,
    NullableUInt8,
    UInt16,
    NullableUInt16,
    UInt32,
    NullableUInt32,
    UInt64,
    NullableUInt64,
    Float32,
    NullableFloat32,
    Float64,
    NullableFloat64,
    Bool,
    NullableBool,
    String,
    NullableString,
    Time,
    NullableTime,
    Json,
    NullableJson,
    /// Values the producer could not type. Stored as their string rendering.
    Unknown,
}

impl FieldType {
    pub fn is_nullable(self) -> bool {
        use FieldType::*;
        matches!(
            self,
            NullableInt8
                | NullableInt16
                | NullableInt32
                | NullableInt64
                | NullableUInt8
                | NullableUInt16
                | NullableUInt32
                | NullableUInt64
                | NullableFloat32
                | NullableFloat64
                | NullableBool
                | NullableString
                | NullableTime
                | NullableJson
                | Unknown
        )
    }

    /// The nullable twin of this type. Nullable types map to themselves.
    pub fn nullable(self) -> FieldType {
        use FieldType::*;
        match self {
            Int8 => NullableInt8,
            Int16 => NullableInt16,
            Int32 => NullableInt32,
            Int64 => NullableInt64,
            UInt8 => NullableUInt8,
            UInt16 => NullableUInt16,
            UInt32 => NullableUInt32,
            UInt64 => NullableUInt64,
            Float32 => NullableFloat32,
            Float64 => NullableFloat64,
            Bool => NullableBool,
            String => NullableString,
            Time => NullableTime,
            Json => NullableJson,
            other => other,
        }
    }

    /// The non-nullable base of this type. [`FieldType::Unknown`] maps to itself.
    pub fn non_nullable(self) -> FieldType {
        use FieldType::*;
        match self {
            NullableInt8 => Int8,
            NullableInt16 => Int16,
            NullableInt32 => Int32,
            NullableInt64 => Int64,
            NullableUInt8 => UInt8,
            NullableUInt16 => UInt16,
            NullableUInt32 => UInt32,
            NullableUInt64 => UInt64,
            NullableFloat32 => Float32,
            NullableFloat64 => Float64,
            NullableBool => Bool,
            NullableString => String,
            NullableTime => Time,
            NullableJson => Json,
            other => other,
        }
    }

    /// Return `self` as nullable when `nullable` is set, otherwise its base type.
    pub fn with_nullability(self, nullable: bool) -> FieldType {
        if nullable {
            self.nullable()
        } else {
            self.non_nullable()
        }
    }

    pub fn is_numeric(self) -> bool {
        use FieldType::*;
        matches!(
            self.non_nullable(),
            Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 | Float32 | Float64
        )
    }

    /// Name of the base type, e.g. `int64` for both `Int64` and `NullableInt64`.
    pub fn item_type_name(self) -> &'static str {
        use FieldType::*;
        match self.non_nullable() {
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt32 => "uint32",
            UInt64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
            Bool => "bool",
            String => "string",
            Time => "time",
            Json => "json",
            _ => "unknown",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nullable() && *self != FieldType::Unknown {
            write!(f, "nullable {}", self.item_type_name())
        } else {
            f.write_str(self.item_type_name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_twins_round_trip() {
        for ty in [FieldType::Int8, FieldType::UInt64, FieldType::Time, FieldType::Json] {
            assert!(!ty.is_nullable());
            assert!(ty.nullable().is_nullable());
            assert_eq!(ty.nullable().non_nullable(), ty);
        }
        assert_eq!(FieldType::Unknown.nullable(), FieldType::Unknown);
    }

    #[test]
    fn display_names() {
        assert_eq!(FieldType::NullableFloat64.to_string(), "nullable float64");
        assert_eq!(FieldType::UInt16.to_string(), "uint16");
        assert_eq!(FieldType::Unknown.to_string(), "unknown");
    }
}
