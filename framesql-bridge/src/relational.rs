use std::fmt;

use framesql_types::FieldType;

use crate::error::BridgeError;

/// Engine-neutral column type.
///
/// Backends translate these into their own type system (Arrow data types, SQLite
/// declared types) and report result columns back in the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationalType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    UTinyInt,
    USmallInt,
    UInteger,
    UBigInt,
    Float,
    Double,
    /// Fixed-point result column; never produced from frame input.
    Decimal,
    Boolean,
    Varchar,
    Timestamp,
    /// Calendar date result column; never produced from frame input.
    Date,
    Json,
    Blob,
}

impl RelationalType {
    pub const ALL: [RelationalType; 17] = [
        RelationalType::TinyInt,
        RelationalType::SmallInt,
        RelationalType::Integer,
        RelationalType::BigInt,
        RelationalType::UTinyInt,
        RelationalType::USmallInt,
        RelationalType::UInteger,
        RelationalType::UBigInt,
        RelationalType::Float,
        RelationalType::Double,
        RelationalType::Decimal,
        RelationalType::Boolean,
        RelationalType::Varchar,
        RelationalType::Timestamp,
        RelationalType::Date,
        RelationalType::Json,
        RelationalType::Blob,
    ];

    /// Generic SQL spelling, as used in `CREATE TABLE` statements.
    pub fn sql_name(self) -> &'static str {
        match self {
            RelationalType::TinyInt => "TINYINT",
            RelationalType::SmallInt => "SMALLINT",
            RelationalType::Integer => "INTEGER",
            RelationalType::BigInt => "BIGINT",
            RelationalType::UTinyInt => "UTINYINT",
            RelationalType::USmallInt => "USMALLINT",
            RelationalType::UInteger => "UINTEGER",
            RelationalType::UBigInt => "UBIGINT",
            RelationalType::Float => "FLOAT",
            RelationalType::Double => "DOUBLE",
            RelationalType::Decimal => "DECIMAL",
            RelationalType::Boolean => "BOOLEAN",
            RelationalType::Varchar => "VARCHAR",
            RelationalType::Timestamp => "TIMESTAMP",
            RelationalType::Date => "DATE",
            RelationalType::Json => "JSON",
            RelationalType::Blob => "BLOB",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            RelationalType::TinyInt
                | RelationalType::SmallInt
                | RelationalType::Integer
                | RelationalType::BigInt
                | RelationalType::UTinyInt
                | RelationalType::USmallInt
                | RelationalType::UInteger
                | RelationalType::UBigInt
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                RelationalType::Float | RelationalType::Double | RelationalType::Decimal
            )
    }
}

impl fmt::Display for RelationalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Result of mapping a field type to a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub relational: RelationalType,
    /// The field type had no direct counterpart and was stored as text.
    pub fallback: bool,
}

/// Column type that stores values of `field_type`. Nullability is carried separately.
///
/// [`FieldType::Unknown`] falls back to [`RelationalType::Varchar`]; the caller decides
/// how to report the fallback.
pub fn relational_type_for(field_type: FieldType) -> TypeMapping {
    let relational = match field_type {
        FieldType::Int8 | FieldType::NullableInt8 => RelationalType::TinyInt,
        FieldType::Int16 | FieldType::NullableInt16 => RelationalType::SmallInt,
        FieldType::Int32 | FieldType::NullableInt32 => RelationalType::Integer,
        FieldType::Int64 | FieldType::NullableInt64 => RelationalType::BigInt,
        FieldType::UInt8 | FieldType::NullableUInt8 => RelationalType::UTinyInt,
        FieldType::UInt16 | FieldType::NullableUInt16 => RelationalType::USmallInt,
        FieldType::UInt32 | FieldType::NullableUInt32 => RelationalType::UInteger,
        FieldType::UInt64 | FieldType::NullableUInt64 => RelationalType::UBigInt,
        FieldType::Float32 | FieldType::NullableFloat32 => RelationalType::Float,
        FieldType::Float64 | FieldType::NullableFloat64 => RelationalType::Double,
        FieldType::Bool | FieldType::NullableBool => RelationalType::Boolean,
        FieldType::String | FieldType::NullableString => RelationalType::Varchar,
        FieldType::Time | FieldType::NullableTime => RelationalType::Timestamp,
        FieldType::Json | FieldType::NullableJson => RelationalType::Json,
        FieldType::Unknown => {
            return TypeMapping {
                relational: RelationalType::Varchar,
                fallback: true,
            };
        }
    };
    TypeMapping {
        relational,
        fallback: false,
    }
}

/// Frame type of a result column reported by the engine as `relational`.
///
/// Decimals come back as 64-bit floats and dates as times at midnight UTC. Binary
/// columns have no frame representation.
pub fn field_type_for(relational: RelationalType, nullable: bool) -> Result<FieldType, BridgeError> {
    let base = match relational {
        RelationalType::TinyInt => FieldType::Int8,
        RelationalType::SmallInt => FieldType::Int16,
        RelationalType::Integer => FieldType::Int32,
        RelationalType::BigInt => FieldType::Int64,
        RelationalType::UTinyInt => FieldType::UInt8,
        RelationalType::USmallInt => FieldType::UInt16,
        RelationalType::UInteger => FieldType::UInt32,
        RelationalType::UBigInt => FieldType::UInt64,
        RelationalType::Float => FieldType::Float32,
        RelationalType::Double | RelationalType::Decimal => FieldType::Float64,
        RelationalType::Boolean => FieldType::Bool,
        RelationalType::Varchar => FieldType::String,
        RelationalType::Timestamp | RelationalType::Date => FieldType::Time,
        RelationalType::Json => FieldType::Json,
        RelationalType::Blob => {
            return Err(BridgeError::UnsupportedType(relational.to_string()));
        }
    };
    Ok(base.with_nullability(nullable))
}
