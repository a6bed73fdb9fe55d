use serde::{Deserialize, Serialize};

use crate::Timestamp;
use crate::field_type::FieldType;

macro_rules! field_values {
    ($( $plain:ident, $nullable:ident => $ty:ty; )*) => {
        /// Column storage of a [`Field`](crate::Field).
        ///
        /// The variant determines the field's [`FieldType`]. Nullable variants hold
        /// `Option<T>` per row; [`FieldValues::Unknown`] holds the producer's string
        /// rendering of values it could not type.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "values", rename_all = "camelCase")]
        pub enum FieldValues {
            $(
                $plain(Vec<$ty>),
                $nullable(Vec<Option<$ty>>),
            )*
            Unknown(Vec<Option<String>>),
        }

        impl FieldValues {
            /// Empty storage for `ty` with room for `capacity` rows.
            pub fn with_capacity(ty: FieldType, capacity: usize) -> Self {
                match ty {
                    $(
                        FieldType::$plain => FieldValues::$plain(Vec::with_capacity(capacity)),
                        FieldType::$nullable => FieldValues::$nullable(Vec::with_capacity(capacity)),
                    )*
                    FieldType::Unknown => FieldValues::Unknown(Vec::with_capacity(capacity)),
                }
            }

            pub fn field_type(&self) -> FieldType {
                match self {
                    $(
                        FieldValues::$plain(_) => FieldType::$plain,
                        FieldValues::$nullable(_) => FieldType::$nullable,
                    )*
                    FieldValues::Unknown(_) => FieldType::Unknown,
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(
                        FieldValues::$plain(v) => v.len(),
                        FieldValues::$nullable(v) => v.len(),
                    )*
                    FieldValues::Unknown(v) => v.len(),
                }
            }

            /// Whether row `row` holds NULL. Rows past the end are not NULL.
            pub fn is_null(&self, row: usize) -> bool {
                match self {
                    $(
                        FieldValues::$plain(_) => false,
                        FieldValues::$nullable(v) => matches!(v.get(row), Some(None)),
                    )*
                    FieldValues::Unknown(v) => matches!(v.get(row), Some(None)),
                }
            }

            /// Convert plain storage into its nullable twin, wrapping every value in
            /// `Some`. Nullable storage is returned unchanged.
            pub fn into_nullable(self) -> Self {
                match self {
                    $(
                        FieldValues::$plain(v) => {
                            FieldValues::$nullable(v.into_iter().map(Some).collect())
                        }
                    )*
                    other => other,
                }
            }
        }

        $(
            impl From<Vec<$ty>> for FieldValues {
                fn from(values: Vec<$ty>) -> Self {
                    FieldValues::$plain(values)
                }
            }

            impl From<Vec<Option<$ty>>> for FieldValues {
                fn from(values: Vec<Option<$ty>>) -> Self {
                    FieldValues::$nullable(values)
                }
            }
        )*
    };
}

field_values! {
    Int8, NullableInt8 => i8;
    Int16, NullableInt16 => i16;
    Int32, NullableInt32 => i32;
    Int64, NullableInt64 => i64;
    UInt8, NullableUInt8 => u8;
    UInt16, NullableUInt16 => u16;
    UInt32, NullableUInt32 => u32;
    UInt64, NullableUInt64 => u64;
    Float32, NullableFloat32 => f32;
    Float64, NullableFloat64 => f64;
    Bool, NullableBool => bool;
    String, NullableString => String;
    Time, NullableTime => Timestamp;
    Json, NullableJson => serde_json::Value;
}

impl FieldValues {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<&str>> for FieldValues {
    fn from(values: Vec<&str>) -> Self {
        FieldValues::String(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<Option<&str>>> for FieldValues {
    fn from(values: Vec<Option<&str>>) -> Self {
        FieldValues::NullableString(
            values
                .into_iter()
                .map(|value| value.map(str::to_string))
                .collect(),
        )
    }
}
