//! Sentinel values that stand in for NULL during bulk loads.
//!
//! Some columnar appenders cannot take an untyped NULL. For those engines the loader
//! writes a type-specific sentinel instead and rewrites it to NULL with an `UPDATE`
//! once the table is loaded. This is a workaround for that engine limitation only:
//! sentinels are chosen at the extremes of each type's domain so that real data is
//! very unlikely to collide, but a frame that genuinely contains the sentinel will see
//! that cell turned into NULL. Engines whose appenders accept NULL never use this
//! table.

use std::sync::LazyLock;

use chrono::DateTime;
use rustc_hash::FxHashMap;

use crate::native::NativeValue;
use crate::relational::RelationalType;

/// Text sentinel. Control characters keep it out of any printable data.
pub const TEXT_SENTINEL: &str = "\u{1}framesql:null\u{1}";

static STANDARD: LazyLock<PlaceholderTable> = LazyLock::new(PlaceholderTable::build);

/// Immutable lookup from column type to its NULL sentinel.
#[derive(Debug)]
pub struct PlaceholderTable {
    sentinels: FxHashMap<RelationalType, NativeValue>,
}

impl PlaceholderTable {
    /// The process-wide table, built on first use.
    pub fn standard() -> &'static PlaceholderTable {
        &STANDARD
    }

    fn build() -> PlaceholderTable {
        let mut sentinels = FxHashMap::default();
        sentinels.insert(RelationalType::TinyInt, NativeValue::Int8(i8::MIN));
        sentinels.insert(RelationalType::SmallInt, NativeValue::Int16(i16::MIN));
        sentinels.insert(RelationalType::Integer, NativeValue::Int32(i32::MIN));
        sentinels.insert(RelationalType::BigInt, NativeValue::Int64(i64::MIN));
        sentinels.insert(RelationalType::UTinyInt, NativeValue::UInt8(u8::MAX));
        sentinels.insert(RelationalType::USmallInt, NativeValue::UInt16(u16::MAX));
        sentinels.insert(RelationalType::UInteger, NativeValue::UInt32(u32::MAX));
        // Largest u64 every backend can store; SQLite integers are signed.
        sentinels.insert(RelationalType::UBigInt, NativeValue::UInt64(i64::MAX as u64));
        sentinels.insert(RelationalType::Float, NativeValue::Float32(f32::MIN));
        sentinels.insert(RelationalType::Double, NativeValue::Float64(f64::MIN));
        sentinels.insert(RelationalType::Decimal, NativeValue::Float64(f64::MIN));
        sentinels.insert(
            RelationalType::Varchar,
            NativeValue::Text(TEXT_SENTINEL.to_string()),
        );
        sentinels.insert(
            RelationalType::Json,
            NativeValue::Json(serde_json::Value::String(TEXT_SENTINEL.to_string())),
        );
        sentinels.insert(
            RelationalType::Blob,
            NativeValue::Blob(TEXT_SENTINEL.as_bytes().to_vec()),
        );
        // 0001-01-01T00:00:00.000000001Z
        if let Some(ts) = DateTime::from_timestamp(-62_135_596_800, 1) {
            sentinels.insert(RelationalType::Timestamp, NativeValue::Timestamp(ts));
            sentinels.insert(RelationalType::Date, NativeValue::Date(ts.date_naive()));
        }
        PlaceholderTable { sentinels }
    }

    /// Sentinel for `ty`. Booleans have none: a two-valued domain leaves no spare value.
    pub fn get(&self, ty: RelationalType) -> Option<&NativeValue> {
        self.sentinels.get(&ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_match_their_column_type() {
        let table = PlaceholderTable::standard();
        for ty in RelationalType::ALL {
            let Some(sentinel) = table.get(ty) else {
                assert_eq!(ty, RelationalType::Boolean);
                continue;
            };
            assert!(!sentinel.is_null());
            if ty != RelationalType::Date {
                assert_eq!(sentinel.clone().cast(ty).unwrap(), *sentinel, "{ty}");
            }
        }
    }

    #[test]
    fn text_sentinel_literal_is_quoted() {
        let literal = PlaceholderTable::standard()
            .get(RelationalType::Varchar)
            .unwrap()
            .to_sql_literal();
        assert_eq!(literal, format!("'{TEXT_SENTINEL}'"));
    }
}
