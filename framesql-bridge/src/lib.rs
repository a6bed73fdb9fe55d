//! Type bridge between frame fields and embedded-engine columns.
//!
//! The bridge is pure: it holds no state beyond the immutable [`PlaceholderTable`] and
//! performs no I/O. It answers three questions:
//!
//! - which engine-neutral [`RelationalType`] stores a given [`FieldType`]
//!   ([`relational_type_for`]) and which field type an engine column comes back as
//!   ([`field_type_for`]);
//! - how one cell of a frame becomes a [`NativeValue`] ready for an engine appender
//!   ([`native_value_at`]);
//! - how a native value read from an engine lands in a frame column ([`push_native`]).
//!
//! [`FieldType`]: framesql_types::FieldType

pub mod convert;
pub mod error;
pub mod native;
pub mod placeholder;
pub mod relational;

pub use convert::{native_value_at, push_native};
pub use error::BridgeError;
pub use native::{NativeValue, format_timestamp, parse_timestamp, quote_sql_string};
pub use placeholder::PlaceholderTable;
pub use relational::{RelationalType, TypeMapping, field_type_for, relational_type_for};
