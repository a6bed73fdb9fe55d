//! Typed columnar frames.
//!
//! A [`Frame`] is the unit of tabular data exchanged with the query pipeline: a named,
//! ordered list of [`Field`]s of equal length, identified by the RefID of the query that
//! produced it. Every field stores its values in a [`FieldValues`] vector whose variant
//! fixes the field's [`FieldType`]. Each semantic type has a plain and a nullable variant;
//! nullable variants store `Option<T>` per row.

pub mod field;
pub mod field_type;
pub mod frame;
pub mod values;

pub use field::{Field, FieldConfig, Labels};
pub use field_type::FieldType;
pub use frame::{Frame, FrameMeta, Notice, NoticeSeverity, UnequalLengths};
pub use values::FieldValues;

/// Timestamp representation used by `time` fields.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
