//! Relational schemas for input frames.
//!
//! [`build_schema`] groups frames by RefID and derives one [`TableSchema`] per RefID:
//! the union of the columns every frame of that RefID contributes, in first-seen
//! order. Frame labels contribute string columns of their own (see [`frame_columns`]).
//! Columns that cannot be given a single type are left out of the schema and listed
//! in [`UnknownColumns`] so the loader skips them.
//!
//! [`DdlDialect`] renders the schemas as `CREATE TABLE` statements for engines that
//! load through SQL.

pub mod builder;
pub mod columns;
pub mod ddl;
pub mod ident;

pub use builder::{ColumnSchema, SchemaSet, TableSchema, UnknownColumns, build_schema};
pub use columns::{ColumnSource, SourceColumn, frame_columns};
pub use ddl::{DdlDialect, GenericDdl};
pub use ident::{escape_identifier, needs_quoting, quote_identifier};
