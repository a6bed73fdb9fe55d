use framesql_bridge::RelationalType;

use crate::builder::TableSchema;
use crate::ident::escape_identifier;

/// How an engine spells table creation.
///
/// The default methods produce `CREATE OR REPLACE TABLE name (col TYPE, ...)` with the
/// generic type names of [`RelationalType::sql_name`]. Engines override
/// [`DdlDialect::type_name`] for their own type vocabulary and
/// [`DdlDialect::create_table`] when they lack `OR REPLACE`.
pub trait DdlDialect {
    fn type_name(&self, ty: RelationalType) -> &'static str {
        ty.sql_name()
    }

    /// `(col TYPE, ...)` with escaped column names.
    fn column_list(&self, table: &TableSchema) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    escape_identifier(&column.name),
                    self.type_name(column.relational)
                )
            })
            .collect();
        format!("({})", columns.join(", "))
    }

    fn create_table(&self, table: &TableSchema) -> String {
        format!(
            "CREATE OR REPLACE TABLE {} {}",
            escape_identifier(&table.ref_id),
            self.column_list(table)
        )
    }
}

/// Generic dialect with the default spellings.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDdl;

impl DdlDialect for GenericDdl {}
