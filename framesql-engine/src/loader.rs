use framesql_bridge::{NativeValue, PlaceholderTable};
use framesql_result::{BoxError, Error, Result};
use framesql_schema::{
    SchemaSet, SourceColumn, TableSchema, escape_identifier, frame_columns, quote_identifier,
};
use framesql_types::Frame;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::engine::Engine;

/// How frames are written into an engine.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Substitute placeholders for NULL and rewrite them afterwards, even when the
    /// engine appends NULLs natively. Needs an engine that supports `UPDATE`.
    pub null_placeholders: bool,
    /// Rows per appender flush.
    pub batch_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            null_placeholders: false,
            batch_rows: 8192,
        }
    }
}

/// What a load wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: usize,
    pub rows: usize,
    /// Columns rewritten from placeholders to NULL.
    pub rewritten_columns: usize,
}

/// Columns that received a placeholder during this load.
#[derive(Debug, Default)]
struct PlaceholderRegistry {
    entries: Vec<(String, String, NativeValue)>,
    seen: FxHashSet<(String, String)>,
}

impl PlaceholderRegistry {
    fn record(&mut self, table: &str, column: &str, placeholder: &NativeValue) {
        if self.seen.insert((table.to_string(), column.to_string())) {
            self.entries
                .push((table.to_string(), column.to_string(), placeholder.clone()));
        }
    }

    fn update_statements(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(table, column, placeholder)| {
                let column = quote_identifier(column);
                format!(
                    "UPDATE {} SET {column} = NULL WHERE {column} = {}",
                    escape_identifier(table),
                    placeholder.to_sql_literal()
                )
            })
            .collect()
    }
}

/// Create one table per schema and append every frame's rows to its RefID's table.
///
/// Each row is built in schema column order: a column the frame lacks is NULL, and
/// columns recorded as unknown by the schema builder are not part of the schema so
/// they are skipped. Values are cast to the column's relational type first.
///
/// With placeholders (the engine cannot append NULLs, or `null_placeholders` is set)
/// each NULL is replaced by its type's sentinel from [`PlaceholderTable`] and, once
/// all tables are loaded, one batched execution of `UPDATE ... SET col = NULL WHERE
/// col = <sentinel>` restores the NULLs. Failures are `input_conversion` errors for
/// the table's RefID.
pub fn load_frames(
    engine: &mut dyn Engine,
    schemas: &SchemaSet,
    frames: &[Frame],
    options: &LoadOptions,
) -> Result<LoadReport> {
    let capabilities = engine.capabilities();
    let use_placeholders = !capabilities.null_append || options.null_placeholders;
    if use_placeholders && !capabilities.supports_update {
        return Err(Error::input_conversion(
            engine.name(),
            format!(
                "engine {} cannot rewrite NULL placeholders without UPDATE",
                engine.name()
            ),
        ));
    }

    let batch_rows = options.batch_rows.max(1);
    let mut registry = PlaceholderRegistry::default();
    let mut report = LoadReport::default();

    for table in schemas.tables() {
        let ref_id = table.ref_id.as_str();
        let conversion = |err: BoxError| Error::input_conversion(ref_id, err);

        engine
            .create_table(table)
            .map_err(|err| conversion(err.into()))?;
        let mut appender = engine
            .appender(table)
            .map_err(|err| conversion(err.into()))?;

        let mut pending = 0usize;
        for frame in frames.iter().filter(|frame| frame.ref_id == ref_id) {
            let sources = frame_columns(frame)?;
            let slots = column_slots(table, &sources);
            let rows = frame.row_len().map_err(|err| conversion(err.into()))?;

            for row in 0..rows {
                let mut values = Vec::with_capacity(table.columns.len());
                for (column, slot) in table.columns.iter().zip(&slots) {
                    let value = slot
                        .map(|source| source.value_at(row))
                        .unwrap_or(NativeValue::Null)
                        .cast(column.relational)
                        .map_err(|err| conversion(err.into()))?;
                    if value.is_null() && use_placeholders {
                        let placeholder = PlaceholderTable::standard()
                            .get(column.relational)
                            .ok_or_else(|| {
                                conversion(
                                    format!(
                                        "column '{}' of type {} has NULLs and no placeholder",
                                        column.name, column.relational
                                    )
                                    .into(),
                                )
                            })?;
                        registry.record(ref_id, &column.name, placeholder);
                        values.push(placeholder.clone());
                    } else {
                        values.push(value);
                    }
                }
                appender
                    .append_row(values)
                    .map_err(|err| conversion(err.into()))?;
                report.rows += 1;
                pending += 1;
                if pending == batch_rows {
                    appender.flush().map_err(|err| conversion(err.into()))?;
                    pending = 0;
                }
            }
        }
        appender.close().map_err(|err| conversion(err.into()))?;
        report.tables += 1;
    }

    let updates = registry.update_statements();
    if !updates.is_empty() {
        debug!(
            engine = engine.name(),
            statements = updates.len(),
            "rewriting NULL placeholders"
        );
        engine.execute_batch(&updates.join("; ")).map_err(|err| {
            let table = registry
                .entries
                .first()
                .map(|(table, _, _)| table.clone())
                .unwrap_or_default();
            Error::input_conversion(table, err)
        })?;
        report.rewritten_columns = updates.len();
    }
    Ok(report)
}

/// For each schema column, the frame column that feeds it, if the frame has one.
fn column_slots<'a>(
    table: &TableSchema,
    sources: &'a [SourceColumn<'a>],
) -> Vec<Option<&'a SourceColumn<'a>>> {
    table
        .columns
        .iter()
        .map(|column| sources.iter().find(|source| source.name == column.name))
        .collect()
}
