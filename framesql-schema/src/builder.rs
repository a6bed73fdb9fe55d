use std::fmt::Write as _;

use framesql_bridge::{RelationalType, relational_type_for};
use framesql_result::{Error, Result};
use framesql_types::{FieldType, Frame, Notice};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::columns::frame_columns;
use crate::ddl::DdlDialect;
use crate::ident::escape_identifier;

/// One column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub relational: RelationalType,
    pub nullable: bool,
}

/// Relational schema of the table that holds every frame of one RefID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub ref_id: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn create_statement(&self, dialect: &dyn DdlDialect) -> String {
        dialect.create_table(self)
    }

    /// `name(col TYPE, ...)`, the form handed to query assistants.
    pub fn describe(&self) -> String {
        let mut out = escape_identifier(&self.ref_id).into_owned();
        out.push('(');
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{} {}", escape_identifier(&column.name), column.relational);
        }
        out.push(')');
        out
    }
}

/// `(RefID, column)` pairs left out of the schema because no single type fits them.
#[derive(Debug, Clone, Default)]
pub struct UnknownColumns {
    entries: FxHashSet<(String, String)>,
}

impl UnknownColumns {
    pub fn insert(&mut self, ref_id: &str, column: &str) -> bool {
        self.entries.insert((ref_id.to_string(), column.to_string()))
    }

    pub fn contains(&self, ref_id: &str, column: &str) -> bool {
        self.entries
            .contains(&(ref_id.to_string(), column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schemas of every input table plus what the builder had to work around.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    tables: Vec<TableSchema>,
    unknown_columns: UnknownColumns,
    notices: Vec<Notice>,
}

impl SchemaSet {
    /// Tables in order of their RefID's first appearance.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table(&self, ref_id: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|table| table.ref_id == ref_id)
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        self.table(ref_id).is_some()
    }

    pub fn unknown_columns(&self) -> &UnknownColumns {
        &self.unknown_columns
    }

    /// Warnings for the output frame: type fallbacks, widened and dropped columns.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn create_statements(&self, dialect: &dyn DdlDialect) -> Vec<String> {
        self.tables
            .iter()
            .map(|table| table.create_statement(dialect))
            .collect()
    }

    /// One [`TableSchema::describe`] line per table.
    pub fn describe(&self) -> String {
        self.tables
            .iter()
            .map(TableSchema::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug)]
struct ColumnState {
    name: String,
    field_type: FieldType,
    /// Number of frames of the RefID that carry the column.
    frames: usize,
    conflict: bool,
}

#[derive(Debug, Default)]
struct TableState {
    ref_id: String,
    frames: usize,
    columns: Vec<ColumnState>,
    index: FxHashMap<String, usize>,
}

/// Derive one table schema per RefID from `frames`.
///
/// Frames sharing a RefID are unioned: a column keeps the position where it was first
/// seen. A column absent from some frames is nullable. When frames disagree on a
/// column's type:
///
/// - differing only in nullability, the column is nullable;
/// - both numeric, the column is widened to `float64` and a notice is recorded;
/// - otherwise the column is recorded in [`UnknownColumns`], left out of the
///   schema, and a notice is recorded.
///
/// Fields of unknown type are stored as `VARCHAR` with a notice.
pub fn build_schema(frames: &[Frame]) -> Result<SchemaSet> {
    let mut states: Vec<TableState> = Vec::new();
    let mut by_ref: FxHashMap<&str, usize> = FxHashMap::default();
    let mut notices = Vec::new();

    for frame in frames {
        if frame.ref_id.is_empty() {
            return Err(Error::input_conversion(
                frame.name.as_str(),
                format!("frame '{}' has no RefID", frame.name),
            ));
        }
        frame
            .row_len()
            .map_err(|err| Error::input_conversion(frame.ref_id.as_str(), err))?;
        let columns = frame_columns(frame)?;

        let slot = *by_ref.entry(frame.ref_id.as_str()).or_insert_with(|| {
            states.push(TableState {
                ref_id: frame.ref_id.clone(),
                ..TableState::default()
            });
            states.len() - 1
        });
        let state = &mut states[slot];
        state.frames += 1;

        for column in columns {
            let incoming = column.field_type();
            match state.index.get(column.name) {
                None => {
                    state.index.insert(column.name.to_string(), state.columns.len());
                    state.columns.push(ColumnState {
                        name: column.name.to_string(),
                        field_type: incoming,
                        frames: 1,
                        conflict: false,
                    });
                }
                Some(&idx) => {
                    let existing = &mut state.columns[idx];
                    existing.frames += 1;
                    if existing.conflict {
                        continue;
                    }
                    match merge_types(existing.field_type, incoming) {
                        Merge::Same(merged) => existing.field_type = merged,
                        Merge::Widened(merged) => {
                            let text = format!(
                                "column '{}' of '{}' has types {} and {}; widened to {}",
                                existing.name, state.ref_id, existing.field_type, incoming, merged
                            );
                            warn!(ref_id = %state.ref_id, column = %existing.name, "{text}");
                            notices.push(Notice::warning(text));
                            existing.field_type = merged;
                        }
                        Merge::Conflict => {
                            let text = format!(
                                "column '{}' of '{}' has incompatible types {} and {}; it is not loaded",
                                existing.name, state.ref_id, existing.field_type, incoming
                            );
                            warn!(ref_id = %state.ref_id, column = %existing.name, "{text}");
                            notices.push(Notice::warning(text));
                            existing.conflict = true;
                        }
                    }
                }
            }
        }
    }

    let mut unknown_columns = UnknownColumns::default();
    let mut tables = Vec::with_capacity(states.len());
    for state in states {
        let mut columns = Vec::with_capacity(state.columns.len());
        for column in state.columns {
            if column.conflict {
                unknown_columns.insert(&state.ref_id, &column.name);
                continue;
            }
            let mapping = relational_type_for(column.field_type);
            if mapping.fallback {
                let text = format!(
                    "column '{}' of '{}' has type {}; stored as {}",
                    column.name, state.ref_id, column.field_type, mapping.relational
                );
                warn!(ref_id = %state.ref_id, column = %column.name, "{text}");
                notices.push(Notice::warning(text));
            }
            columns.push(ColumnSchema {
                nullable: column.field_type.is_nullable() || column.frames < state.frames,
                relational: mapping.relational,
                name: column.name,
            });
        }
        tables.push(TableSchema {
            ref_id: state.ref_id,
            columns,
        });
    }

    Ok(SchemaSet {
        tables,
        unknown_columns,
        notices,
    })
}

enum Merge {
    Same(FieldType),
    Widened(FieldType),
    Conflict,
}

fn merge_types(existing: FieldType, incoming: FieldType) -> Merge {
    let nullable = existing.is_nullable() || incoming.is_nullable();
    if existing.non_nullable() == incoming.non_nullable() {
        return Merge::Same(existing.with_nullability(nullable));
    }
    if existing.is_numeric() && incoming.is_numeric() {
        return Merge::Widened(FieldType::Float64.with_nullability(nullable));
    }
    Merge::Conflict
}
