use framesql_bridge::{NativeValue, native_value_at};
use framesql_result::{Error, Result};
use framesql_types::{Field, FieldType, Frame};

/// Where the values of a table column come from.
#[derive(Debug, Clone, Copy)]
pub enum ColumnSource<'a> {
    Field(&'a Field),
    /// A field label; every row carries the same value.
    Label { value: &'a str },
}

/// One table column contributed by a frame.
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn<'a> {
    pub name: &'a str,
    pub source: ColumnSource<'a>,
}

impl SourceColumn<'_> {
    pub fn field_type(&self) -> FieldType {
        match self.source {
            ColumnSource::Field(field) => field.field_type(),
            ColumnSource::Label { .. } => FieldType::String,
        }
    }

    pub fn value_at(&self, row: usize) -> NativeValue {
        match self.source {
            ColumnSource::Field(field) => native_value_at(&field.values, row),
            ColumnSource::Label { value } => NativeValue::Text(value.to_string()),
        }
    }
}

/// The columns `frame` contributes to its RefID's table: its fields in order, then one
/// string column per distinct label key in order of first appearance.
///
/// A label key that matches a field name, or that carries different values on two
/// fields of the frame, cannot become a column and fails with
/// `duplicate_string_columns`.
pub fn frame_columns(frame: &Frame) -> Result<Vec<SourceColumn<'_>>> {
    let mut columns: Vec<SourceColumn<'_>> = frame
        .fields
        .iter()
        .map(|field| SourceColumn {
            name: field.name.as_str(),
            source: ColumnSource::Field(field),
        })
        .collect();
    let field_count = columns.len();

    for field in &frame.fields {
        for (key, value) in &field.labels {
            if frame.fields.iter().any(|f| f.name == *key) {
                return Err(Error::duplicate_string_columns(
                    key.as_str(),
                    format!(
                        "label '{key}' on field '{}' of frame '{}' collides with a field of the same name",
                        field.name, frame.name
                    ),
                )
                .with_ref_id(frame.ref_id.as_str()));
            }
            let existing = columns[field_count..]
                .iter()
                .find(|c| c.name == key)
                .map(|c| c.source);
            match existing {
                Some(ColumnSource::Label { value: existing }) if existing != value.as_str() => {
                    return Err(Error::duplicate_string_columns(
                        key.as_str(),
                        format!(
                            "label '{key}' has values '{existing}' and '{value}' within frame '{}'",
                            frame.name
                        ),
                    )
                    .with_ref_id(frame.ref_id.as_str()));
                }
                Some(_) => {}
                None => columns.push(SourceColumn {
                    name: key.as_str(),
                    source: ColumnSource::Label {
                        value: value.as_str(),
                    },
                }),
            }
        }
    }
    Ok(columns)
}
