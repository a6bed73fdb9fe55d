use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeSeverity {
    Info,
    Warning,
}

/// Message attached to a frame for the user, e.g. a column that was downgraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Notice {
            severity: NoticeSeverity::Warning,
            text: text.into(),
        }
    }
}

/// Execution metadata of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    /// The query text that produced this frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

/// Fields of a frame do not all have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnequalLengths {
    pub field: String,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for UnequalLengths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' has {} rows, expected {}",
            self.field, self.found, self.expected
        )
    }
}

impl std::error::Error for UnequalLengths {}

/// A named, ordered collection of equal-length fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub name: String,
    /// RefID of the query that produced the frame.
    #[serde(default, rename = "refId")]
    pub ref_id: String,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Frame {
            name: name.into(),
            ..Frame::default()
        }
    }

    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = ref_id.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Number of rows, or the first field whose length disagrees with the first field.
    pub fn row_len(&self) -> Result<usize, UnequalLengths> {
        let Some(first) = self.fields.first() else {
            return Ok(0);
        };
        let expected = first.len();
        match self.fields.iter().find(|field| field.len() != expected) {
            Some(field) => Err(UnequalLengths {
                field: field.name.clone(),
                expected,
                found: field.len(),
            }),
            None => Ok(expected),
        }
    }

    /// Rows times fields. Uses the first field's length as the row count.
    pub fn cell_count(&self) -> u64 {
        let rows = self.fields.first().map_or(0, Field::len) as u64;
        rows.saturating_mul(self.fields.len() as u64)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn meta_mut(&mut self) -> &mut FrameMeta {
        self.meta.get_or_insert_with(FrameMeta::default)
    }

    pub fn executed_query_string(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.executed_query_string.as_deref())
    }
}
