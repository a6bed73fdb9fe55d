use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use framesql_bridge::BridgeError;
use framesql_result::{Error, ErrorKind};
use thiserror::Error;

/// Failure inside an engine backend, before categorization.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Result column whose engine type has no relational counterpart.
    #[error("result column '{column}' has unsupported type {ty}")]
    UnsupportedColumn { column: String, ty: String },

    /// The backend cannot perform this operation.
    #[error("{engine} does not support {operation}")]
    Unsupported {
        engine: &'static str,
        operation: &'static str,
    },

    #[error("statement is not read-only")]
    NotReadOnly,

    #[error("query was interrupted")]
    Interrupted,

    #[error("engine task failed: {0}")]
    Task(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Sort this error into the public taxonomy.
    ///
    /// Driver messages are matched for missing tables, columns and functions; the
    /// offending name becomes the error token. Anything else is an `invalid_query`
    /// whose public message carries no driver output.
    pub fn categorize(self) -> Error {
        if matches!(self, EngineError::Interrupted) {
            return Error::cancel().with_source(self);
        }
        let message = self.to_string();
        let (kind, token) = classify_message(&message);
        let error = Error::new(kind, message);
        let error = match token {
            Some(token) => error.with_token(token),
            None => error,
        };
        error.with_source(self)
    }
}

/// Kind and offending name for a driver message.
fn classify_message(message: &str) -> (ErrorKind, Option<String>) {
    let lower = message.to_ascii_lowercase();

    // DataFusion planning errors.
    if lower.contains("table '") && lower.contains("' not found") {
        let table = quoted_after(message, "table '").map(|name| last_part(&name));
        return (ErrorKind::TableNotFound, table);
    }
    if let Some(idx) = lower.find("no field named ") {
        let column = word_at(&message[idx + "no field named ".len()..]);
        return (ErrorKind::ColumnNotFound, column);
    }
    if lower.contains("invalid function '") {
        return (ErrorKind::FunctionNotFound, quoted_after(message, "function '"));
    }

    // SQLite prepare errors.
    for (marker, kind) in [
        ("no such table: ", ErrorKind::TableNotFound),
        ("no such column: ", ErrorKind::ColumnNotFound),
        ("no such function: ", ErrorKind::FunctionNotFound),
    ] {
        if let Some(idx) = lower.find(marker) {
            let name = word_at(&message[idx + marker.len()..]);
            let name = match kind {
                ErrorKind::TableNotFound => name.map(|n| last_part(&n)),
                _ => name,
            };
            return (kind, name);
        }
    }
    (ErrorKind::InvalidQuery, None)
}

/// Text between `prefix` (which ends with an opening quote) and the next `'`.
fn quoted_after(message: &str, prefix: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    let start = lower.find(&prefix.to_ascii_lowercase())? + prefix.len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

/// Leading name of `text`, without surrounding quotes or trailing punctuation.
fn word_at(text: &str) -> Option<String> {
    let word = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()?
        .trim_end_matches('.')
        .trim_matches(|c| c == '"' || c == '\'' || c == '`');
    (!word.is_empty()).then(|| word.to_string())
}

/// `datafusion.public.cpu` -> `cpu`.
fn last_part(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}
