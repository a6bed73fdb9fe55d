use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::kind::ErrorKind;

/// Boxed cause carried by an [`Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Categorized error returned by every framesql operation.
///
/// An `Error` carries two messages:
///
/// - the **public message**, rendered by `Display`, built from a fixed template for the
///   [`ErrorKind`] and parameterized only by the RefID and the offending token. It never
///   contains driver output and is safe to show to the user who wrote the query.
/// - the **internal message**, returned by [`Error::internal_message`], which may quote
///   engine or parser diagnostics and belongs in logs and traces.
///
/// The original cause, when there is one, is kept as the error source.
///
/// # Thread Safety
///
/// `Error` is `Send + Sync` so it can cross the blocking-pool boundary used by the
/// SQLite backend.
#[derive(Error, Debug)]
#[error("{public}")]
pub struct Error {
    kind: ErrorKind,
    ref_id: Option<String>,
    token: Option<String>,
    public: String,
    internal: String,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Create an error of `kind` with an internal message and no token.
    pub fn new(kind: ErrorKind, internal: impl Into<String>) -> Self {
        Error {
            kind,
            ref_id: None,
            token: None,
            public: kind.render(None, None),
            internal: internal.into(),
            source: None,
        }
    }

    /// Attach the RefID of the expression being evaluated.
    ///
    /// Errors raised by stateless helpers (the gatekeeper, the type bridge) do not know
    /// which expression they belong to; the evaluator stamps it on at the boundary. An
    /// already present RefID is kept.
    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        if self.ref_id.is_none() {
            self.ref_id = Some(ref_id.into());
            self.rerender();
        }
        self
    }

    /// Attach the offending table, column, function or node name.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.rerender();
        self
    }

    /// Keep `source` as the cause of this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.source = Some(source.into());
        self
    }

    fn rerender(&mut self) {
        self.public = self
            .kind
            .render(self.ref_id.as_deref(), self.token.as_deref());
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    /// The table, column, function or node name the error is about.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Message safe for end users; same text as `Display`.
    pub fn public_message(&self) -> &str {
        &self.public
    }

    /// Diagnostic message for logs. May include engine output.
    pub fn internal_message(&self) -> &str {
        &self.internal
    }

    #[inline]
    pub fn function_not_found(function: impl Into<String>, internal: impl fmt::Display) -> Self {
        Error::new(ErrorKind::FunctionNotFound, internal.to_string()).with_token(function)
    }

    #[inline]
    pub fn table_not_found(table: impl Into<String>) -> Self {
        let table = table.into();
        Error::new(
            ErrorKind::TableNotFound,
            format!("table '{table}' is not an input of this expression"),
        )
        .with_token(table)
    }

    #[inline]
    pub fn column_not_found(column: impl Into<String>, internal: impl fmt::Display) -> Self {
        Error::new(ErrorKind::ColumnNotFound, internal.to_string()).with_token(column)
    }

    /// Input is `cells` in size and the caller allows at most `limit`.
    pub fn input_limit_exceeded(cells: u64, limit: u64) -> Self {
        Error::new(
            ErrorKind::InputLimitExceeded,
            format!("input frames hold {cells} cells, limit is {limit}"),
        )
        .with_token(format!("{cells} > {limit}"))
    }

    #[inline]
    pub fn duplicate_string_columns(column: impl Into<String>, internal: impl fmt::Display) -> Self {
        Error::new(ErrorKind::DuplicateStringColumns, internal.to_string()).with_token(column)
    }

    pub fn timeout(limit: Duration) -> Self {
        Error::new(
            ErrorKind::Timeout,
            format!("evaluation exceeded its deadline of {limit:?}"),
        )
        .with_token(format!("{limit:?}"))
    }

    pub fn cancel() -> Self {
        Error::new(ErrorKind::Cancel, "evaluation cancelled by caller")
    }

    #[inline]
    pub fn failed_dependency(dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        Error::new(
            ErrorKind::FailedDependency,
            format!("upstream result '{dependency}' failed"),
        )
        .with_token(dependency)
    }

    /// Conversion of input `table` failed; the cause is kept as the source.
    pub fn input_conversion<E>(table: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let err = err.into();
        Error::new(ErrorKind::InputConversion, err.to_string())
            .with_token(table)
            .with_source(err)
    }

    pub fn empty_query() -> Self {
        Error::new(ErrorKind::EmptyQuery, "sql text is empty")
    }

    /// A query the engine or parser refused.
    ///
    /// `detail` is rendered in the public message, so callers pass parser diagnostics
    /// about the user's own SQL here, never engine internals.
    #[inline]
    pub fn invalid_query(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Error::new(ErrorKind::InvalidQuery, detail.clone()).with_token(detail)
    }

    #[inline]
    pub fn blocked(token: impl Into<String>, internal: impl fmt::Display) -> Self {
        Error::new(ErrorKind::BlockedNodeOrFunc, internal.to_string()).with_token(token)
    }
}
