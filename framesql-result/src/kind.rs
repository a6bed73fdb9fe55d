use std::fmt;

/// Stable category of an [`Error`](crate::Error).
///
/// The string form returned by [`ErrorKind::as_str`] is part of the public contract:
/// dashboards and alert rules match on it, so variants may be added but existing strings
/// never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// The statement calls a function the engine does not know.
    FunctionNotFound,
    /// The statement references a table that is not one of the input RefIDs.
    TableNotFound,
    /// The statement references a column that does not exist on the table.
    ColumnNotFound,
    /// The input frames hold more cells than the caller allows.
    InputLimitExceeded,
    /// Two string columns of one input table would share a name.
    DuplicateStringColumns,
    /// The evaluation ran past its deadline.
    Timeout,
    /// The caller cancelled the evaluation.
    Cancel,
    /// An upstream result the statement depends on failed.
    FailedDependency,
    /// Input frames could not be turned into tables.
    InputConversion,
    /// The SQL text is empty or whitespace.
    EmptyQuery,
    /// The SQL text does not parse, or produces a result that cannot be represented.
    InvalidQuery,
    /// The statement uses a syntax node or function outside the allow-list.
    BlockedNodeOrFunc,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::FunctionNotFound,
        ErrorKind::TableNotFound,
        ErrorKind::ColumnNotFound,
        ErrorKind::InputLimitExceeded,
        ErrorKind::DuplicateStringColumns,
        ErrorKind::Timeout,
        ErrorKind::Cancel,
        ErrorKind::FailedDependency,
        ErrorKind::InputConversion,
        ErrorKind::EmptyQuery,
        ErrorKind::InvalidQuery,
        ErrorKind::BlockedNodeOrFunc,
    ];

    /// Stable identifier used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FunctionNotFound => "function_not_found",
            ErrorKind::TableNotFound => "table_not_found",
            ErrorKind::ColumnNotFound => "column_not_found",
            ErrorKind::InputLimitExceeded => "input_limit_exceeded",
            ErrorKind::DuplicateStringColumns => "duplicate_string_columns",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancel => "cancel",
            ErrorKind::FailedDependency => "failed_dependency",
            ErrorKind::InputConversion => "input_conversion",
            ErrorKind::EmptyQuery => "empty_query",
            ErrorKind::InvalidQuery => "invalid_query",
            ErrorKind::BlockedNodeOrFunc => "blocked_node_or_func",
        }
    }

    /// Renders the user-facing message for this kind.
    ///
    /// `token` is the offending table, column, function or node name, when there is one.
    pub(crate) fn render(&self, ref_id: Option<&str>, token: Option<&str>) -> String {
        let prefix = match ref_id {
            Some(ref_id) if !ref_id.is_empty() => format!("sql expression [{ref_id}]"),
            _ => "sql expression".to_string(),
        };
        let quoted = |what: &str| match token {
            Some(token) => format!(" {what} '{token}'"),
            None => format!(" {what}"),
        };
        match self {
            ErrorKind::FunctionNotFound => format!("{prefix}:{} not found", quoted("function")),
            ErrorKind::TableNotFound => format!("{prefix}:{} not found", quoted("table")),
            ErrorKind::ColumnNotFound => format!("{prefix}:{} not found", quoted("column")),
            ErrorKind::InputLimitExceeded => match token {
                Some(detail) => format!("{prefix}: input exceeds the cell limit ({detail})"),
                None => format!("{prefix}: input exceeds the cell limit"),
            },
            ErrorKind::DuplicateStringColumns => {
                format!("{prefix}: duplicate string{}", quoted("column"))
            }
            ErrorKind::Timeout => match token {
                Some(limit) => format!("{prefix}: timed out after {limit}"),
                None => format!("{prefix}: timed out"),
            },
            ErrorKind::Cancel => format!("{prefix}: query was cancelled"),
            ErrorKind::FailedDependency => format!("{prefix}:{} failed", quoted("dependency")),
            ErrorKind::InputConversion => match token {
                Some(table) => format!("{prefix}: failed to convert input '{table}' to a table"),
                None => format!("{prefix}: failed to convert input to a table"),
            },
            ErrorKind::EmptyQuery => format!("{prefix}: query is empty"),
            ErrorKind::InvalidQuery => match token {
                Some(detail) => format!("{prefix}: invalid query: {detail}"),
                None => format!("{prefix}: invalid query"),
            },
            ErrorKind::BlockedNodeOrFunc => match token {
                Some(token) => format!("{prefix}: '{token}' is not allowed in sql expressions"),
                None => format!("{prefix}: query uses syntax that is not allowed"),
            },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kind_strings_are_unique() {
        let names: HashSet<_> = ErrorKind::ALL.iter().map(ErrorKind::as_str).collect();
        assert_eq!(names.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn render_without_ref_id_or_token() {
        assert_eq!(
            ErrorKind::TableNotFound.render(None, None),
            "sql expression: table not found"
        );
        assert_eq!(
            ErrorKind::BlockedNodeOrFunc.render(Some("B"), Some("load_file")),
            "sql expression [B]: 'load_file' is not allowed in sql expressions"
        );
    }
}
