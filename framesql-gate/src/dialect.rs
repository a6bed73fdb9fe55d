use std::any::TypeId;

use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::{Parser, ParserError};

use framesql_result::{Error, Result};

/// Nesting depth past which parsing gives up.
const RECURSION_LIMIT: usize = 128;

/// The generic grammar plus `FOR SYSTEM_TIME AS OF` on table references.
///
/// It reports itself as [`GenericDialect`] so every generic parsing rule applies,
/// and forwards each method the generic dialect overrides.
#[derive(Debug, Default)]
struct VersionedGenericDialect(GenericDialect);

macro_rules! forward_flags {
    ($($name:ident),* $(,)?) => {
        $(
            fn $name(&self) -> bool {
                self.0.$name()
            }
        )*
    };
}

impl Dialect for VersionedGenericDialect {
    fn dialect(&self) -> TypeId {
        self.0.dialect()
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        self.0.is_delimited_identifier_start(ch)
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        self.0.is_identifier_start(ch)
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.0.is_identifier_part(ch)
    }

    fn supports_timestamp_versioning(&self) -> bool {
        true
    }

    forward_flags! {
        supports_unicode_string_literal, supports_group_by_expr, supports_group_by_with_modifier,
        supports_left_associative_joins_without_parens, supports_connect_by,
        supports_match_recognize, supports_start_transaction_modifier,
        supports_window_function_null_treatment_arg, supports_dictionary_syntax,
        supports_window_clause_named_window_reference, supports_parenthesized_set_variables,
        supports_select_wildcard_except, support_map_literal_syntax, allow_extract_custom,
        allow_extract_single_quotes, supports_create_index_with_clause,
        supports_explain_with_utility_options, supports_limit_comma, supports_from_first_select,
        supports_projection_trailing_commas, supports_asc_desc_in_column_definition,
        supports_try_convert, supports_comment_on, supports_load_extension,
        supports_named_fn_args_with_assignment_operator, supports_struct_literal,
        supports_empty_projections, supports_nested_comments, supports_user_host_grantee,
        supports_string_escape_constant, supports_array_typedef_with_brackets,
        supports_match_against, supports_set_names, supports_comma_separated_set_assignments,
        supports_filter_during_aggregation, supports_select_wildcard_exclude,
    }
}

/// SQL grammar used to parse expressions before they reach an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Generic,
    MySql,
    #[serde(alias = "postgres")]
    PostgreSql,
    Sqlite,
    DuckDb,
}

impl SqlDialect {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlDialect::Generic => "generic",
            SqlDialect::MySql => "mysql",
            SqlDialect::PostgreSql => "postgresql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::DuckDb => "duckdb",
        }
    }

    fn dialect(self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(VersionedGenericDialect::default()),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
            SqlDialect::PostgreSql => Box::new(PostgreSqlDialect {}),
            SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
            SqlDialect::DuckDb => Box::new(DuckDbDialect {}),
        }
    }

    /// Parse `sql` into statements.
    pub fn parse(self, sql: &str) -> std::result::Result<Vec<Statement>, ParserError> {
        let dialect = self.dialect();
        Parser::new(dialect.as_ref())
            .with_recursion_limit(RECURSION_LIMIT)
            .try_with_sql(sql)?
            .parse_statements()
    }

    /// Parse `sql`, which must hold exactly one statement.
    ///
    /// Blank text and text with no statement at all are `empty_query`; parse failures
    /// and statement lists are `invalid_query`.
    pub fn parse_single(self, sql: &str) -> Result<Statement> {
        if sql.trim().is_empty() {
            return Err(Error::empty_query());
        }
        let mut statements = self
            .parse(sql)
            .map_err(|err| Error::invalid_query(err.to_string()).with_source(err))?;
        match statements.len() {
            0 => Err(Error::empty_query()),
            1 => Ok(statements.remove(0)),
            n => Err(Error::invalid_query(format!(
                "expected a single statement, found {n}"
            ))),
        }
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            "mysql" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" => Ok(SqlDialect::PostgreSql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "duckdb" => Ok(SqlDialect::DuckDb),
            other => Err(format!("unknown sql dialect '{other}'")),
        }
    }
}
