use std::sync::Arc;

use sqlparser::ast::Statement;
use tracing::debug;

use framesql_result::Result;

use crate::allow::check_statement;
use crate::dialect::SqlDialect;
use crate::policy::AllowListPolicy;
use crate::tables::referenced_tables;

/// Parses expressions in one dialect and judges them against one policy.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    policy: Arc<AllowListPolicy>,
    dialect: SqlDialect,
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Gatekeeper::new(AllowListPolicy::standard(), SqlDialect::Generic)
    }
}

impl Gatekeeper {
    pub fn new(policy: Arc<AllowListPolicy>, dialect: SqlDialect) -> Self {
        Gatekeeper { policy, dialect }
    }

    pub fn policy(&self) -> &AllowListPolicy {
        &self.policy
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Parse `sql` into its single statement.
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        self.dialect.parse_single(sql)
    }

    /// Accept `sql` only if it is one read-only query built from allowed nodes and
    /// functions.
    pub fn allow(&self, sql: &str) -> Result<()> {
        let statement = self.parse(sql)?;
        self.allow_statement(&statement)
    }

    pub fn allow_statement(&self, statement: &Statement) -> Result<()> {
        check_statement(statement, &self.policy).inspect_err(|err| {
            debug!(
                token = err.token().unwrap_or_default(),
                reason = err.internal_message(),
                "sql expression blocked"
            );
        })
    }

    /// Names of the tables `sql` reads, sorted and deduplicated.
    pub fn tables(&self, sql: &str) -> Result<Vec<String>> {
        let statement = self.parse(sql)?;
        Ok(referenced_tables(&statement))
    }

    /// Parse once, then check the policy and collect table names side by side.
    ///
    /// A policy violation wins over the table list.
    pub fn check(&self, sql: &str) -> Result<Vec<String>> {
        let statement = self.parse(sql)?;
        let (allowed, tables) = rayon::join(
            || self.allow_statement(&statement),
            || referenced_tables(&statement),
        );
        allowed.map(|()| tables)
    }
}

/// [`Gatekeeper::allow`] with the standard policy and the generic dialect.
pub fn allow_query(sql: &str) -> Result<()> {
    Gatekeeper::default().allow(sql)
}

/// [`Gatekeeper::tables`] with the generic dialect.
pub fn tables_list(sql: &str) -> Result<Vec<String>> {
    Gatekeeper::default().tables(sql)
}
