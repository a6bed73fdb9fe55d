use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use framesql_bridge::{NativeValue, RelationalType};
use framesql_schema::TableSchema;

use crate::error::EngineResult;

/// Name of the one-row table every engine opens with, so statements such as
/// `SELECT 1 AS one FROM dual` run without an input frame. It has one VARCHAR
/// column `dummy` holding `'X'`. An input frame with this RefID replaces it.
pub const DUAL_TABLE: &str = "dual";

/// What an engine can do beyond the common contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// The bulk-append path accepts NULL cells.
    pub null_append: bool,
    /// `UPDATE` statements can be executed after loading.
    pub supports_update: bool,
}

/// Streaming row sink for one table.
///
/// Rows hold one value per schema column, already cast to the column's
/// [`RelationalType`]. Rows are buffered until [`Appender::flush`]; the table sees
/// them no later than [`Appender::close`].
pub trait Appender: Send {
    fn append_row(&mut self, row: Vec<NativeValue>) -> EngineResult<()>;

    fn flush(&mut self) -> EngineResult<()>;

    fn close(self: Box<Self>) -> EngineResult<()>;
}

/// One output column of a query, with its values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub relational: RelationalType,
    pub nullable: bool,
    pub values: Vec<NativeValue>,
}

/// Column-major query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |column| column.values.len())
    }

    pub fn column(&self, name: &str) -> Option<&ResultColumn> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Stops a running query from another task.
#[derive(Clone)]
pub struct AbortHandle {
    abort: Arc<dyn Fn() + Send + Sync>,
}

impl AbortHandle {
    pub fn new(abort: impl Fn() + Send + Sync + 'static) -> Self {
        AbortHandle {
            abort: Arc::new(abort),
        }
    }

    /// For engines whose queries stop when their future is dropped.
    pub fn noop() -> Self {
        AbortHandle::new(|| {})
    }

    pub fn abort(&self) {
        (self.abort)()
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}

/// An embedded query engine owned by one evaluation.
///
/// Used strictly in order: [`Engine::create_table`] and an [`Appender`] per table,
/// optional [`Engine::execute_batch`] rewrites, one [`Engine::query`], then
/// [`Engine::close`].
#[async_trait]
pub trait Engine: Send {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> EngineCapabilities;

    /// Create (or replace) the table for `table`.
    fn create_table(&mut self, table: &TableSchema) -> EngineResult<()>;

    fn appender(&mut self, table: &TableSchema) -> EngineResult<Box<dyn Appender>>;

    /// Run one or more `;`-separated statements that return no rows.
    fn execute_batch(&mut self, sql: &str) -> EngineResult<()>;

    async fn query(&mut self, sql: &str) -> EngineResult<ResultSet>;

    fn abort_handle(&self) -> AbortHandle;

    fn close(self: Box<Self>) -> EngineResult<()>;
}
