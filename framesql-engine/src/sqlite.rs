//! SQLite backend.
//!
//! Each engine owns an in-memory `rusqlite` connection. Tables are created from the
//! schema with SQLite spellings of the relational types, so result columns that
//! reference a table column report their type through the declared type. Rows are
//! inserted through a cached prepared statement, one transaction per flush.
//! Timestamps are stored as RFC 3339 text and booleans as 0/1.
//!
//! SQLite integers are signed 64-bit, so a `UBIGINT` value above `i64::MAX` cannot
//! be stored and fails the load of its table.
//!
//! Queries run on the blocking pool and are stopped with the connection's
//! interrupt handle.

use std::sync::Arc;

use async_trait::async_trait;
use framesql_bridge::{BridgeError, NativeValue, RelationalType, format_timestamp};
use framesql_schema::{DdlDialect, TableSchema, escape_identifier};
use parking_lot::Mutex;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ErrorCode, params_from_iter};
use tracing::debug;

use crate::engine::{
    AbortHandle, Appender, DUAL_TABLE, Engine, EngineCapabilities, ResultColumn, ResultSet,
};
use crate::error::{EngineError, EngineResult};

const ENGINE_NAME: &str = "sqlite";
const JSON_DECLTYPE: &str = "JSON TEXT";

/// `DROP TABLE IF EXISTS` followed by `CREATE TABLE`; SQLite has no `OR REPLACE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDdl;

impl DdlDialect for SqliteDdl {
    fn type_name(&self, ty: RelationalType) -> &'static str {
        match ty {
            // TEXT affinity keeps documents verbatim.
            RelationalType::Json => JSON_DECLTYPE,
            other => other.sql_name(),
        }
    }

    fn create_table(&self, table: &TableSchema) -> String {
        let name = escape_identifier(&table.ref_id);
        format!(
            "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} {}",
            self.column_list(table)
        )
    }
}

/// Relational type named by a column's declared type.
fn declared_type(decltype: &str) -> Option<RelationalType> {
    let decltype = decltype.trim().to_ascii_uppercase();
    if decltype == JSON_DECLTYPE || decltype == "JSON" {
        return Some(RelationalType::Json);
    }
    RelationalType::ALL
        .into_iter()
        .find(|ty| ty.sql_name() == decltype)
}

pub struct SqliteEngine {
    conn: Arc<Mutex<Connection>>,
    abort: AbortHandle,
}

impl SqliteEngine {
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&format!(
            "CREATE TABLE {DUAL_TABLE} (dummy VARCHAR NOT NULL); \
             INSERT INTO {DUAL_TABLE} VALUES ('X');"
        ))?;
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Ok(SqliteEngine {
            conn: Arc::new(Mutex::new(conn)),
            abort: AbortHandle::new(move || interrupt.interrupt()),
        })
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            null_append: true,
            supports_update: true,
        }
    }

    fn create_table(&mut self, table: &TableSchema) -> EngineResult<()> {
        let ddl = table.create_statement(&SqliteDdl);
        debug!(engine = ENGINE_NAME, table = %table.ref_id, ddl = %ddl, "create table");
        self.conn.lock().execute_batch(&ddl)?;
        Ok(())
    }

    fn appender(&mut self, table: &TableSchema) -> EngineResult<Box<dyn Appender>> {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|column| escape_identifier(&column.name).into_owned())
            .collect();
        let params: Vec<String> = (1..=columns.len()).map(|idx| format!("?{idx}")).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            escape_identifier(&table.ref_id),
            columns.join(", "),
            params.join(", ")
        );
        Ok(Box::new(SqliteAppender {
            conn: Arc::clone(&self.conn),
            table: table.ref_id.clone(),
            insert,
            pending: Vec::new(),
            rows: 0,
        }))
    }

    fn execute_batch(&mut self, sql: &str) -> EngineResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> EngineResult<ResultSet> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || run_query(&conn.lock(), &sql))
            .await
            .map_err(|err| EngineError::Task(err.to_string()))?
    }

    fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        // A query stopped by abort may still hold a reference on the blocking pool;
        // the connection closes when the last one is released.
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => conn
                .into_inner()
                .close()
                .map_err(|(_, err)| EngineError::Sqlite(err)),
            Err(_) => Ok(()),
        }
    }
}

struct SqliteAppender {
    conn: Arc<Mutex<Connection>>,
    table: String,
    insert: String,
    pending: Vec<Vec<NativeValue>>,
    rows: usize,
}

impl Appender for SqliteAppender {
    fn append_row(&mut self, row: Vec<NativeValue>) -> EngineResult<()> {
        if let Some(NativeValue::UInt64(v)) = row
            .iter()
            .find(|value| matches!(value, NativeValue::UInt64(v) if *v > i64::MAX as u64))
        {
            return Err(BridgeError::OutOfRange {
                value: v.to_string(),
                target: "SQLite INTEGER",
            }
            .into());
        }
        self.pending.push(row);
        Ok(())
    }

    fn flush(&mut self) -> EngineResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert)?;
            for row in self.pending.drain(..) {
                stmt.execute(params_from_iter(row.iter().map(SqlParam)))?;
                self.rows += 1;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.flush()?;
        debug!(engine = ENGINE_NAME, table = %self.table, rows = self.rows, "table loaded");
        Ok(())
    }
}

/// Binds a [`NativeValue`] as a statement parameter.
struct SqlParam<'a>(&'a NativeValue);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            NativeValue::Null => Value::Null,
            NativeValue::Bool(v) => Value::Integer(i64::from(*v)),
            NativeValue::Int8(v) => Value::Integer(i64::from(*v)),
            NativeValue::Int16(v) => Value::Integer(i64::from(*v)),
            NativeValue::Int32(v) => Value::Integer(i64::from(*v)),
            NativeValue::Int64(v) => Value::Integer(*v),
            NativeValue::UInt8(v) => Value::Integer(i64::from(*v)),
            NativeValue::UInt16(v) => Value::Integer(i64::from(*v)),
            NativeValue::UInt32(v) => Value::Integer(i64::from(*v)),
            NativeValue::UInt64(v) => Value::Integer(
                i64::try_from(*v)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?,
            ),
            NativeValue::Float32(v) => Value::Real(f64::from(*v)),
            NativeValue::Float64(v) => Value::Real(*v),
            decimal @ NativeValue::Decimal { .. } => {
                Value::Real(decimal.as_f64().unwrap_or_default())
            }
            NativeValue::Text(v) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            NativeValue::Timestamp(v) => Value::Text(format_timestamp(v)),
            NativeValue::Date(v) => Value::Text(v.format("%Y-%m-%d").to_string()),
            NativeValue::Json(v) => Value::Text(v.to_string()),
            NativeValue::Blob(v) => return Ok(ToSqlOutput::Borrowed(ValueRef::Blob(v))),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn run_query(conn: &Connection, sql: &str) -> EngineResult<ResultSet> {
    let mut stmt = conn.prepare(sql).map_err(interrupted)?;
    if !stmt.readonly() {
        return Err(EngineError::NotReadOnly);
    }
    let declared: Vec<(String, Option<RelationalType>)> = stmt
        .columns()
        .iter()
        .map(|column| {
            (
                column.name().to_string(),
                column.decl_type().and_then(declared_type),
            )
        })
        .collect();

    let mut raw: Vec<Vec<NativeValue>> = vec![Vec::new(); declared.len()];
    let mut rows = stmt.query([]).map_err(interrupted)?;
    while let Some(row) = rows.next().map_err(interrupted)? {
        for (idx, values) in raw.iter_mut().enumerate() {
            values.push(native_from_ref(row.get_ref(idx)?));
        }
    }

    let mut columns = Vec::with_capacity(declared.len());
    for ((name, declared), values) in declared.into_iter().zip(raw) {
        let relational = declared.unwrap_or_else(|| infer_type(&values));
        let values = values
            .into_iter()
            .map(|value| coerce(value, relational))
            .collect::<EngineResult<Vec<_>>>()?;
        columns.push(ResultColumn {
            name,
            relational,
            // SQLite does not report nullability for result columns.
            nullable: true,
            values,
        });
    }
    Ok(ResultSet { columns })
}

fn interrupted(err: rusqlite::Error) -> EngineError {
    match err.sqlite_error_code() {
        Some(ErrorCode::OperationInterrupted) => EngineError::Interrupted,
        _ => EngineError::Sqlite(err),
    }
}

fn native_from_ref(value: ValueRef<'_>) -> NativeValue {
    match value {
        ValueRef::Null => NativeValue::Null,
        ValueRef::Integer(v) => NativeValue::Int64(v),
        ValueRef::Real(v) => NativeValue::Float64(v),
        ValueRef::Text(bytes) => NativeValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => NativeValue::Blob(bytes.to_vec()),
    }
}

/// Type of an expression column, from the storage classes of its values.
fn infer_type(values: &[NativeValue]) -> RelationalType {
    let mut inferred: Option<RelationalType> = None;
    for value in values {
        let ty = match value {
            NativeValue::Null => continue,
            NativeValue::Int64(_) => RelationalType::BigInt,
            NativeValue::Float64(_) => RelationalType::Double,
            NativeValue::Blob(_) => RelationalType::Blob,
            _ => RelationalType::Varchar,
        };
        inferred = Some(match (inferred, ty) {
            (None, ty) => ty,
            (Some(a), b) if a == b => a,
            (Some(RelationalType::BigInt), RelationalType::Double)
            | (Some(RelationalType::Double), RelationalType::BigInt) => RelationalType::Double,
            _ => RelationalType::Varchar,
        });
    }
    inferred.unwrap_or(RelationalType::Varchar)
}

fn coerce(value: NativeValue, relational: RelationalType) -> EngineResult<NativeValue> {
    let value = match (relational, value) {
        (RelationalType::Varchar, NativeValue::Int64(v)) => NativeValue::Text(v.to_string()),
        (RelationalType::Varchar, NativeValue::Float64(v)) => NativeValue::Text(v.to_string()),
        (_, value) => value.cast(relational)?,
    };
    Ok(value)
}
