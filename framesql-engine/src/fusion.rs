//! DataFusion backend.
//!
//! Each engine owns one in-memory [`SessionContext`]. Tables are Arrow [`MemTable`]s
//! assembled by a columnar appender: rows are pushed into one Arrow builder per
//! column and cut into a [`RecordBatch`] on every flush. Arrow builders take NULLs
//! natively, so this backend never needs NULL placeholders.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryBuilder, BooleanBuilder, Date32Builder, Float32Builder,
    Float64Builder, Int8Builder, Int16Builder, Int32Builder, Int64Builder, StringArray,
    StringBuilder, TimestampNanosecondBuilder, UInt8Builder, UInt16Builder, UInt32Builder,
    UInt64Builder,
};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Decimal256Type, Field, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, Schema, SchemaRef, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::{SessionConfig, SessionContext};
use datafusion::sql::TableReference;
use framesql_bridge::{BridgeError, NativeValue, RelationalType};
use framesql_schema::TableSchema;
use tracing::debug;

use crate::engine::{
    AbortHandle, Appender, DUAL_TABLE, Engine, EngineCapabilities, ResultColumn, ResultSet,
};
use crate::error::{EngineError, EngineResult};

const ENGINE_NAME: &str = "datafusion";
const UTC: &str = "UTC";

/// Field metadata key naming an Arrow extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
/// Canonical extension name of UTF-8 columns holding JSON text.
pub const JSON_EXTENSION: &str = "arrow.json";

/// Arrow type used to store a column of `ty`.
pub fn arrow_type(ty: RelationalType) -> DataType {
    match ty {
        RelationalType::TinyInt => DataType::Int8,
        RelationalType::SmallInt => DataType::Int16,
        RelationalType::Integer => DataType::Int32,
        RelationalType::BigInt => DataType::Int64,
        RelationalType::UTinyInt => DataType::UInt8,
        RelationalType::USmallInt => DataType::UInt16,
        RelationalType::UInteger => DataType::UInt32,
        RelationalType::UBigInt => DataType::UInt64,
        RelationalType::Float => DataType::Float32,
        // Decimal input is cast to double before it reaches an appender.
        RelationalType::Double | RelationalType::Decimal => DataType::Float64,
        RelationalType::Boolean => DataType::Boolean,
        RelationalType::Varchar | RelationalType::Json => DataType::Utf8,
        RelationalType::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, Some(UTC.into())),
        RelationalType::Date => DataType::Date32,
        RelationalType::Blob => DataType::Binary,
    }
}

/// Relational type reported for a result column of Arrow type `data_type`.
pub fn relational_type(column: &str, data_type: &DataType) -> EngineResult<RelationalType> {
    let ty = match data_type {
        DataType::Int8 => RelationalType::TinyInt,
        DataType::Int16 => RelationalType::SmallInt,
        DataType::Int32 => RelationalType::Integer,
        DataType::Int64 => RelationalType::BigInt,
        DataType::UInt8 => RelationalType::UTinyInt,
        DataType::UInt16 => RelationalType::USmallInt,
        DataType::UInt32 => RelationalType::UInteger,
        DataType::UInt64 => RelationalType::UBigInt,
        DataType::Float32 => RelationalType::Float,
        DataType::Float64 => RelationalType::Double,
        DataType::Decimal128(..) | DataType::Decimal256(..) => RelationalType::Decimal,
        DataType::Boolean => RelationalType::Boolean,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Null => {
            RelationalType::Varchar
        }
        DataType::Timestamp(..) => RelationalType::Timestamp,
        DataType::Date32 | DataType::Date64 => RelationalType::Date,
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => RelationalType::Blob,
        other => {
            return Err(EngineError::UnsupportedColumn {
                column: column.to_string(),
                ty: other.to_string(),
            });
        }
    };
    Ok(ty)
}

/// Relational type of a result field, honouring the JSON extension marker.
pub fn field_relational_type(field: &Field) -> EngineResult<RelationalType> {
    let ty = relational_type(field.name(), field.data_type())?;
    let is_json = field
        .metadata()
        .get(EXTENSION_NAME_KEY)
        .is_some_and(|name| name == JSON_EXTENSION);
    if is_json && ty == RelationalType::Varchar {
        return Ok(RelationalType::Json);
    }
    Ok(ty)
}

fn arrow_field(name: &str, ty: RelationalType, nullable: bool) -> Field {
    let field = Field::new(name, arrow_type(ty), nullable);
    if ty == RelationalType::Json {
        let metadata =
            HashMap::from([(EXTENSION_NAME_KEY.to_string(), JSON_EXTENSION.to_string())]);
        return field.with_metadata(metadata);
    }
    field
}

fn arrow_schema(table: &TableSchema) -> SchemaRef {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|column| arrow_field(&column.name, column.relational, column.nullable))
        .collect();
    Arc::new(Schema::new(fields))
}

fn dual_table() -> EngineResult<MemTable> {
    let schema = Arc::new(Schema::new(vec![Field::new("dummy", DataType::Utf8, false)]));
    let dummy: ArrayRef = Arc::new(StringArray::from(vec!["X"]));
    let batch = RecordBatch::try_new(Arc::clone(&schema), vec![dummy])?;
    Ok(MemTable::try_new(schema, vec![vec![batch]])?)
}

/// Options shared by every DataFusion engine a factory opens.
#[derive(Debug, Clone, Copy)]
pub struct DataFusionOptions {
    pub target_partitions: usize,
}

impl Default for DataFusionOptions {
    fn default() -> Self {
        DataFusionOptions {
            target_partitions: 1,
        }
    }
}

pub struct DataFusionEngine {
    ctx: SessionContext,
    options: SQLOptions,
}

impl DataFusionEngine {
    pub fn new(options: DataFusionOptions) -> EngineResult<Self> {
        let mut config = SessionConfig::new()
            .with_target_partitions(options.target_partitions.max(1))
            .with_information_schema(false);
        // Frame and field names keep their case.
        config.options_mut().sql_parser.enable_ident_normalization = false;

        let ctx = SessionContext::new_with_config(config);
        // Identifiers are case-sensitive here, so both common spellings resolve.
        for name in [DUAL_TABLE.to_string(), DUAL_TABLE.to_ascii_uppercase()] {
            Self::register(&ctx, &name, dual_table()?)?;
        }
        Ok(DataFusionEngine {
            ctx,
            options: SQLOptions::new()
                .with_allow_ddl(false)
                .with_allow_dml(false)
                .with_allow_statements(false),
        })
    }

    fn register(ctx: &SessionContext, name: &str, table: MemTable) -> EngineResult<()> {
        let reference = TableReference::bare(name.to_string());
        ctx.deregister_table(reference.clone())?;
        ctx.register_table(reference, Arc::new(table))?;
        Ok(())
    }
}

#[async_trait]
impl Engine for DataFusionEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            null_append: true,
            supports_update: false,
        }
    }

    fn create_table(&mut self, table: &TableSchema) -> EngineResult<()> {
        let schema = arrow_schema(table);
        debug!(engine = ENGINE_NAME, table = %table.ref_id, schema = ?schema, "create table");
        let empty = MemTable::try_new(schema, vec![Vec::new()])?;
        Self::register(&self.ctx, &table.ref_id, empty)
    }

    fn appender(&mut self, table: &TableSchema) -> EngineResult<Box<dyn Appender>> {
        let schema = arrow_schema(table);
        let builders = table
            .columns
            .iter()
            .map(|column| ColumnBuilder::new(column.relational))
            .collect();
        Ok(Box::new(DataFusionAppender {
            ctx: self.ctx.clone(),
            table: table.ref_id.clone(),
            schema,
            builders,
            pending_rows: 0,
            batches: Vec::new(),
        }))
    }

    fn execute_batch(&mut self, _sql: &str) -> EngineResult<()> {
        Err(EngineError::Unsupported {
            engine: ENGINE_NAME,
            operation: "statements without results",
        })
    }

    async fn query(&mut self, sql: &str) -> EngineResult<ResultSet> {
        let frame = self.ctx.sql_with_options(sql, self.options).await?;
        let schema = Arc::new(frame.schema().as_arrow().clone());
        let batches = frame.collect().await?;
        read_batches(&schema, &batches)
    }

    fn abort_handle(&self) -> AbortHandle {
        // Dropping the query future stops execution.
        AbortHandle::noop()
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        Ok(())
    }
}

struct DataFusionAppender {
    ctx: SessionContext,
    table: String,
    schema: SchemaRef,
    builders: Vec<ColumnBuilder>,
    pending_rows: usize,
    batches: Vec<RecordBatch>,
}

impl Appender for DataFusionAppender {
    fn append_row(&mut self, row: Vec<NativeValue>) -> EngineResult<()> {
        for (builder, value) in self.builders.iter_mut().zip(row) {
            builder.append(value)?;
        }
        self.pending_rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> EngineResult<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        let columns: Vec<ArrayRef> = self.builders.iter_mut().map(ColumnBuilder::finish).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.pending_rows));
        let batch = RecordBatch::try_new_with_options(Arc::clone(&self.schema), columns, &options)?;
        self.batches.push(batch);
        self.pending_rows = 0;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> EngineResult<()> {
        self.flush()?;
        let batches = std::mem::take(&mut self.batches);
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        let table = MemTable::try_new(Arc::clone(&self.schema), vec![batches])?;
        DataFusionEngine::register(&self.ctx, &self.table, table)?;
        debug!(engine = ENGINE_NAME, table = %self.table, rows, "table loaded");
        Ok(())
    }
}

/// One Arrow builder per column type.
enum ColumnBuilder {
    Int8(Int8Builder),
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    UInt8(UInt8Builder),
    UInt16(UInt16Builder),
    UInt32(UInt32Builder),
    UInt64(UInt64Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Boolean(BooleanBuilder),
    Utf8(StringBuilder),
    Timestamp(TimestampNanosecondBuilder),
    Date(Date32Builder),
    Binary(BinaryBuilder),
}

impl ColumnBuilder {
    fn new(ty: RelationalType) -> Self {
        match ty {
            RelationalType::TinyInt => ColumnBuilder::Int8(Int8Builder::new()),
            RelationalType::SmallInt => ColumnBuilder::Int16(Int16Builder::new()),
            RelationalType::Integer => ColumnBuilder::Int32(Int32Builder::new()),
            RelationalType::BigInt => ColumnBuilder::Int64(Int64Builder::new()),
            RelationalType::UTinyInt => ColumnBuilder::UInt8(UInt8Builder::new()),
            RelationalType::USmallInt => ColumnBuilder::UInt16(UInt16Builder::new()),
            RelationalType::UInteger => ColumnBuilder::UInt32(UInt32Builder::new()),
            RelationalType::UBigInt => ColumnBuilder::UInt64(UInt64Builder::new()),
            RelationalType::Float => ColumnBuilder::Float32(Float32Builder::new()),
            RelationalType::Double | RelationalType::Decimal => {
                ColumnBuilder::Float64(Float64Builder::new())
            }
            RelationalType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::new()),
            RelationalType::Varchar | RelationalType::Json => {
                ColumnBuilder::Utf8(StringBuilder::new())
            }
            RelationalType::Timestamp => {
                ColumnBuilder::Timestamp(TimestampNanosecondBuilder::new().with_timezone(UTC))
            }
            RelationalType::Date => ColumnBuilder::Date(Date32Builder::new()),
            RelationalType::Blob => ColumnBuilder::Binary(BinaryBuilder::new()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ColumnBuilder::Int8(_) => "Int8",
            ColumnBuilder::Int16(_) => "Int16",
            ColumnBuilder::Int32(_) => "Int32",
            ColumnBuilder::Int64(_) => "Int64",
            ColumnBuilder::UInt8(_) => "UInt8",
            ColumnBuilder::UInt16(_) => "UInt16",
            ColumnBuilder::UInt32(_) => "UInt32",
            ColumnBuilder::UInt64(_) => "UInt64",
            ColumnBuilder::Float32(_) => "Float32",
            ColumnBuilder::Float64(_) => "Float64",
            ColumnBuilder::Boolean(_) => "Boolean",
            ColumnBuilder::Utf8(_) => "Utf8",
            ColumnBuilder::Timestamp(_) => "Timestamp",
            ColumnBuilder::Date(_) => "Date32",
            ColumnBuilder::Binary(_) => "Binary",
        }
    }

    fn append_null(&mut self) {
        match self {
            ColumnBuilder::Int8(b) => b.append_null(),
            ColumnBuilder::Int16(b) => b.append_null(),
            ColumnBuilder::Int32(b) => b.append_null(),
            ColumnBuilder::Int64(b) => b.append_null(),
            ColumnBuilder::UInt8(b) => b.append_null(),
            ColumnBuilder::UInt16(b) => b.append_null(),
            ColumnBuilder::UInt32(b) => b.append_null(),
            ColumnBuilder::UInt64(b) => b.append_null(),
            ColumnBuilder::Float32(b) => b.append_null(),
            ColumnBuilder::Float64(b) => b.append_null(),
            ColumnBuilder::Boolean(b) => b.append_null(),
            ColumnBuilder::Utf8(b) => b.append_null(),
            ColumnBuilder::Timestamp(b) => b.append_null(),
            ColumnBuilder::Date(b) => b.append_null(),
            ColumnBuilder::Binary(b) => b.append_null(),
        }
    }

    fn append(&mut self, value: NativeValue) -> EngineResult<()> {
        if value.is_null() {
            self.append_null();
            return Ok(());
        }
        match (self, value) {
            (ColumnBuilder::Int8(b), NativeValue::Int8(v)) => b.append_value(v),
            (ColumnBuilder::Int16(b), NativeValue::Int16(v)) => b.append_value(v),
            (ColumnBuilder::Int32(b), NativeValue::Int32(v)) => b.append_value(v),
            (ColumnBuilder::Int64(b), NativeValue::Int64(v)) => b.append_value(v),
            (ColumnBuilder::UInt8(b), NativeValue::UInt8(v)) => b.append_value(v),
            (ColumnBuilder::UInt16(b), NativeValue::UInt16(v)) => b.append_value(v),
            (ColumnBuilder::UInt32(b), NativeValue::UInt32(v)) => b.append_value(v),
            (ColumnBuilder::UInt64(b), NativeValue::UInt64(v)) => b.append_value(v),
            (ColumnBuilder::Float32(b), NativeValue::Float32(v)) => b.append_value(v),
            (ColumnBuilder::Float64(b), NativeValue::Float64(v)) => b.append_value(v),
            (ColumnBuilder::Boolean(b), NativeValue::Bool(v)) => b.append_value(v),
            (ColumnBuilder::Utf8(b), NativeValue::Text(v)) => b.append_value(v),
            (ColumnBuilder::Utf8(b), NativeValue::Json(v)) => b.append_value(v.to_string()),
            (ColumnBuilder::Timestamp(b), NativeValue::Timestamp(v)) => {
                let nanos = v.timestamp_nanos_opt().ok_or_else(|| BridgeError::OutOfRange {
                    value: v.to_rfc3339(),
                    target: "Timestamp(ns)",
                })?;
                b.append_value(nanos)
            }
            (ColumnBuilder::Date(b), NativeValue::Date(v)) => {
                b.append_value(Date32Type::from_naive_date(v))
            }
            (ColumnBuilder::Binary(b), NativeValue::Blob(v)) => b.append_value(v),
            (builder, value) => {
                return Err(BridgeError::Mismatch {
                    found: value.kind_name(),
                    target: builder.type_name(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Int8(b) => Arc::new(b.finish()),
            ColumnBuilder::Int16(b) => Arc::new(b.finish()),
            ColumnBuilder::Int32(b) => Arc::new(b.finish()),
            ColumnBuilder::Int64(b) => Arc::new(b.finish()),
            ColumnBuilder::UInt8(b) => Arc::new(b.finish()),
            ColumnBuilder::UInt16(b) => Arc::new(b.finish()),
            ColumnBuilder::UInt32(b) => Arc::new(b.finish()),
            ColumnBuilder::UInt64(b) => Arc::new(b.finish()),
            ColumnBuilder::Float32(b) => Arc::new(b.finish()),
            ColumnBuilder::Float64(b) => Arc::new(b.finish()),
            ColumnBuilder::Boolean(b) => Arc::new(b.finish()),
            ColumnBuilder::Utf8(b) => Arc::new(b.finish()),
            ColumnBuilder::Timestamp(b) => Arc::new(b.finish()),
            ColumnBuilder::Date(b) => Arc::new(b.finish()),
            ColumnBuilder::Binary(b) => Arc::new(b.finish()),
        }
    }
}

/// Collect `batches` into column-major form.
fn read_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> EngineResult<ResultSet> {
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let mut columns = Vec::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let relational = field_relational_type(field)?;
        let mut values = Vec::with_capacity(rows);
        for batch in batches {
            read_array(field.name(), batch.column(idx), &mut values)?;
        }
        columns.push(ResultColumn {
            name: field.name().clone(),
            relational,
            nullable: field.is_nullable() || field.data_type() == &DataType::Null,
            values,
        });
    }
    Ok(ResultSet { columns })
}

fn read_array(column: &str, array: &ArrayRef, out: &mut Vec<NativeValue>) -> EngineResult<()> {
    for row in 0..array.len() {
        let value = if array.is_null(row) {
            NativeValue::Null
        } else {
            read_cell(column, array, row)?
        };
        out.push(value);
    }
    Ok(())
}

fn read_cell(column: &str, array: &ArrayRef, row: usize) -> EngineResult<NativeValue> {
    let out_of_range = |target: &'static str| BridgeError::OutOfRange {
        value: format!("row {row} of '{column}'"),
        target,
    };
    let value = match array.data_type() {
        DataType::Null => NativeValue::Null,
        DataType::Boolean => NativeValue::Bool(array.as_boolean().value(row)),
        DataType::Int8 => NativeValue::Int8(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => NativeValue::Int16(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => NativeValue::Int32(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => NativeValue::Int64(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => NativeValue::UInt8(array.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => NativeValue::UInt16(array.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => NativeValue::UInt32(array.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => NativeValue::UInt64(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => NativeValue::Float32(array.as_primitive::<Float32Type>().value(row)),
        DataType::Float64 => NativeValue::Float64(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, scale) => NativeValue::Decimal {
            value: array.as_primitive::<Decimal128Type>().value(row),
            scale: *scale,
        },
        DataType::Decimal256(_, scale) => NativeValue::Decimal {
            value: array
                .as_primitive::<Decimal256Type>()
                .value(row)
                .to_i128()
                .ok_or_else(|| out_of_range("Decimal128"))?,
            scale: *scale,
        },
        DataType::Utf8 => NativeValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => NativeValue::Text(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => NativeValue::Text(array.as_string_view().value(row).to_string()),
        DataType::Date32 => NativeValue::Date(
            array
                .as_primitive::<Date32Type>()
                .value_as_date(row)
                .ok_or_else(|| out_of_range("Date"))?,
        ),
        DataType::Date64 => NativeValue::Date(
            array
                .as_primitive::<Date64Type>()
                .value_as_date(row)
                .ok_or_else(|| out_of_range("Date"))?,
        ),
        DataType::Timestamp(unit, _) => {
            let naive = match unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => array
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            NativeValue::Timestamp(naive.ok_or_else(|| out_of_range("Timestamp"))?.and_utc())
        }
        DataType::Binary => NativeValue::Blob(array.as_binary::<i32>().value(row).to_vec()),
        DataType::LargeBinary => NativeValue::Blob(array.as_binary::<i64>().value(row).to_vec()),
        DataType::BinaryView => NativeValue::Blob(array.as_binary_view().value(row).to_vec()),
        other => {
            return Err(EngineError::UnsupportedColumn {
                column: column.to_string(),
                ty: other.to_string(),
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use framesql_schema::ColumnSchema;

    fn table() -> TableSchema {
        TableSchema {
            ref_id: "A".into(),
            columns: vec![
                ColumnSchema {
                    name: "Host".into(),
                    relational: RelationalType::Varchar,
                    nullable: false,
                },
                ColumnSchema {
                    name: "value".into(),
                    relational: RelationalType::Double,
                    nullable: true,
                },
                ColumnSchema {
                    name: "time".into(),
                    relational: RelationalType::Timestamp,
                    nullable: false,
                },
            ],
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn appended_rows_are_queryable_with_case_kept() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        let table = table();
        engine.create_table(&table).unwrap();
        let mut appender = engine.appender(&table).unwrap();
        appender
            .append_row(vec![
                NativeValue::Text("a".into()),
                NativeValue::Float64(1.5),
                NativeValue::Timestamp(ts(60)),
            ])
            .unwrap();
        appender.flush().unwrap();
        appender
            .append_row(vec![
                NativeValue::Text("b".into()),
                NativeValue::Null,
                NativeValue::Timestamp(ts(120)),
            ])
            .unwrap();
        appender.close().unwrap();

        let result = engine
            .query("SELECT \"Host\", value, \"time\" FROM A ORDER BY \"time\"")
            .await
            .unwrap();
        assert_eq!(result.row_count(), 2);
        let host = result.column("Host").unwrap();
        assert_eq!(host.relational, RelationalType::Varchar);
        assert_eq!(host.values[1], NativeValue::Text("b".into()));
        let value = result.column("value").unwrap();
        assert_eq!(value.values, [NativeValue::Float64(1.5), NativeValue::Null]);
        let time = result.column("time").unwrap();
        assert_eq!(time.relational, RelationalType::Timestamp);
        assert_eq!(time.values[0], NativeValue::Timestamp(ts(60)));
    }

    #[tokio::test]
    async fn empty_tables_are_registered_on_create() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        engine.create_table(&table()).unwrap();
        let result = engine.query("SELECT count(*) AS n FROM A").await.unwrap();
        assert_eq!(result.columns[0].values, [NativeValue::Int64(0)]);
    }

    #[tokio::test]
    async fn ddl_and_dml_are_refused() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        engine.create_table(&table()).unwrap();
        assert!(engine.query("CREATE TABLE b (x INT)").await.is_err());
        assert!(engine.query("INSERT INTO A VALUES ('x', 1.0, now())").await.is_err());
        assert!(engine.execute_batch("SELECT 1").is_err());
    }

    #[tokio::test]
    async fn missing_table_is_categorized() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        let err = engine
            .query("SELECT * FROM nope")
            .await
            .unwrap_err()
            .categorize();
        assert_eq!(err.kind(), framesql_result::ErrorKind::TableNotFound);
        assert_eq!(err.token(), Some("nope"));
    }

    #[tokio::test]
    async fn json_columns_keep_their_type() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        let table = TableSchema {
            ref_id: "A".into(),
            columns: vec![ColumnSchema {
                name: "doc".into(),
                relational: RelationalType::Json,
                nullable: false,
            }],
        };
        engine.create_table(&table).unwrap();
        let mut appender = engine.appender(&table).unwrap();
        appender
            .append_row(vec![NativeValue::Json(serde_json::json!({"a": 1}))])
            .unwrap();
        appender.close().unwrap();

        let result = engine.query("SELECT doc FROM A").await.unwrap();
        let doc = result.column("doc").unwrap();
        assert_eq!(doc.relational, RelationalType::Json);
        assert_eq!(doc.values, [NativeValue::Text(r#"{"a":1}"#.into())]);
    }

    #[tokio::test]
    async fn dual_has_one_row() {
        let mut engine = DataFusionEngine::new(DataFusionOptions::default()).unwrap();
        for sql in ["SELECT 1 AS one FROM dual", "SELECT 1 AS one FROM DUAL"] {
            let result = engine.query(sql).await.unwrap();
            assert_eq!(result.columns[0].values, [NativeValue::Int64(1)], "{sql}");
        }
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let mut builder = ColumnBuilder::new(RelationalType::BigInt);
        let err = builder.append(NativeValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, EngineError::Bridge(BridgeError::Mismatch { .. })));
    }

    #[test]
    fn result_types_map_back() {
        assert_eq!(
            relational_type("d", &DataType::Decimal128(10, 2)).unwrap(),
            RelationalType::Decimal
        );
        assert_eq!(
            relational_type("n", &DataType::Null).unwrap(),
            RelationalType::Varchar
        );
        assert!(relational_type("l", &DataType::Float16).is_err());

        let json = arrow_field("doc", RelationalType::Json, true);
        assert_eq!(field_relational_type(&json).unwrap(), RelationalType::Json);
        let text = Field::new("doc", DataType::Utf8, true);
        assert_eq!(field_relational_type(&text).unwrap(), RelationalType::Varchar);
    }
}
