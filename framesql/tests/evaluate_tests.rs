use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use framesql::{
    BackendKind, CancellationToken, EngineFactory, ErrorKind, EvaluateRequest, Field, FieldType,
    Frame, SqlExpressions, SqlExpressionsConfig, allow_query, tables_list,
};
use framesql_engine::{
    AbortHandle, Appender, Engine, EngineCapabilities, EngineResult, ResultSet, SqliteFactory,
};
use framesql_schema::TableSchema;
use framesql_test_utils::{init_tracing_for_tests, metric_frame, name_val_frame};
use indoc::indoc;

const SLOW_QUERY: &str = indoc! {"
    WITH RECURSIVE n(x) AS (
        SELECT 1
        UNION ALL
        SELECT x + 1 FROM n WHERE x < 1000000000
    )
    SELECT count(*) AS c FROM n
"};

fn service(backend: BackendKind) -> SqlExpressions {
    SqlExpressions::new(SqlExpressionsConfig {
        backend,
        ..SqlExpressionsConfig::default()
    })
    .unwrap()
}

fn foo_bar() -> Vec<Frame> {
    vec![name_val_frame("foo", 5), name_val_frame("bar", 2)]
}

/// Opens SQLite engines and counts how many it opened.
#[derive(Default)]
struct CountingFactory {
    opened: AtomicUsize,
}

impl EngineFactory for CountingFactory {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn open(&self) -> EngineResult<Box<dyn Engine>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        SqliteFactory.open()
    }
}

const SLOW_LOAD: Duration = Duration::from_secs(1);

/// SQLite engine whose table creation stalls the calling thread.
struct SlowLoadEngine(Box<dyn Engine>);

#[async_trait]
impl Engine for SlowLoadEngine {
    fn name(&self) -> &'static str {
        "slow-load"
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.0.capabilities()
    }

    fn create_table(&mut self, table: &TableSchema) -> EngineResult<()> {
        thread::sleep(SLOW_LOAD);
        self.0.create_table(table)
    }

    fn appender(&mut self, table: &TableSchema) -> EngineResult<Box<dyn Appender>> {
        self.0.appender(table)
    }

    fn execute_batch(&mut self, sql: &str) -> EngineResult<()> {
        self.0.execute_batch(sql)
    }

    async fn query(&mut self, sql: &str) -> EngineResult<ResultSet> {
        self.0.query(sql).await
    }

    fn abort_handle(&self) -> AbortHandle {
        self.0.abort_handle()
    }

    fn close(self: Box<Self>) -> EngineResult<()> {
        self.0.close()
    }
}

struct SlowLoadFactory;

impl EngineFactory for SlowLoadFactory {
    fn name(&self) -> &'static str {
        "slow-load"
    }

    fn open(&self) -> EngineResult<Box<dyn Engine>> {
        Ok(Box::new(SlowLoadEngine(SqliteFactory.open()?)))
    }
}

#[tokio::test]
async fn limit_query_returns_exactly_three_rows() {
    init_tracing_for_tests();
    let sql = "SELECT * FROM foo LIMIT 3";
    for backend in [BackendKind::DataFusion, BackendKind::Sqlite] {
        let result = service(backend)
            .evaluate(EvaluateRequest::new("B", sql, foo_bar()))
            .await;
        assert_eq!(result.executed_sql, sql);
        let frame = result.into_result().unwrap();
        assert_eq!(frame.name, "B");
        assert_eq!(frame.executed_query_string(), Some(sql));
        assert_eq!(frame.fields.len(), 2);
        assert_eq!(frame.row_len().unwrap(), 3, "{backend}");
    }
}

#[tokio::test]
async fn aggregates_over_labelled_series() {
    let frames = vec![
        metric_frame("A", "web-1", &[1.0, 3.0]),
        metric_frame("A", "web-2", &[5.0]),
    ];
    let sql = r#"SELECT host, AVG("value") AS avg_value FROM A GROUP BY host ORDER BY host"#;
    for backend in [BackendKind::DataFusion, BackendKind::Sqlite] {
        let frame = service(backend)
            .evaluate(EvaluateRequest::new("B", sql, frames.clone()))
            .await
            .into_result()
            .unwrap();
        assert_eq!(frame.fields[0].name, "host");
        assert_eq!(frame.fields[1].name, "avg_value");
        assert_eq!(
            frame.fields[1].field_type().non_nullable(),
            FieldType::Float64
        );
        assert_eq!(frame.row_len().unwrap(), 2);
    }
}

#[tokio::test]
async fn cell_limit_fails_before_any_engine_is_opened() {
    let factory = Arc::new(CountingFactory::default());
    let service =
        SqlExpressions::with_engine_factory(SqlExpressionsConfig::default(), factory.clone())
            .unwrap();
    let request = EvaluateRequest::new("B", "SELECT * FROM foo", foo_bar()).with_input_cell_limit(13);

    let err = service.evaluate(request).await.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputLimitExceeded);
    assert_eq!(err.ref_id(), Some("B"));
    assert_eq!(factory.opened.load(Ordering::SeqCst), 0);

    let request = EvaluateRequest::new("B", "SELECT * FROM foo", foo_bar()).with_input_cell_limit(14);
    assert!(service.evaluate(request).await.is_ok());
    assert_eq!(factory.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_table_is_reported_by_name() {
    let factory = Arc::new(CountingFactory::default());
    let service =
        SqlExpressions::with_engine_factory(SqlExpressionsConfig::default(), factory.clone())
            .unwrap();
    let err = service
        .evaluate(EvaluateRequest::new("B", "SELECT * FROM foo JOIN baz ON foo.name = baz.name", foo_bar()))
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableNotFound);
    assert_eq!(err.token(), Some("baz"));
    assert!(err.to_string().contains("baz"), "{err}");
    assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_dependencies_stop_evaluation() {
    let request = EvaluateRequest::new("C", "SELECT * FROM foo, bar", foo_bar())
        .with_failed_dependencies(["bar"]);
    let err = service(BackendKind::DataFusion)
        .evaluate(request)
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedDependency);
    assert_eq!(err.token(), Some("bar"));
}

#[tokio::test]
async fn gate_and_parse_failures() {
    let service = service(BackendKind::DataFusion);
    let cases = [
        ("", ErrorKind::EmptyQuery),
        ("   ", ErrorKind::EmptyQuery),
        ("SELECT (1 FROM foo", ErrorKind::InvalidQuery),
        ("SELECT load_file('/etc/passwd')", ErrorKind::BlockedNodeOrFunc),
        ("DROP TABLE foo", ErrorKind::BlockedNodeOrFunc),
        ("SELECT 1; SELECT 2", ErrorKind::InvalidQuery),
    ];
    for (sql, kind) in cases {
        let result = service.evaluate(EvaluateRequest::new("B", sql, foo_bar())).await;
        assert!(result.frame.is_none());
        let err = result.error.unwrap();
        assert_eq!(err.kind(), kind, "{sql:?}");
        assert_eq!(err.ref_id(), Some("B"));
    }
}

#[tokio::test]
async fn missing_column_is_column_not_found() {
    for backend in [BackendKind::DataFusion, BackendKind::Sqlite] {
        let err = service(backend)
            .evaluate(EvaluateRequest::new("B", "SELECT nope FROM foo", foo_bar()))
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound, "{backend}");
        assert_eq!(err.token(), Some("nope"));
    }
}

#[tokio::test]
async fn conflicting_columns_are_left_out_with_a_notice() {
    let frames = vec![
        Frame::new("a")
            .with_ref_id("A")
            .with_field(Field::new("v", vec!["text"])),
        Frame::new("b")
            .with_ref_id("A")
            .with_field(Field::new("v", vec![1.0_f64]))
            .with_field(Field::new("k", vec![1_i64])),
    ];
    let service = service(BackendKind::DataFusion);

    let frame = service
        .evaluate(EvaluateRequest::new("B", "SELECT k FROM A", frames.clone()))
        .await
        .into_result()
        .unwrap();
    let notices = &frame.meta.as_ref().unwrap().notices;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains("'v'"), "{}", notices[0].text);

    let err = service
        .evaluate(EvaluateRequest::new("B", "SELECT v FROM A", frames))
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
}

#[tokio::test]
async fn duplicate_label_columns_are_rejected() {
    let frames = vec![Frame::new("a")
        .with_ref_id("A")
        .with_field(Field::new("host", vec!["x"]))
        .with_field(Field::new("value", vec![1.0_f64]).with_labels([("host", "y")]))];
    let err = service(BackendKind::DataFusion)
        .evaluate(EvaluateRequest::new("B", "SELECT * FROM A", frames))
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateStringColumns);
}

#[tokio::test]
async fn slow_queries_time_out() {
    let service = service(BackendKind::Sqlite);
    let request = EvaluateRequest::new("B", SLOW_QUERY, Vec::new())
        .with_time_limit(Duration::from_millis(200));
    let err = service.evaluate(request).await.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // The engine was released and interrupted; the pool serves the next request.
    let frame = service
        .evaluate(EvaluateRequest::new("B", "SELECT 1 AS one", Vec::new()))
        .await
        .into_result()
        .unwrap();
    assert_eq!(frame.fields[0].name, "one");
}

#[tokio::test]
async fn slow_loads_time_out_on_schedule() {
    let service =
        SqlExpressions::with_engine_factory(SqlExpressionsConfig::default(), Arc::new(SlowLoadFactory))
            .unwrap();
    let request = EvaluateRequest::new("B", "SELECT * FROM foo", foo_bar())
        .with_time_limit(Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let err = service.evaluate(request).await.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() < SLOW_LOAD / 2, "{:?}", started.elapsed());
}

#[tokio::test]
async fn dual_needs_no_input_frame() {
    for backend in [BackendKind::DataFusion, BackendKind::Sqlite] {
        let frame = service(backend)
            .evaluate(EvaluateRequest::new("B", "SELECT 1 AS one FROM dual", Vec::new()))
            .await
            .into_result()
            .unwrap();
        assert_eq!(frame.fields.len(), 1, "{backend}");
        assert_eq!(frame.fields[0].name, "one");
        assert_eq!(frame.row_len().unwrap(), 1, "{backend}");
    }
}

#[tokio::test]
async fn identifier_case_follows_the_backend() {
    let frames = vec![Frame::new("a")
        .with_ref_id("A")
        .with_field(Field::new("Value", vec![1.0_f64]))];

    let err = service(BackendKind::DataFusion)
        .evaluate(EvaluateRequest::new("B", "SELECT value FROM A", frames.clone()))
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ColumnNotFound);

    for backend in [BackendKind::DataFusion, BackendKind::Sqlite] {
        let frame = service(backend)
            .evaluate(EvaluateRequest::new("B", r#"SELECT "Value" FROM A"#, frames.clone()))
            .await
            .into_result()
            .unwrap();
        assert_eq!(frame.fields[0].name, "Value", "{backend}");
    }
    assert!(service(BackendKind::Sqlite)
        .evaluate(EvaluateRequest::new("B", "SELECT value FROM A", frames))
        .await
        .is_ok());
}

#[tokio::test]
async fn queries_can_be_cancelled() {
    let service = service(BackendKind::Sqlite);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let request = EvaluateRequest::new("B", SLOW_QUERY, Vec::new())
        .with_time_limit(Duration::from_secs(30));
    let err = service
        .evaluate_with_cancel(request, cancel)
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancel);
}

#[tokio::test]
async fn extra_functions_extend_the_allow_list() {
    let sql = "SELECT upper(name) AS loud FROM foo LIMIT 1";
    let strict = SqlExpressions::new(SqlExpressionsConfig::default()).unwrap();
    let config = SqlExpressionsConfig::from_toml(r#"extra_functions = ["upper"]"#).unwrap();
    let relaxed = SqlExpressions::new(config).unwrap();

    if !strict.gatekeeper().policy().allows_function("upper") {
        let err = strict
            .evaluate(EvaluateRequest::new("B", sql, foo_bar()))
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BlockedNodeOrFunc);
    }
    let frame = relaxed
        .evaluate(EvaluateRequest::new("B", sql, foo_bar()))
        .await
        .into_result()
        .unwrap();
    assert_eq!(frame.fields[0].name, "loud");
}

#[test]
fn stateless_checks() {
    assert!(allow_query("SELECT a, SUM(b) FROM t GROUP BY a").is_ok());
    assert_eq!(
        allow_query("SELECT LOAD_FILE('/etc/passwd')").unwrap_err().kind(),
        ErrorKind::BlockedNodeOrFunc
    );
    assert_eq!(tables_list("select * from foo,bar").unwrap(), ["bar", "foo"]);
    assert!(tables_list("select 1 as 'n'").unwrap().is_empty());
    assert_eq!(
        tables_list("select * from (select * from people limit 1) AS subquery").unwrap(),
        ["people"]
    );
}
