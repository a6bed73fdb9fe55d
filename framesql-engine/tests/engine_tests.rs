use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use framesql_bridge::{NativeValue, native_value_at};
use framesql_engine::{
    DataFusionFactory, EngineError, EngineFactory, EnginePool, LoadOptions, SqliteFactory,
    load_frames, result_to_frame,
};
use framesql_result::{ErrorKind, Result};
use framesql_schema::build_schema;
use framesql_test_utils::{init_tracing_for_tests, metric_frame, name_val_frame};
use framesql_types::{Field, FieldType, FieldValues, Frame};
use serde_json::json;

async fn run(
    factory: &dyn EngineFactory,
    frames: &[Frame],
    sql: &str,
    options: LoadOptions,
) -> Result<Frame> {
    let schemas = build_schema(frames)?;
    let mut engine = factory.open().map_err(EngineError::categorize)?;
    load_frames(engine.as_mut(), &schemas, frames, &options)?;
    let result = engine.query(sql).await.map_err(EngineError::categorize)?;
    engine.close().map_err(EngineError::categorize)?;
    result_to_frame("out", result, sql, schemas.notices())
}

fn factories() -> Vec<Box<dyn EngineFactory>> {
    vec![Box::new(DataFusionFactory::default()), Box::new(SqliteFactory)]
}

fn typed_frame() -> Frame {
    let time = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    Frame::new("typed").with_ref_id("A").with_fields([
        Field::new("i8", vec![-8_i8]),
        Field::new("i16", vec![-16_i16]),
        Field::new("i32", vec![-32_i32]),
        Field::new("i64", vec![-64_i64]),
        Field::new("u8", vec![8_u8]),
        Field::new("u16", vec![16_u16]),
        Field::new("u32", vec![32_u32]),
        Field::new("u64", vec![64_u64]),
        Field::new("f32", vec![1.5_f32]),
        Field::new("f64", vec![2.25_f64]),
        Field::new("flag", vec![true]),
        Field::new("label", vec!["it's"]),
        Field::new("time", vec![time]),
        Field::new("doc", vec![json!({"a": [1, 2], "b": null})]),
    ])
}

fn assert_same_cells(input: &Frame, output: &Frame, row: usize) {
    assert_eq!(input.fields.len(), output.fields.len());
    for (expected, actual) in input.fields.iter().zip(&output.fields) {
        assert_eq!(expected.name, actual.name);
        assert_eq!(
            expected.field_type().non_nullable(),
            actual.field_type().non_nullable(),
            "{}",
            expected.name
        );
        assert_eq!(
            native_value_at(&expected.values, row),
            native_value_at(&actual.values, row),
            "{}",
            expected.name
        );
    }
}

#[tokio::test]
async fn every_type_round_trips() {
    init_tracing_for_tests();
    let frames = vec![typed_frame()];
    for factory in factories() {
        let out = run(factory.as_ref(), &frames, "SELECT * FROM A", LoadOptions::default())
            .await
            .unwrap();
        assert_same_cells(&frames[0], &out, 0);
    }
}

#[tokio::test]
async fn unknown_fields_come_back_as_text() {
    let frames = vec![Frame::new("odd").with_ref_id("A").with_field(Field::new(
        "raw",
        FieldValues::Unknown(vec![Some("opaque".to_string()), None]),
    ))];
    for factory in factories() {
        let out = run(factory.as_ref(), &frames, "SELECT raw FROM A", LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(out.fields[0].field_type(), FieldType::NullableString, "{}", factory.name());
        assert_eq!(
            native_value_at(&out.fields[0].values, 0),
            NativeValue::Text("opaque".into())
        );
        assert_eq!(native_value_at(&out.fields[0].values, 1), NativeValue::Null);
        let notices = &out.meta.as_ref().unwrap().notices;
        assert!(notices.iter().any(|n| n.text.contains("'raw'")), "{notices:?}");
    }
}

fn nullable_frame(with_bool: bool) -> Frame {
    let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut frame = Frame::new("sparse").with_ref_id("A").with_fields([
        Field::new("i8", vec![Some(1_i8), None]),
        Field::new("i16", vec![Some(1_i16), None]),
        Field::new("i32", vec![Some(1_i32), None]),
        Field::new("i64", vec![Some(1_i64), None]),
        Field::new("u8", vec![Some(1_u8), None]),
        Field::new("u16", vec![Some(1_u16), None]),
        Field::new("u32", vec![Some(1_u32), None]),
        Field::new("u64", vec![Some(1_u64), None]),
        Field::new("f32", vec![Some(0.5_f32), None]),
        Field::new("f64", vec![Some(0.5_f64), None]),
        Field::new("label", vec![Some("x"), None]),
        Field::new("time", vec![Some(time), None]),
        Field::new("doc", vec![Some(json!(["x"])), None]),
    ]);
    if with_bool {
        frame = frame.with_field(Field::new("flag", vec![Some(false), None]));
    }
    frame
}

fn assert_second_row_null(input: &Frame, output: &Frame) {
    assert_same_cells(input, output, 0);
    for field in &output.fields {
        assert!(field.field_type().is_nullable(), "{}", field.name);
        assert_eq!(native_value_at(&field.values, 1), NativeValue::Null, "{}", field.name);
    }
}

#[tokio::test]
async fn nulls_survive_native_append() {
    let frames = vec![nullable_frame(true)];
    for factory in factories() {
        let out = run(factory.as_ref(), &frames, "SELECT * FROM A", LoadOptions::default())
            .await
            .unwrap();
        assert_second_row_null(&frames[0], &out);
    }
}

#[tokio::test]
async fn nulls_survive_placeholder_rewrite() {
    let frames = vec![nullable_frame(false)];
    let options = LoadOptions {
        null_placeholders: true,
        ..LoadOptions::default()
    };
    let out = run(&SqliteFactory, &frames, "SELECT * FROM A", options)
        .await
        .unwrap();
    assert_second_row_null(&frames[0], &out);
}

#[tokio::test]
async fn placeholders_need_update_support() {
    let frames = vec![nullable_frame(false)];
    let options = LoadOptions {
        null_placeholders: true,
        ..LoadOptions::default()
    };
    let err = run(&DataFusionFactory::default(), &frames, "SELECT * FROM A", options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputConversion);
}

#[tokio::test]
async fn missing_columns_are_null_across_frames() {
    let frames = vec![
        name_val_frame("A", 2),
        Frame::new("extra")
            .with_ref_id("A")
            .with_field(Field::new("name", vec!["late"])),
    ];
    for factory in factories() {
        let out = run(
            factory.as_ref(),
            &frames,
            "SELECT name, val FROM A ORDER BY name",
            LoadOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(out.fields[1].field_type(), FieldType::NullableFloat64);
        assert_eq!(
            native_value_at(&out.fields[0].values, 0),
            NativeValue::Text("late".into())
        );
        assert_eq!(native_value_at(&out.fields[1].values, 0), NativeValue::Null);
        assert_eq!(native_value_at(&out.fields[1].values, 2), NativeValue::Float64(1.5));
    }
}

#[tokio::test]
async fn labels_become_columns() {
    let frames = vec![
        metric_frame("A", "web-1", &[1.0, 2.0]),
        metric_frame("A", "web-2", &[10.0]),
    ];
    for factory in factories() {
        let out = run(
            factory.as_ref(),
            &frames,
            r#"SELECT host, SUM("value") AS total FROM A GROUP BY host ORDER BY host"#,
            LoadOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(
            native_value_at(&out.fields[0].values, 1),
            NativeValue::Text("web-2".into())
        );
        assert_eq!(native_value_at(&out.fields[1].values, 0), NativeValue::Float64(3.0));
    }
}

#[tokio::test]
async fn unknown_tables_and_columns_are_categorized() {
    let frames = vec![name_val_frame("A", 1)];
    for factory in factories() {
        let err = run(factory.as_ref(), &frames, "SELECT * FROM missing", LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TableNotFound, "{}", factory.name());
        assert_eq!(err.token(), Some("missing"));

        let err = run(factory.as_ref(), &frames, "SELECT nope FROM A", LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound, "{}", factory.name());
        assert_eq!(err.token(), Some("nope"));
    }
}

#[tokio::test]
async fn sqlite_queries_can_be_interrupted() {
    let mut engine = SqliteFactory.open().unwrap();
    let abort = engine.abort_handle();
    let query = engine.query(
        "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 1000000000) \
         SELECT count(*) FROM n",
    );
    let stopper = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        abort.abort();
    };
    let (result, ()) = tokio::join!(query, stopper);
    let err = result.unwrap_err();
    assert!(matches!(err, EngineError::Interrupted), "{err}");
    assert_eq!(err.categorize().kind(), ErrorKind::Cancel);
}

#[tokio::test]
async fn pool_blocks_beyond_its_cap() {
    let pool = EnginePool::new(Arc::new(SqliteFactory), 2);
    let first = pool.acquire().await.unwrap();
    let _second = pool.acquire().await.unwrap();

    let third = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
    assert!(third.is_err(), "third engine acquired past the cap");

    drop(first);
    let third = tokio::time::timeout(Duration::from_millis(500), pool.acquire()).await;
    assert!(matches!(third, Ok(Ok(_))));
}
