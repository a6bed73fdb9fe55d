use framesql_test_utils::{init_tracing_for_tests, metric_frame, name_val_frame};
use framesql_types::FieldType;

#[test]
fn name_val_frame_shape() {
    init_tracing_for_tests();
    let frame = name_val_frame("foo", 4);
    assert_eq!(frame.ref_id, "foo");
    assert_eq!(frame.row_len(), Ok(4));
    assert_eq!(frame.fields[0].field_type(), FieldType::String);
    assert_eq!(frame.fields[1].field_type(), FieldType::Float64);
}

#[test]
fn metric_frame_carries_host_label() {
    let frame = metric_frame("A", "web-1", &[1.0, 2.0]);
    assert_eq!(frame.cell_count(), 4);
    assert_eq!(
        frame.fields[1].labels.get("host").map(String::as_str),
        Some("web-1")
    );
}
