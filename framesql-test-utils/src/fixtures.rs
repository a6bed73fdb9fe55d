//! Small frames shared by the workspace tests.

use chrono::{DateTime, Duration, Utc};
use framesql_types::{Field, Frame};

/// Frame `ref_id` with a string field `name` (`name-0`, `name-1`, ...) and a float
/// field `val` (`0.5`, `1.5`, ...).
pub fn name_val_frame(ref_id: &str, rows: usize) -> Frame {
    let names: Vec<String> = (0..rows).map(|i| format!("name-{i}")).collect();
    let vals: Vec<f64> = (0..rows).map(|i| i as f64 + 0.5).collect();
    Frame::new(ref_id)
        .with_ref_id(ref_id)
        .with_field(Field::new("name", names))
        .with_field(Field::new("val", vals))
}

/// Time series frame `ref_id`: a `time` field one minute apart from the Unix epoch, and
/// a `value` field labelled `host=<host>`.
pub fn metric_frame(ref_id: &str, host: &str, values: &[f64]) -> Frame {
    let times: Vec<DateTime<Utc>> = (0..values.len())
        .map(|i| DateTime::<Utc>::default() + Duration::minutes(i as i64))
        .collect();
    Frame::new(ref_id)
        .with_ref_id(ref_id)
        .with_field(Field::new("time", times))
        .with_field(Field::new("value", values.to_vec()).with_labels([("host", host)]))
}
