use framesql_bridge::{field_type_for, push_native};
use framesql_result::{Error, ErrorKind, Result};
use framesql_types::{Field, FieldValues, Frame, Notice};

use crate::engine::{ResultColumn, ResultSet};

/// Build the output frame of an evaluation from an engine result.
///
/// The frame is named after `ref_id` and carries `executed_sql` and `notices` in its
/// metadata. A column whose type has no frame counterpart fails the whole conversion
/// with `invalid_query`.
pub fn result_to_frame(
    ref_id: &str,
    result: ResultSet,
    executed_sql: &str,
    notices: &[Notice],
) -> Result<Frame> {
    let fields = result
        .columns
        .into_iter()
        .map(column_to_field)
        .collect::<Result<Vec<_>>>()?;

    let mut frame = Frame::new(ref_id)
        .with_ref_id(ref_id)
        .with_fields(fields);
    let meta = frame.meta_mut();
    meta.executed_query_string = Some(executed_sql.to_string());
    meta.notices.extend_from_slice(notices);
    Ok(frame)
}

fn column_to_field(column: ResultColumn) -> Result<Field> {
    let field_type = field_type_for(column.relational, column.nullable).map_err(|err| {
        Error::invalid_query(format!(
            "result column '{}' has type {} which cannot be returned",
            column.name, column.relational
        ))
        .with_source(err)
    })?;

    let mut values = FieldValues::with_capacity(field_type, column.values.len());
    for value in column.values {
        // Bridge errors can quote cell data; keep them out of the public message.
        push_native(&mut values, value).map_err(|err| {
            Error::new(
                ErrorKind::InvalidQuery,
                format!("result column '{}': {err}", column.name),
            )
            .with_token(format!("result column '{}' cannot be converted", column.name))
            .with_source(err)
        })?;
    }
    Ok(Field::new(column.name, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use framesql_bridge::{NativeValue, RelationalType};
    use framesql_types::FieldType;

    fn column(
        name: &str,
        relational: RelationalType,
        nullable: bool,
        values: Vec<NativeValue>,
    ) -> ResultColumn {
        ResultColumn {
            name: name.to_string(),
            relational,
            nullable,
            values,
        }
    }

    #[test]
    fn frame_carries_name_metadata_and_notices() {
        let result = ResultSet {
            columns: vec![
                column(
                    "host",
                    RelationalType::Varchar,
                    false,
                    vec![NativeValue::Text("a".into()), NativeValue::Text("b".into())],
                ),
                column(
                    "total",
                    RelationalType::Decimal,
                    true,
                    vec![
                        NativeValue::Decimal { value: 1250, scale: 2 },
                        NativeValue::Null,
                    ],
                ),
            ],
        };
        let notices = [Notice::warning("column 'x' was widened")];
        let frame = result_to_frame("B", result, "SELECT host, total FROM A", &notices).unwrap();

        assert_eq!(frame.name, "B");
        assert_eq!(frame.ref_id, "B");
        assert_eq!(frame.executed_query_string(), Some("SELECT host, total FROM A"));
        assert_eq!(frame.meta.as_ref().unwrap().notices, notices);
        assert_eq!(frame.fields[0].field_type(), FieldType::String);
        assert_eq!(frame.fields[1].field_type(), FieldType::NullableFloat64);
        assert_eq!(
            frame.fields[1].values,
            FieldValues::from(vec![Some(12.5_f64), None])
        );
    }

    #[test]
    fn empty_results_keep_their_columns() {
        let result = ResultSet {
            columns: vec![column("n", RelationalType::BigInt, true, Vec::new())],
        };
        let frame = result_to_frame("A", result, "SELECT n FROM A WHERE false", &[]).unwrap();
        assert_eq!(frame.fields.len(), 1);
        assert!(frame.fields[0].is_empty());
        assert_eq!(frame.fields[0].field_type(), FieldType::NullableInt64);
    }

    #[test]
    fn blob_columns_are_invalid() {
        let result = ResultSet {
            columns: vec![column("raw", RelationalType::Blob, true, vec![NativeValue::Null])],
        };
        let err = result_to_frame("A", result, "SELECT raw FROM A", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
        assert!(err.internal_message().contains("raw"));
    }

    #[test]
    fn null_in_non_nullable_column_is_invalid() {
        let result = ResultSet {
            columns: vec![column("n", RelationalType::BigInt, false, vec![NativeValue::Null])],
        };
        let err = result_to_frame("A", result, "SELECT n FROM A", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
    }

    #[test]
    fn cell_data_stays_out_of_public_message() {
        let result = ResultSet {
            columns: vec![column(
                "doc",
                RelationalType::Json,
                true,
                vec![NativeValue::Text("secret-not-json".into())],
            )],
        };
        let err = result_to_frame("A", result, "SELECT doc FROM A", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
        assert!(err.public_message().contains("'doc'"), "{err}");
        assert!(!err.public_message().contains("secret"), "{err}");
        assert!(err.internal_message().contains("secret"));
    }
}
