use framesql_types::FieldType;
use thiserror::Error;

/// Failure to move a value across the frame/engine boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A NULL arrived for a column whose frame type has no nullable storage.
    #[error("unexpected type: NULL for non-nullable {target} column")]
    UnexpectedNull { target: FieldType },

    /// The native value's kind cannot be converted to the target type.
    #[error("unexpected type: cannot convert {found} to {target}")]
    Mismatch {
        found: &'static str,
        target: &'static str,
    },

    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// Engine column type with no frame counterpart.
    #[error("unsupported column type {0}")]
    UnsupportedType(String),

    #[error("cannot parse '{text}' as {target}")]
    Parse { text: String, target: &'static str },
}

impl BridgeError {
    pub(crate) fn mismatch(found: &crate::NativeValue, target: &'static str) -> Self {
        BridgeError::Mismatch {
            found: found.kind_name(),
            target,
        }
    }
}
