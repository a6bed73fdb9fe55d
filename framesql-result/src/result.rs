use crate::error::Error;

/// Result type alias used throughout framesql.
///
/// Shorthand for `std::result::Result<T, Error>`; every fallible public operation in the
/// workspace returns this type.
pub type Result<T> = std::result::Result<T, Error>;
