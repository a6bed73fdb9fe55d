//! Error types and result definitions for the framesql crates.
//!
//! Every crate in the workspace returns [`Result<T>`] at its public boundary. Failures
//! are reported as a single [`Error`] value whose [`ErrorKind`] is drawn from a small,
//! closed taxonomy. The kind string is stable and intended for metrics and alerting,
//! while the rendered message is safe to show to the end user who wrote the query.
//!
//! # Error Philosophy
//!
//! Lower layers (the type bridge, the embedded engines, the SQL parser) keep their own
//! narrow error types. Those never cross a component boundary: they are wrapped into an
//! [`Error`] that remembers the original cause for programmatic inspection through
//! [`std::error::Error::source`].
//!
//! # Error Kinds
//!
//! - **Lookup failures**: [`ErrorKind::TableNotFound`], [`ErrorKind::ColumnNotFound`],
//!   [`ErrorKind::FunctionNotFound`]
//! - **Rejected input**: [`ErrorKind::EmptyQuery`], [`ErrorKind::InvalidQuery`],
//!   [`ErrorKind::BlockedNodeOrFunc`], [`ErrorKind::InputLimitExceeded`]
//! - **Data conversion**: [`ErrorKind::InputConversion`],
//!   [`ErrorKind::DuplicateStringColumns`]
//! - **Execution control**: [`ErrorKind::Timeout`], [`ErrorKind::Cancel`],
//!   [`ErrorKind::FailedDependency`]

pub mod error;
pub mod kind;
pub mod result;

pub use error::{BoxError, Error};
pub use kind::ErrorKind;
pub use result::Result;
