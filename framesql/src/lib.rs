//! SQL expressions over frames.
//!
//! A [`SqlExpressions`] service evaluates one restricted SQL statement against a set of
//! input frames, each frame exposed as a table named after its RefID:
//!
//! 1. the statement is parsed and checked against the allow-list while the table
//!    schemas are derived from the frames;
//! 2. every table the statement reads must be an input, and none may be a failed
//!    upstream result;
//! 3. a fresh engine is taken from a bounded pool, the frames are loaded, and the
//!    statement runs under the request's time limit;
//! 4. the result comes back as a frame named after the expression's RefID.
//!
//! Failures at any step are reported as a categorized [`Error`] in the returned
//! [`QueryResult`].
//!
//! ```no_run
//! # async fn demo(frames: Vec<framesql::Frame>) -> Result<(), Box<dyn std::error::Error>> {
//! use framesql::{EvaluateRequest, SqlExpressions, SqlExpressionsConfig};
//!
//! let service = SqlExpressions::new(SqlExpressionsConfig::default())?;
//! let request = EvaluateRequest::new("B", "SELECT host, AVG(value) FROM A GROUP BY host", frames);
//! let frame = service.evaluate(request).await.into_result()?;
//! # let _ = frame;
//! # Ok(())
//! # }
//! ```
//!
//! [`allow_query`] and [`tables_list`] check SQL without loading anything.

pub mod config;
pub mod evaluate;
pub mod translate;

pub use config::{ConfigError, SqlExpressionsConfig};
pub use evaluate::{EvaluateRequest, QueryResult, SqlExpressions};
pub use translate::{SqlTranslator, translate_checked};

pub use framesql_engine::{BackendKind, EngineFactory};
pub use framesql_gate::{AllowListPolicy, Gatekeeper, SqlDialect, allow_query, tables_list};
pub use framesql_result::{Error, ErrorKind, Result};
pub use framesql_types::{Field, FieldType, FieldValues, Frame, FrameMeta, Notice};
pub use tokio_util::sync::CancellationToken;
