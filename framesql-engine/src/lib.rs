//! Embedded query engines for framesql.
//!
//! An evaluation drives one [`Engine`] through a fixed sequence: tables are created
//! from the [`SchemaSet`](framesql_schema::SchemaSet), frames are streamed in by
//! [`load_frames`], the query runs, and [`result_to_frame`] turns the result back into
//! a frame. Two backends implement the trait:
//!
//! - [`DataFusionEngine`]: an in-memory DataFusion session over Arrow `MemTable`s.
//!   Arrow builders take NULLs directly.
//! - [`SqliteEngine`]: an in-memory SQLite connection. Queries run on the blocking
//!   pool and can be interrupted; `UPDATE` is available for the NULL placeholder
//!   rewrite.
//!
//! Engines are handed out by an [`EnginePool`] that caps how many exist at once.
//! Backend errors stay inside this crate as [`EngineError`] and are sorted into the
//! public taxonomy by [`EngineError::categorize`].

pub mod convert;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod loader;
pub mod pool;
pub mod sqlite;

pub use convert::result_to_frame;
pub use engine::{
    AbortHandle, Appender, DUAL_TABLE, Engine, EngineCapabilities, ResultColumn, ResultSet,
};
pub use error::{EngineError, EngineResult};
pub use fusion::{DataFusionEngine, DataFusionOptions};
pub use loader::{LoadOptions, LoadReport, load_frames};
pub use pool::{
    BackendKind, DEFAULT_MAX_ENGINES, DataFusionFactory, EngineFactory, EnginePool,
    PooledEngine, SqliteFactory, factory_for,
};
pub use sqlite::{SqliteDdl, SqliteEngine};
