//! Bounded pool of per-evaluation engines.
//!
//! An engine is never shared: every acquisition opens a fresh instance through the
//! pool's [`EngineFactory`] and closes it when the [`PooledEngine`] is dropped. The
//! pool only bounds how many exist at once. When all permits are taken,
//! [`EnginePool::acquire`] waits for one to be released.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;

use framesql_result::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::EngineResult;
use crate::fusion::{DataFusionEngine, DataFusionOptions};
use crate::sqlite::SqliteEngine;

/// Default number of engines that may be open at once.
pub const DEFAULT_MAX_ENGINES: usize = 2;

/// Opens a fresh, empty engine.
pub trait EngineFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn open(&self) -> EngineResult<Box<dyn Engine>>;
}

/// Which embedded engine evaluations run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    DataFusion,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::DataFusion => "datafusion",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "datafusion" => Ok(BackendKind::DataFusion),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataFusionFactory {
    pub options: DataFusionOptions,
}

impl EngineFactory for DataFusionFactory {
    fn name(&self) -> &'static str {
        "datafusion"
    }

    fn open(&self) -> EngineResult<Box<dyn Engine>> {
        Ok(Box::new(DataFusionEngine::new(self.options)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFactory;

impl EngineFactory for SqliteFactory {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn open(&self) -> EngineResult<Box<dyn Engine>> {
        Ok(Box::new(SqliteEngine::open_in_memory()?))
    }
}

pub fn factory_for(backend: BackendKind, options: DataFusionOptions) -> Arc<dyn EngineFactory> {
    match backend {
        BackendKind::DataFusion => Arc::new(DataFusionFactory { options }),
        BackendKind::Sqlite => Arc::new(SqliteFactory),
    }
}

#[derive(Clone)]
pub struct EnginePool {
    permits: Arc<Semaphore>,
    factory: Arc<dyn EngineFactory>,
}

impl EnginePool {
    pub fn new(factory: Arc<dyn EngineFactory>, max_engines: usize) -> Self {
        EnginePool {
            permits: Arc::new(Semaphore::new(max_engines.max(1))),
            factory,
        }
    }

    pub fn factory(&self) -> &Arc<dyn EngineFactory> {
        &self.factory
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit, then open a fresh engine under it.
    pub async fn acquire(&self) -> Result<PooledEngine> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|err| Error::cancel().with_source(err))?;
        let engine = self.factory.open().map_err(|err| err.categorize())?;
        debug!(
            engine = engine.name(),
            available = self.permits.available_permits(),
            "acquired engine"
        );
        Ok(PooledEngine {
            engine: Some(engine),
            _permit: permit,
        })
    }
}

impl fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnginePool")
            .field("factory", &self.factory.name())
            .field("available", &self.available())
            .finish()
    }
}

/// An open engine holding one pool permit. Dropping it closes the engine and
/// releases the permit.
pub struct PooledEngine {
    engine: Option<Box<dyn Engine>>,
    _permit: OwnedSemaphorePermit,
}

impl PooledEngine {
    /// Close the engine now and report the outcome.
    pub fn close(mut self) -> EngineResult<()> {
        match self.engine.take() {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }
}

impl Deref for PooledEngine {
    type Target = dyn Engine;

    fn deref(&self) -> &Self::Target {
        // Only `close` and `drop` take the engine, and both consume `self`.
        match &self.engine {
            Some(engine) => engine.as_ref(),
            None => unreachable!("pooled engine used after close"),
        }
    }
}

impl DerefMut for PooledEngine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.engine {
            Some(engine) => engine.as_mut(),
            None => unreachable!("pooled engine used after close"),
        }
    }
}

impl Drop for PooledEngine {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            let name = engine.name();
            if let Err(err) = engine.close() {
                warn!(engine = name, error = %err, "failed to close engine");
            }
        }
    }
}
