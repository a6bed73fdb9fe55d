use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use framesql_engine::{
    AbortHandle, EngineError, EngineFactory, EnginePool, factory_for, load_frames,
    result_to_frame,
};
use framesql_gate::{AllowListPolicy, Gatekeeper};
use framesql_result::{Error, Result};
use framesql_schema::build_schema;
use framesql_types::Frame;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigError, SqlExpressionsConfig};
use crate::translate::{SqlTranslator, translate_checked};

/// One SQL expression to evaluate.
#[derive(Debug, Clone, Default)]
pub struct EvaluateRequest {
    /// RefID of the expression; names the output frame.
    pub ref_id: String,
    pub sql: String,
    /// Input frames. Each frame's RefID is a table the statement may read.
    pub frames: Vec<Frame>,
    /// Budget for loading and execution. Falls back to the configured default.
    pub time_limit: Option<Duration>,
    /// Maximum rows times fields over all inputs. Falls back to the configured default.
    pub input_cell_limit: Option<u64>,
    /// RefIDs whose upstream evaluation failed.
    pub failed_dependencies: Vec<String>,
}

impl EvaluateRequest {
    pub fn new(ref_id: impl Into<String>, sql: impl Into<String>, frames: Vec<Frame>) -> Self {
        EvaluateRequest {
            ref_id: ref_id.into(),
            sql: sql.into(),
            frames,
            ..EvaluateRequest::default()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_input_cell_limit(mut self, limit: u64) -> Self {
        self.input_cell_limit = Some(limit);
        self
    }

    pub fn with_failed_dependencies<I, S>(mut self, ref_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed_dependencies = ref_ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of an evaluation. Exactly one of `frame` and `error` is set.
#[derive(Debug)]
pub struct QueryResult {
    pub frame: Option<Frame>,
    pub executed_sql: String,
    pub error: Option<Error>,
}

impl QueryResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Frame> {
        match (self.frame, self.error) {
            (_, Some(err)) => Err(err),
            (Some(frame), None) => Ok(frame),
            (None, None) => Err(Error::invalid_query("evaluation produced no frame")),
        }
    }
}

/// SQL expressions service: a gatekeeper and a bounded pool of engines.
#[derive(Debug, Clone)]
pub struct SqlExpressions {
    config: Arc<SqlExpressionsConfig>,
    gatekeeper: Gatekeeper,
    pool: EnginePool,
}

impl SqlExpressions {
    pub fn new(config: SqlExpressionsConfig) -> std::result::Result<Self, ConfigError> {
        let factory = factory_for(config.backend, config.datafusion_options());
        Self::with_engine_factory(config, factory)
    }

    /// Evaluate on engines opened by `factory` instead of the configured backend.
    pub fn with_engine_factory(
        config: SqlExpressionsConfig,
        factory: Arc<dyn EngineFactory>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let policy = if config.extra_functions.is_empty() {
            AllowListPolicy::standard()
        } else {
            AllowListPolicy::builder()
                .allow_functions(&config.extra_functions)
                .build()
        };
        Ok(SqlExpressions {
            gatekeeper: Gatekeeper::new(policy, config.dialect),
            pool: EnginePool::new(factory, config.max_connections),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &SqlExpressionsConfig {
        &self.config
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }

    pub async fn evaluate(&self, request: EvaluateRequest) -> QueryResult {
        self.evaluate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Evaluate `request`, stopping with `cancel` as soon as `cancel` is triggered.
    pub async fn evaluate_with_cancel(
        &self,
        request: EvaluateRequest,
        cancel: CancellationToken,
    ) -> QueryResult {
        let ref_id = request.ref_id.clone();
        let executed_sql = request.sql.clone();
        match self.run(request, &cancel).await {
            Ok(frame) => QueryResult {
                frame: Some(frame),
                executed_sql,
                error: None,
            },
            Err(err) => QueryResult {
                frame: None,
                executed_sql,
                error: Some(err.with_ref_id(ref_id)),
            },
        }
    }

    /// Ask `translator` for SQL answering `question` over `frames`, and return it only
    /// if this service's gatekeeper accepts it.
    pub async fn translate(
        &self,
        translator: &dyn SqlTranslator,
        question: &str,
        frames: &[Frame],
    ) -> Result<String> {
        translate_checked(translator, &self.gatekeeper, question, frames).await
    }

    async fn run(&self, request: EvaluateRequest, cancel: &CancellationToken) -> Result<Frame> {
        let started = Instant::now();
        let EvaluateRequest {
            ref_id,
            sql,
            frames,
            time_limit,
            input_cell_limit,
            failed_dependencies,
        } = request;
        if sql.trim().is_empty() {
            return Err(Error::empty_query());
        }

        let cell_limit = input_cell_limit.unwrap_or(self.config.default_input_cell_limit);
        let cells = frames
            .iter()
            .map(Frame::cell_count)
            .fold(0u64, u64::saturating_add);
        if cells > cell_limit {
            return Err(Error::input_limit_exceeded(cells, cell_limit));
        }

        let time_limit = time_limit.unwrap_or_else(|| self.config.default_time_limit());
        let limits = Limits {
            deadline: started + time_limit,
            time_limit,
            cancel,
        };

        // Parsing, the policy walk and schema inference are CPU work; keep them off
        // the async workers.
        let frames = Arc::new(frames);
        let checked = {
            let gatekeeper = self.gatekeeper.clone();
            let sql = sql.clone();
            let frames = Arc::clone(&frames);
            blocking(move || {
                let (tables, schemas) =
                    rayon::join(|| gatekeeper.check(&sql), || build_schema(&frames));
                Ok((tables?, schemas?))
            })
        };
        let (tables, schemas) = limits.run(checked, None).await?;

        if let Some(table) = tables
            .iter()
            .find(|table| failed_dependencies.contains(table))
        {
            return Err(Error::failed_dependency(table.as_str()));
        }
        if let Some(table) = tables.iter().find(|table| !schemas.contains(table)) {
            return Err(Error::table_not_found(table.as_str()));
        }

        let engine = limits.run(self.pool.acquire(), None).await?;
        let abort = engine.abort_handle();
        let schemas = Arc::new(schemas);
        let loading = {
            let schemas = Arc::clone(&schemas);
            let frames = Arc::clone(&frames);
            let options = self.config.load_options();
            blocking(move || {
                let mut engine = engine;
                load_frames(&mut *engine, &schemas, &frames, &options)?;
                Ok(engine)
            })
        };
        // On timeout or cancel the load task keeps the engine and closes it once the
        // interrupted load returns.
        let mut engine = limits.run(loading, Some(&abort)).await?;

        let result = limits
            .run(
                async { engine.query(&sql).await.map_err(EngineError::categorize) },
                Some(&abort),
            )
            .await?;
        let engine_name = engine.name();
        drop(engine);

        let rows = result.row_count();
        let frame = result_to_frame(&ref_id, result, &sql, schemas.notices())?;
        info!(
            ref_id = %ref_id,
            engine = engine_name,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "evaluated sql expression"
        );
        Ok(frame)
    }
}

/// Run `work` on the blocking thread pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| Error::invalid_query("evaluation task failed").with_source(err))?
}

/// Deadline and cancellation of one evaluation.
struct Limits<'a> {
    deadline: Instant,
    time_limit: Duration,
    cancel: &'a CancellationToken,
}

impl Limits<'_> {
    /// Drive `future` until it completes, the deadline passes or the evaluation is
    /// cancelled. In the latter two cases `abort` is triggered before returning.
    async fn run<T>(
        &self,
        future: impl Future<Output = Result<T>>,
        abort: Option<&AbortHandle>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled(abort)),
            _ = tokio::time::sleep_until(self.deadline) => Err(self.timed_out(abort)),
            result = future => result,
        }
    }

    fn cancelled(&self, abort: Option<&AbortHandle>) -> Error {
        if let Some(abort) = abort {
            abort.abort();
        }
        warn!("sql expression cancelled");
        Error::cancel()
    }

    fn timed_out(&self, abort: Option<&AbortHandle>) -> Error {
        if let Some(abort) = abort {
            abort.abort();
        }
        warn!(
            time_limit_ms = self.time_limit.as_millis() as u64,
            "sql expression timed out"
        );
        Error::timeout(self.time_limit)
    }
}
