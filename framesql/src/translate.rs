use async_trait::async_trait;
use framesql_gate::Gatekeeper;
use framesql_result::Result;
use framesql_schema::build_schema;
use framesql_types::Frame;
use tracing::debug;

/// Turns a natural-language question into SQL, typically by calling an external
/// assistant. Its output is untrusted.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    /// `schema` has one `table(column TYPE, ...)` line per table the SQL may read.
    async fn translate(&self, question: &str, schema: &str) -> Result<String>;
}

/// Translate `question` over the tables of `frames`, returning the SQL only once
/// `gatekeeper` has accepted it.
pub async fn translate_checked(
    translator: &dyn SqlTranslator,
    gatekeeper: &Gatekeeper,
    question: &str,
    frames: &[Frame],
) -> Result<String> {
    let schema = build_schema(frames)?.describe();
    let sql = translator.translate(question, &schema).await?;
    debug!(sql = %sql, "translated question");
    gatekeeper.allow(&sql)?;
    Ok(sql)
}
