use crate::{BucketViewResult, TableResult};
use async_trait::async_trait;

/// The one capability the browser needs from a query connection.
///
/// Implementations receive query text (see [`Query`](crate::Query) for the shapes the
/// browser issues) and answer with tabular data. Authentication, transport and caching
/// are the implementation's business.
#[async_trait]
pub trait QueryBridge: Send + Sync {
    /// Short engine name for logging.
    fn name(&self) -> &str;

    /// Evaluates a query. Fails on unreadable sources, unsupported SQL or engine errors.
    async fn evaluate_query(&self, query: &str) -> BucketViewResult<TableResult>;

    /// Makes an in-memory CSV buffer queryable under `name` (used for dropped files).
    ///
    /// Registering the same name again replaces the previous buffer.
    async fn register_buffer(&self, name: &str, bytes: Vec<u8>) -> BucketViewResult<()>;

    /// Forgets a buffer registered under `name`. Returns `false` if there was none.
    async fn unregister_buffer(&self, name: &str) -> BucketViewResult<bool>;
}
