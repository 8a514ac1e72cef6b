use crate::domain::model::{
    AdapterReport, Discovery, NormalizedBatch, PersistSummary, PublishSummary, RawPayload,
    ValidationReport,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 寫入後的完整位置，給報表使用
    fn location(&self, path: &str) -> String;
}

/// Lifecycle every external sports-data source implements.
///
/// The conventional order is `discover → fetch_* → normalize → validate →
/// persist → publish → report`. Nothing here enforces that order;
/// [`AdapterRunner`](crate::core::runner::AdapterRunner) follows it, and
/// callers driving an adapter by hand must honor it themselves.
///
/// None of the operations has a default body, so an adapter that leaves
/// one out is rejected at compile time:
///
/// ```compile_fail
/// use async_trait::async_trait;
/// use blaze_ingest::domain::model::Discovery;
/// use blaze_ingest::domain::ports::SourceAdapter;
/// use blaze_ingest::Result;
///
/// struct HalfBuilt;
///
/// #[async_trait]
/// impl SourceAdapter for HalfBuilt {
///     fn name(&self) -> &str {
///         "half-built"
///     }
///
///     async fn discover(&mut self) -> Result<Discovery> {
///         Ok(Discovery { robots_allowed: true, teams: vec![] })
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Checks robots.txt and finds the entities later fetches iterate over.
    async fn discover(&mut self) -> Result<Discovery>;
    async fn fetch_teams(&self) -> Result<Vec<RawPayload>>;
    async fn fetch_players(&self) -> Result<Vec<RawPayload>>;
    async fn fetch_games(&self) -> Result<Vec<RawPayload>>;
    async fn fetch_standings(&self) -> Result<Vec<RawPayload>>;
    async fn normalize(&self, raw: &[RawPayload]) -> Result<NormalizedBatch>;
    async fn validate(&self, data: &NormalizedBatch) -> Result<ValidationReport>;
    async fn persist(&self, data: &NormalizedBatch) -> Result<PersistSummary>;
    async fn publish(&self, data: &NormalizedBatch) -> Result<PublishSummary>;
    async fn report(&self) -> Result<AdapterReport>;
}
