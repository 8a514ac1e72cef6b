use crate::core::SourceAdapter;
use crate::domain::model::AdapterReport;
use crate::utils::error::{AdapterError, Result};

/// Drives an adapter through the conventional lifecycle order.
pub struct AdapterRunner<A: SourceAdapter> {
    adapter: A,
}

impl<A: SourceAdapter> AdapterRunner<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn into_inner(self) -> A {
        self.adapter
    }

    pub async fn run(&mut self) -> Result<AdapterReport> {
        let name = self.adapter.name().to_string();
        tracing::info!("🚀 Starting ingestion for {}", name);

        // Discover
        let discovery = self.adapter.discover().await?;
        if !discovery.robots_allowed {
            tracing::warn!("🚫 {}: robots.txt disallows fetching, stopping", name);
            return Err(AdapterError::RobotsDisallowed { adapter: name });
        }
        tracing::info!("🔎 {}: discovered {} teams", name, discovery.teams.len());

        // Fetch
        let mut raw = self.adapter.fetch_teams().await?;
        raw.extend(self.adapter.fetch_players().await?);
        raw.extend(self.adapter.fetch_games().await?);
        raw.extend(self.adapter.fetch_standings().await?);
        tracing::info!("📥 {}: fetched {} payloads", name, raw.len());

        // Normalize + validate
        let batch = self.adapter.normalize(&raw).await?;
        let validation = self.adapter.validate(&batch).await?;
        if !validation.is_valid() {
            for issue in &validation.issues {
                tracing::error!("❌ {}: {}", name, issue);
            }
            return Err(AdapterError::ValidationError {
                message: format!(
                    "{} produced {} invalid records",
                    name,
                    validation.issues.len()
                ),
            });
        }

        // Persist + publish
        let persisted = self.adapter.persist(&batch).await?;
        tracing::info!("💾 {}: wrote {} files", name, persisted.files.len());
        let published = self.adapter.publish(&batch).await?;
        tracing::info!(
            "📤 {}: published {} linkouts ({} active)",
            name,
            published.linkouts_published,
            published.linkouts_active
        );

        let report = self.adapter.report().await?;
        tracing::info!(
            "✅ {}: {} teams, {} players, {} games, {} standings ({} requests, {} retries)",
            name,
            report.teams,
            report.players,
            report.games,
            report.standings,
            report.requests,
            report.retries
        );
        Ok(report)
    }
}
