use crate::core::{NormalizedBatch, PersistSummary, PublishSummary, Storage};
use crate::domain::model::Linkout;
use crate::utils::error::{AdapterError, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct TeamRow<'a> {
    id: &'a str,
    abbreviation: &'a str,
    name: &'a str,
    location: &'a str,
    league: &'a str,
    division: &'a str,
    venue: &'a str,
    last_updated: String,
}

#[derive(Serialize)]
struct PlayerRow<'a> {
    id: &'a str,
    team_id: &'a str,
    full_name: &'a str,
    jersey_number: &'a str,
    position: &'a str,
    last_updated: String,
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AdapterError::IoError(e.into_error()))
}

/// 把正規化後的批次寫成 `<source>/teams.csv`、`players.csv`、`games.json`、`standings.json`
pub async fn persist_batch<S: Storage>(storage: &S, batch: &NormalizedBatch) -> Result<PersistSummary> {
    let mut summary = PersistSummary::default();
    let prefix = &batch.source;

    let teams = to_csv(batch.teams.iter().map(|t| TeamRow {
        id: &t.id,
        abbreviation: &t.abbreviation,
        name: &t.name,
        location: t.location.as_deref().unwrap_or_default(),
        league: t.league.as_deref().unwrap_or_default(),
        division: t.division.as_deref().unwrap_or_default(),
        venue: t.venue.as_deref().unwrap_or_default(),
        last_updated: t
            .external_ref
            .last_updated
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    }))?;
    write(storage, &mut summary, &format!("{}/teams.csv", prefix), &teams).await?;

    let players = to_csv(batch.players.iter().map(|p| PlayerRow {
        id: &p.id,
        team_id: &p.team_id,
        full_name: &p.full_name,
        jersey_number: p.jersey_number.as_deref().unwrap_or_default(),
        position: p.position.as_deref().unwrap_or_default(),
        last_updated: p
            .external_ref
            .last_updated
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    }))?;
    write(storage, &mut summary, &format!("{}/players.csv", prefix), &players).await?;

    let games = serde_json::to_vec_pretty(&batch.games)?;
    write(storage, &mut summary, &format!("{}/games.json", prefix), &games).await?;

    let standings = serde_json::to_vec_pretty(&batch.standings)?;
    write(storage, &mut summary, &format!("{}/standings.json", prefix), &standings).await?;

    summary.records_written =
        batch.teams.len() + batch.players.len() + batch.games.len() + batch.standings.len();

    tracing::debug!(
        "Persisted {} records into {} files",
        summary.records_written,
        summary.files.len()
    );
    Ok(summary)
}

async fn write<S: Storage>(
    storage: &S,
    summary: &mut PersistSummary,
    path: &str,
    data: &[u8],
) -> Result<()> {
    storage.write_file(path, data).await?;
    summary.files.push(storage.location(path));
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    source: &'a str,
    published_at: String,
    teams: usize,
    players: usize,
    games: usize,
    standings: usize,
    linkouts: usize,
    active_linkouts: usize,
}

/// 發布 linkouts 與 manifest，下游只讀 manifest 判斷這批資料是否完整
pub async fn publish_batch<S: Storage>(
    storage: &S,
    batch: &NormalizedBatch,
    linkouts: &[Linkout],
) -> Result<PublishSummary> {
    let prefix = &batch.source;
    let active = linkouts.iter().filter(|l| l.is_active).count();

    let linkouts_path = format!("{}/linkouts.json", prefix);
    storage
        .write_file(&linkouts_path, &serde_json::to_vec_pretty(linkouts)?)
        .await?;

    let manifest = Manifest {
        source: prefix,
        published_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        teams: batch.teams.len(),
        players: batch.players.len(),
        games: batch.games.len(),
        standings: batch.standings.len(),
        linkouts: linkouts.len(),
        active_linkouts: active,
    };
    let manifest_path = format!("{}/manifest.json", prefix);
    storage
        .write_file(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)
        .await?;

    Ok(PublishSummary {
        manifest_path: storage.location(&manifest_path),
        linkouts_published: linkouts.len(),
        linkouts_active: active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EntityType, ExternalRef, Player, Team};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    fn sample_batch() -> NormalizedBatch {
        let external = |id: &str| ExternalRef {
            source: "mlb".to_string(),
            id: id.to_string(),
            last_updated: Utc::now(),
        };
        let mut batch = NormalizedBatch::new("mlb");
        batch.teams.push(Team {
            id: "138".to_string(),
            source: "mlb".to_string(),
            abbreviation: "STL".to_string(),
            name: "St. Louis Cardinals".to_string(),
            location: Some("St. Louis".to_string()),
            league: Some("National League".to_string()),
            division: None,
            venue: Some("Busch Stadium".to_string()),
            external_ref: external("138"),
        });
        batch.players.push(Player {
            id: "571448".to_string(),
            source: "mlb".to_string(),
            team_id: "138".to_string(),
            full_name: "Nolan Arenado".to_string(),
            jersey_number: Some("28".to_string()),
            position: None,
            external_ref: external("571448"),
        });
        batch
    }

    #[tokio::test]
    async fn test_persist_writes_csv_and_json() {
        let storage = MockStorage::default();
        let summary = persist_batch(&storage, &sample_batch()).await.unwrap();

        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.files.len(), 4);
        assert!(summary.files.contains(&"mem://mlb/teams.csv".to_string()));

        let teams = String::from_utf8(storage.get_file("mlb/teams.csv").await.unwrap()).unwrap();
        let mut lines = teams.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,abbreviation,name,location,league,division,venue,last_updated"
        );
        assert!(lines.next().unwrap().starts_with("138,STL,St. Louis Cardinals,St. Louis,"));

        let players =
            String::from_utf8(storage.get_file("mlb/players.csv").await.unwrap()).unwrap();
        assert!(players.contains("571448,138,Nolan Arenado,28,,"));

        let games: serde_json::Value =
            serde_json::from_slice(&storage.get_file("mlb/games.json").await.unwrap()).unwrap();
        assert_eq!(games, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_publish_writes_manifest() {
        let storage = MockStorage::default();
        let batch = sample_batch();
        let mut dead = Linkout {
            entity_type: EntityType::Team,
            entity_id: "138".to_string(),
            source: "mlb".to_string(),
            url: "https://www.mlb.com/cardinals".to_string(),
            verified: false,
            last_checked: Utc::now(),
            is_active: true,
        };
        let alive = dead.clone();
        dead.deactivate();

        let summary = publish_batch(&storage, &batch, &[alive, dead]).await.unwrap();

        assert_eq!(summary.linkouts_published, 2);
        assert_eq!(summary.linkouts_active, 1);
        assert_eq!(summary.manifest_path, "mem://mlb/manifest.json");

        let manifest: serde_json::Value =
            serde_json::from_slice(&storage.get_file("mlb/manifest.json").await.unwrap()).unwrap();
        assert_eq!(manifest["source"], "mlb");
        assert_eq!(manifest["teams"], 1);
        assert_eq!(manifest["activeLinkouts"], 1);
    }
}
