use crate::adapters::{AdapterCore, LogLevel, RequestOptions};
use crate::app::sources::{
    array_at, ensure_filter_matched, id_string, score, skips, str_at, team_filter, RunStats,
};
use crate::config::adapter::AdapterConfig;
use crate::config::toml_config::EspnSourceConfig;
use crate::core::persistence::{persist_batch, publish_batch};
use crate::core::{SourceAdapter, Storage};
use crate::domain::model::{
    AdapterReport, DiscoveredTeam, Discovery, EntityType, Game, NormalizedBatch, PayloadKind,
    PersistSummary, Player, PublishSummary, RawPayload, Standing, Team, ValidationReport,
};
use crate::domain::services::validate_batch;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use tokio::sync::Mutex;

const SOURCE: &str = "espn";

/// ESPN's public site API for the NFL.
pub struct EspnAdapter<S: Storage> {
    core: AdapterCore,
    source: EspnSourceConfig,
    storage: S,
    discovered: Vec<DiscoveredTeam>,
    teams_payload: Option<RawPayload>,
    stats: Mutex<RunStats>,
}

/// ESPN 的時間常省略秒數，例如 `2024-09-08T17:00Z`
fn parse_espn_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ").map(|d| d.and_utc()))
        .ok()
}

fn stat_value(stats: &[Value], name: &str) -> Option<f64> {
    stats
        .iter()
        .find(|s| s.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|s| s.get("value"))
        .and_then(Value::as_f64)
}

impl<S: Storage> EspnAdapter<S> {
    pub fn new(config: AdapterConfig, source: EspnSourceConfig, storage: S) -> Result<Self> {
        source.validate()?;
        Ok(Self {
            core: AdapterCore::new("EspnAdapter", config)?,
            source,
            storage,
            discovered: Vec::new(),
            teams_payload: None,
            stats: Mutex::new(RunStats::default()),
        })
    }

    pub fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.source.base_url.trim_end_matches('/'), path)
    }

    fn site(&self, path: &str) -> String {
        format!("{}{}", self.source.site_url.trim_end_matches('/'), path)
    }

    async fn fetch(
        &self,
        kind: PayloadKind,
        url: String,
        context: Option<String>,
    ) -> Result<RawPayload> {
        let body = self.core.get_json(&url, &RequestOptions::get()).await?;
        Ok(RawPayload {
            kind,
            source: SOURCE.to_string(),
            url,
            fetched_at: Utc::now(),
            context,
            body,
        })
    }

    fn wanted_teams(&self) -> Option<HashSet<&str>> {
        team_filter(&self.source.teams, &self.discovered)
    }

    fn team_entries(raw: &RawPayload) -> Result<Vec<&Value>> {
        let entries = array_at(raw, "/sports/0/leagues/0/teams")?;
        Ok(entries.iter().filter_map(|e| e.get("team")).collect())
    }

    fn normalize_teams(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let wanted = self.wanted_teams();
        for team in Self::team_entries(raw)? {
            let Some(id) = team.get("id").and_then(id_string) else {
                continue;
            };
            if skips(&wanted, &id) {
                continue;
            }

            let clubhouse = team
                .get("links")
                .and_then(Value::as_array)
                .and_then(|links| {
                    links.iter().find(|link| {
                        link.get("rel")
                            .and_then(Value::as_array)
                            .is_some_and(|rel| rel.iter().any(|r| r == "clubhouse"))
                    })
                })
                .and_then(|link| str_at(link, "/href"));
            if let Some(url) = clubhouse {
                batch
                    .linkouts
                    .push(self.core.create_linkout(EntityType::Team, &id, SOURCE, &url));
            }

            batch.teams.push(Team {
                external_ref: self.core.generate_external_ref(SOURCE, &id),
                id,
                source: SOURCE.to_string(),
                abbreviation: str_at(team, "/abbreviation").unwrap_or_default(),
                name: str_at(team, "/displayName").unwrap_or_default(),
                location: str_at(team, "/location"),
                league: Some("NFL".to_string()),
                division: None,
                venue: str_at(team, "/venue/fullName"),
            });
        }
        Ok(())
    }

    fn normalize_roster(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let team_id = raw.context.clone().unwrap_or_default();
        // athletes 依 offense / defense / specialTeam 分組
        for group in array_at(raw, "/athletes")? {
            let Some(items) = group.get("items").and_then(Value::as_array) else {
                continue;
            };
            for athlete in items {
                let Some(id) = athlete.get("id").and_then(id_string) else {
                    continue;
                };
                let url = self.site(&format!("/nfl/player/_/id/{}", id));
                batch
                    .linkouts
                    .push(self.core.create_linkout(EntityType::Player, &id, SOURCE, &url));

                batch.players.push(Player {
                    external_ref: self.core.generate_external_ref(SOURCE, &id),
                    id,
                    source: SOURCE.to_string(),
                    team_id: team_id.clone(),
                    full_name: str_at(athlete, "/fullName").unwrap_or_default(),
                    jersey_number: str_at(athlete, "/jersey"),
                    position: str_at(athlete, "/position/abbreviation"),
                });
            }
        }
        Ok(())
    }

    fn normalize_scoreboard(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let wanted = self.wanted_teams();
        for event in array_at(raw, "/events")? {
            let Some(id) = event.get("id").and_then(id_string) else {
                continue;
            };
            let competitors = event
                .pointer("/competitions/0/competitors")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let side = |home_away: &str| {
                competitors
                    .iter()
                    .find(|c| c.get("homeAway").and_then(Value::as_str) == Some(home_away))
            };
            let (Some(home), Some(away)) = (side("home"), side("away")) else {
                continue;
            };
            let home_team_id = home.pointer("/team/id").and_then(id_string).unwrap_or_default();
            let away_team_id = away.pointer("/team/id").and_then(id_string).unwrap_or_default();
            if skips(&wanted, &home_team_id) && skips(&wanted, &away_team_id) {
                continue;
            }

            let url = self.site(&format!("/nfl/game/_/gameId/{}", id));
            batch
                .linkouts
                .push(self.core.create_linkout(EntityType::Game, &id, SOURCE, &url));

            batch.games.push(Game {
                external_ref: self.core.generate_external_ref(SOURCE, &id),
                id,
                source: SOURCE.to_string(),
                scheduled_at: str_at(event, "/date").and_then(|d| parse_espn_date(&d)),
                status: str_at(event, "/status/type/description")
                    .unwrap_or_else(|| "Unknown".to_string()),
                home_team_id,
                away_team_id,
                home_score: score(home.get("score")),
                away_score: score(away.get("score")),
            });
        }
        Ok(())
    }

    fn normalize_standings(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let wanted = self.wanted_teams();
        for conference in array_at(raw, "/children")? {
            let group = str_at(conference, "/name").unwrap_or_default();
            let Some(entries) = conference
                .pointer("/standings/entries")
                .and_then(Value::as_array)
            else {
                continue;
            };

            for entry in entries {
                let Some(team_id) = entry.pointer("/team/id").and_then(id_string) else {
                    continue;
                };
                if skips(&wanted, &team_id) {
                    continue;
                }
                let stats = entry
                    .get("stats")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let count = |name: &str| stat_value(stats, name).map(|v| v as u32).unwrap_or(0);

                batch.standings.push(Standing {
                    team_id,
                    source: SOURCE.to_string(),
                    group: group.clone(),
                    wins: count("wins"),
                    losses: count("losses"),
                    ties: count("ties"),
                    win_pct: stat_value(stats, "winPercent"),
                    games_back: stat_value(stats, "gamesBehind"),
                    rank: stat_value(stats, "playoffSeed").map(|v| v as u32),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> SourceAdapter for EspnAdapter<S> {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn discover(&mut self) -> Result<Discovery> {
        let allowed = self
            .core
            .check_robots_txt(self.source.robots_base_url())
            .await
            .is_allowed();
        self.stats.lock().await.robots_allowed = Some(allowed);
        if !allowed {
            self.core.log(LogLevel::Warn, "robots.txt disallows fetching", None);
            return Ok(Discovery {
                robots_allowed: false,
                teams: Vec::new(),
            });
        }

        let payload = self.fetch(PayloadKind::Teams, self.api("/teams"), None).await?;

        let filter: HashSet<String> = self
            .source
            .teams
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect();
        let mut teams = Vec::new();
        for team in Self::team_entries(&payload)? {
            let (Some(id), Some(abbreviation)) =
                (team.get("id").and_then(id_string), str_at(team, "/abbreviation"))
            else {
                continue;
            };
            if !filter.is_empty() && !filter.contains(&abbreviation.to_ascii_uppercase()) {
                continue;
            }
            teams.push(DiscoveredTeam {
                id,
                abbreviation,
                name: str_at(team, "/displayName").unwrap_or_default(),
            });
        }

        ensure_filter_matched("espn.teams", &self.source.teams, &teams)?;

        self.core.log(
            LogLevel::Info,
            "Discovered teams",
            Some(&json!({ "count": teams.len() })),
        );
        self.discovered = teams.clone();
        self.teams_payload = Some(payload);

        Ok(Discovery {
            robots_allowed: true,
            teams,
        })
    }

    async fn fetch_teams(&self) -> Result<Vec<RawPayload>> {
        if let Some(payload) = &self.teams_payload {
            return Ok(vec![payload.clone()]);
        }
        Ok(vec![
            self.fetch(PayloadKind::Teams, self.api("/teams"), None).await?,
        ])
    }

    async fn fetch_players(&self) -> Result<Vec<RawPayload>> {
        let mut payloads = Vec::with_capacity(self.discovered.len());
        for team in &self.discovered {
            let url = self.api(&format!("/teams/{}/roster", team.id));
            payloads.push(
                self.fetch(PayloadKind::Roster, url, Some(team.id.clone()))
                    .await?,
            );
        }
        Ok(payloads)
    }

    async fn fetch_games(&self) -> Result<Vec<RawPayload>> {
        // scoreboard 一次回傳本週所有比賽
        Ok(vec![
            self.fetch(PayloadKind::Schedule, self.api("/scoreboard"), None)
                .await?,
        ])
    }

    async fn fetch_standings(&self) -> Result<Vec<RawPayload>> {
        let url = format!(
            "{}/standings",
            self.source.standings_url.trim_end_matches('/')
        );
        Ok(vec![self.fetch(PayloadKind::Standings, url, None).await?])
    }

    async fn normalize(&self, raw: &[RawPayload]) -> Result<NormalizedBatch> {
        let mut batch = NormalizedBatch::new(SOURCE);

        for payload in raw {
            match payload.kind {
                PayloadKind::Teams => self.normalize_teams(payload, &mut batch)?,
                PayloadKind::Roster => self.normalize_roster(payload, &mut batch)?,
                PayloadKind::Schedule => self.normalize_scoreboard(payload, &mut batch)?,
                PayloadKind::Standings => self.normalize_standings(payload, &mut batch)?,
            }
        }

        self.stats.lock().await.record_batch(&batch);
        Ok(batch)
    }

    async fn validate(&self, data: &NormalizedBatch) -> Result<ValidationReport> {
        let mut report = validate_batch(data);
        for game in &data.games {
            if game.status == "Final" && (game.home_score.is_none() || game.away_score.is_none()) {
                report.push(EntityType::Game, &game.id, "final game without score");
            }
        }
        self.stats.lock().await.validation_issues = report.issues.len();
        Ok(report)
    }

    async fn persist(&self, data: &NormalizedBatch) -> Result<PersistSummary> {
        let summary = persist_batch(&self.storage, data).await?;
        self.stats
            .lock()
            .await
            .files_written
            .extend(summary.files.iter().cloned());
        Ok(summary)
    }

    async fn publish(&self, data: &NormalizedBatch) -> Result<PublishSummary> {
        let mut linkouts = data.linkouts.clone();
        if self.core.config().verify_linkouts {
            for linkout in &mut linkouts {
                self.core.verify_linkout(linkout).await;
            }
        }
        let summary = publish_batch(&self.storage, data, &linkouts).await?;
        self.stats
            .lock()
            .await
            .files_written
            .push(summary.manifest_path.clone());
        Ok(summary)
    }

    async fn report(&self) -> Result<AdapterReport> {
        let report = self.stats.lock().await.to_report(&self.core, SOURCE);
        self.core.log(
            LogLevel::Info,
            "Run report",
            Some(&serde_json::to_value(&report)?),
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_espn_date() {
        let short = parse_espn_date("2024-09-08T17:00Z").unwrap();
        assert_eq!(short.to_rfc3339(), "2024-09-08T17:00:00+00:00");

        let full = parse_espn_date("2024-09-08T17:00:00Z").unwrap();
        assert_eq!(short, full);

        assert!(parse_espn_date("Sunday").is_none());
    }

    #[test]
    fn test_stat_value() {
        let stats = vec![
            json!({"name": "wins", "value": 12.0}),
            json!({"name": "winPercent", "value": 0.706}),
        ];
        assert_eq!(stat_value(&stats, "wins"), Some(12.0));
        assert_eq!(stat_value(&stats, "losses"), None);
    }
}
