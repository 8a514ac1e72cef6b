use crate::adapters::{AdapterCore, LogLevel, RequestOptions};
use crate::app::sources::{
    array_at, ensure_filter_matched, id_string, score, skips, str_at, team_filter, RunStats,
};
use crate::config::adapter::AdapterConfig;
use crate::config::toml_config::MlbSourceConfig;
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
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use tokio::sync::Mutex;

const SOURCE: &str = "mlb";
const SPORT_ID: u32 = 1;
/// American League, National League
const LEAGUE_IDS: &str = "103,104";

/// MLB Stats API (`statsapi.mlb.com/api/v1`).
pub struct MlbStatsAdapter<S: Storage> {
    core: AdapterCore,
    source: MlbSourceConfig,
    storage: S,
    discovered: Vec<DiscoveredTeam>,
    teams_payload: Option<RawPayload>,
    stats: Mutex<RunStats>,
}

impl<S: Storage> MlbStatsAdapter<S> {
    pub fn new(config: AdapterConfig, source: MlbSourceConfig, storage: S) -> Result<Self> {
        source.validate()?;
        Ok(Self {
            core: AdapterCore::new("MlbStatsAdapter", config)?,
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

    pub fn discovered(&self) -> &[DiscoveredTeam] {
        &self.discovered
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.source.base_url.trim_end_matches('/'), path)
    }

    fn site(&self, path: &str) -> String {
        format!("{}{}", self.source.site_url.trim_end_matches('/'), path)
    }

    async fn fetch(
        &self,
        kind: PayloadKind,
        url: String,
        options: RequestOptions,
        context: Option<String>,
    ) -> Result<RawPayload> {
        let body = self.core.get_json(&url, &options).await?;
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

    fn normalize_teams(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let wanted = self.wanted_teams();
        for entry in array_at(raw, "/teams")? {
            let Some(id) = entry.get("id").and_then(id_string) else {
                continue;
            };
            if skips(&wanted, &id) {
                continue;
            }

            let name = str_at(entry, "/name").unwrap_or_default();
            if let Some(club) = str_at(entry, "/teamName") {
                // mlb.com/cardinals, mlb.com/redsox
                let slug: String = club.to_lowercase().split_whitespace().collect();
                let url = self.site(&format!("/{}", slug));
                batch
                    .linkouts
                    .push(self.core.create_linkout(EntityType::Team, &id, SOURCE, &url));
            }

            batch.teams.push(Team {
                external_ref: self.core.generate_external_ref(SOURCE, &id),
                id,
                source: SOURCE.to_string(),
                abbreviation: str_at(entry, "/abbreviation").unwrap_or_default(),
                name,
                location: str_at(entry, "/locationName"),
                league: str_at(entry, "/league/name"),
                division: str_at(entry, "/division/name"),
                venue: str_at(entry, "/venue/name"),
            });
        }
        Ok(())
    }

    fn normalize_roster(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let team_id = raw.context.clone().unwrap_or_default();
        for entry in array_at(raw, "/roster")? {
            let Some(id) = entry.pointer("/person/id").and_then(id_string) else {
                continue;
            };
            let url = self.site(&format!("/player/{}", id));
            batch
                .linkouts
                .push(self.core.create_linkout(EntityType::Player, &id, SOURCE, &url));

            batch.players.push(Player {
                external_ref: self.core.generate_external_ref(SOURCE, &id),
                id,
                source: SOURCE.to_string(),
                team_id: team_id.clone(),
                full_name: str_at(entry, "/person/fullName").unwrap_or_default(),
                jersey_number: str_at(entry, "/jerseyNumber").filter(|n| !n.is_empty()),
                position: str_at(entry, "/position/abbreviation"),
            });
        }
        Ok(())
    }

    fn normalize_schedule(
        &self,
        raw: &RawPayload,
        seen: &mut HashSet<String>,
        batch: &mut NormalizedBatch,
    ) -> Result<()> {
        for date in array_at(raw, "/dates")? {
            let Some(games) = date.get("games").and_then(Value::as_array) else {
                continue;
            };
            for entry in games {
                let Some(id) = entry.get("gamePk").and_then(id_string) else {
                    continue;
                };
                // 兩隊的賽程都會出現同一場比賽
                if !seen.insert(id.clone()) {
                    continue;
                }

                let url = self.site(&format!("/gameday/{}", id));
                batch
                    .linkouts
                    .push(self.core.create_linkout(EntityType::Game, &id, SOURCE, &url));

                batch.games.push(Game {
                    external_ref: self.core.generate_external_ref(SOURCE, &id),
                    id,
                    source: SOURCE.to_string(),
                    scheduled_at: str_at(entry, "/gameDate")
                        .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
                        .map(|d| d.with_timezone(&Utc)),
                    status: str_at(entry, "/status/detailedState")
                        .unwrap_or_else(|| "Unknown".to_string()),
                    home_team_id: entry
                        .pointer("/teams/home/team/id")
                        .and_then(id_string)
                        .unwrap_or_default(),
                    away_team_id: entry
                        .pointer("/teams/away/team/id")
                        .and_then(id_string)
                        .unwrap_or_default(),
                    home_score: score(entry.pointer("/teams/home/score")),
                    away_score: score(entry.pointer("/teams/away/score")),
                });
            }
        }
        Ok(())
    }

    fn normalize_standings(&self, raw: &RawPayload, batch: &mut NormalizedBatch) -> Result<()> {
        let wanted = self.wanted_teams();
        for record in array_at(raw, "/records")? {
            let group = str_at(record, "/division/name").unwrap_or_else(|| {
                record
                    .pointer("/division/id")
                    .and_then(id_string)
                    .map(|id| format!("division-{}", id))
                    .unwrap_or_default()
            });
            let Some(team_records) = record.get("teamRecords").and_then(Value::as_array) else {
                continue;
            };

            for entry in team_records {
                let Some(team_id) = entry.pointer("/team/id").and_then(id_string) else {
                    continue;
                };
                if skips(&wanted, &team_id) {
                    continue;
                }
                // ".550" 這種格式 f64 可以直接解析；領先者的勝差是 "-"
                let games_back =
                    str_at(entry, "/gamesBack").map(|gb| gb.parse::<f64>().unwrap_or(0.0));

                batch.standings.push(Standing {
                    team_id,
                    source: SOURCE.to_string(),
                    group: group.clone(),
                    wins: score(entry.get("wins")).unwrap_or(0),
                    losses: score(entry.get("losses")).unwrap_or(0),
                    ties: score(entry.get("ties")).unwrap_or(0),
                    win_pct: str_at(entry, "/winningPercentage").and_then(|p| p.parse().ok()),
                    games_back,
                    rank: score(entry.get("divisionRank")),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> SourceAdapter for MlbStatsAdapter<S> {
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

        let options = RequestOptions::get()
            .with_query("sportId", SPORT_ID)
            .with_query("season", self.source.season());
        let payload = self
            .fetch(PayloadKind::Teams, self.api("/teams"), options, None)
            .await?;

        let filter: HashSet<String> = self
            .source
            .teams
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect();
        let mut teams = Vec::new();
        for entry in array_at(&payload, "/teams")? {
            let (Some(id), Some(abbreviation)) = (
                entry.get("id").and_then(id_string),
                str_at(entry, "/abbreviation"),
            ) else {
                continue;
            };
            if !filter.is_empty() && !filter.contains(&abbreviation.to_ascii_uppercase()) {
                continue;
            }
            teams.push(DiscoveredTeam {
                id,
                abbreviation,
                name: str_at(entry, "/name").unwrap_or_default(),
            });
        }

        ensure_filter_matched("mlb.teams", &self.source.teams, &teams)?;

        self.core.log(
            LogLevel::Info,
            "Discovered teams",
            Some(&json!({ "count": teams.len(), "season": self.source.season() })),
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
        let options = RequestOptions::get()
            .with_query("sportId", SPORT_ID)
            .with_query("season", self.source.season());
        let payload = self
            .fetch(PayloadKind::Teams, self.api("/teams"), options, None)
            .await?;
        Ok(vec![payload])
    }

    async fn fetch_players(&self) -> Result<Vec<RawPayload>> {
        let mut payloads = Vec::with_capacity(self.discovered.len());
        for team in &self.discovered {
            let url = self.api(&format!("/teams/{}/roster/Active", team.id));
            let options = RequestOptions::get().with_query("season", self.source.season());
            payloads.push(
                self.fetch(PayloadKind::Roster, url, options, Some(team.id.clone()))
                    .await?,
            );
        }
        Ok(payloads)
    }

    async fn fetch_games(&self) -> Result<Vec<RawPayload>> {
        let mut payloads = Vec::with_capacity(self.discovered.len());
        for team in &self.discovered {
            let options = RequestOptions::get()
                .with_query("sportId", SPORT_ID)
                .with_query("teamId", &team.id)
                .with_query("season", self.source.season())
                .with_query("gameType", "R");
            payloads.push(
                self.fetch(
                    PayloadKind::Schedule,
                    self.api("/schedule"),
                    options,
                    Some(team.id.clone()),
                )
                .await?,
            );
        }
        Ok(payloads)
    }

    async fn fetch_standings(&self) -> Result<Vec<RawPayload>> {
        let options = RequestOptions::get()
            .with_query("leagueId", LEAGUE_IDS)
            .with_query("season", self.source.season());
        let payload = self
            .fetch(PayloadKind::Standings, self.api("/standings"), options, None)
            .await?;
        Ok(vec![payload])
    }

    async fn normalize(&self, raw: &[RawPayload]) -> Result<NormalizedBatch> {
        let mut batch = NormalizedBatch::new(SOURCE);
        let mut seen_games = HashSet::new();

        for payload in raw {
            match payload.kind {
                PayloadKind::Teams => self.normalize_teams(payload, &mut batch)?,
                PayloadKind::Roster => self.normalize_roster(payload, &mut batch)?,
                PayloadKind::Schedule => {
                    self.normalize_schedule(payload, &mut seen_games, &mut batch)?
                }
                PayloadKind::Standings => self.normalize_standings(payload, &mut batch)?,
            }
        }

        self.stats.lock().await.record_batch(&batch);
        Ok(batch)
    }

    async fn validate(&self, data: &NormalizedBatch) -> Result<ValidationReport> {
        let mut report = validate_batch(data);
        for team in &data.teams {
            if team.abbreviation.is_empty() {
                report.push(EntityType::Team, &team.id, "missing abbreviation");
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
