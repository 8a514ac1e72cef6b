use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Team,
    Player,
    Game,
    Tournament,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityType::Team => "team",
            EntityType::Player => "player",
            EntityType::Game => "game",
            EntityType::Tournament => "tournament",
        };
        f.write_str(name)
    }
}

/// 外部來源對照：序列化為 `{ "<source>": "<id>", "lastUpdated": "..." }`
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRef {
    pub source: String,
    pub id: String,
    pub last_updated: DateTime<Utc>,
}

impl Serialize for ExternalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.source, &self.id)?;
        map.serialize_entry(
            "lastUpdated",
            &self.last_updated.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.end()
    }
}

/// A cross-reference from a local entity to a page on an external source.
///
/// Linkouts are never removed; a dead link is kept with `is_active = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linkout {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub source: String,
    pub url: String,
    pub verified: bool,
    pub last_checked: DateTime<Utc>,
    pub is_active: bool,
}

impl Linkout {
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.last_checked = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub source: String,
    pub abbreviation: String,
    pub name: String,
    pub location: Option<String>,
    pub league: Option<String>,
    pub division: Option<String>,
    pub venue: Option<String>,
    pub external_ref: ExternalRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub source: String,
    pub team_id: String,
    pub full_name: String,
    pub jersey_number: Option<String>,
    pub position: Option<String>,
    pub external_ref: ExternalRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub source: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub external_ref: ExternalRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub team_id: String,
    pub source: String,
    pub group: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_pct: Option<f64>,
    pub games_back: Option<f64>,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Teams,
    Roster,
    Schedule,
    Standings,
}

/// 來源 API 的原始回應，保留到 normalize 階段才解析
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    pub kind: PayloadKind,
    pub source: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    /// 查詢時的上下文，例如 roster 對應的 team id
    pub context: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTeam {
    pub id: String,
    pub abbreviation: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub robots_allowed: bool,
    pub teams: Vec<DiscoveredTeam>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedBatch {
    pub source: String,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub games: Vec<Game>,
    pub standings: Vec<Standing>,
    pub linkouts: Vec<Linkout>,
}

impl NormalizedBatch {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
            && self.players.is_empty()
            && self.games.is_empty()
            && self.standings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.entity_type, self.entity_id, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, entity_type: EntityType, entity_id: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            entity_type,
            entity_id: entity_id.to_string(),
            message: message.into(),
        });
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistSummary {
    pub files: Vec<String>,
    pub records_written: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    pub manifest_path: String,
    pub linkouts_published: usize,
    pub linkouts_active: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterReport {
    pub adapter: String,
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub robots_allowed: Option<bool>,
    pub requests: u64,
    pub retries: u64,
    pub failed_requests: u64,
    pub teams: usize,
    pub players: usize,
    pub games: usize,
    pub standings: usize,
    pub linkouts: usize,
    pub validation_issues: usize,
    pub files_written: Vec<String>,
}
