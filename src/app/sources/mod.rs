pub mod espn;
pub mod mlb;

pub use espn::EspnAdapter;
pub use mlb::MlbStatsAdapter;

use crate::adapters::AdapterCore;
use crate::domain::model::{AdapterReport, DiscoveredTeam, NormalizedBatch, RawPayload};
use crate::utils::error::{AdapterError, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;

/// Per-run counters an adapter accumulates for `report()`.
#[derive(Debug, Default)]
pub(crate) struct RunStats {
    pub robots_allowed: Option<bool>,
    pub teams: usize,
    pub players: usize,
    pub games: usize,
    pub standings: usize,
    pub linkouts: usize,
    pub validation_issues: usize,
    pub files_written: Vec<String>,
}

impl RunStats {
    pub fn record_batch(&mut self, batch: &NormalizedBatch) {
        self.teams = batch.teams.len();
        self.players = batch.players.len();
        self.games = batch.games.len();
        self.standings = batch.standings.len();
        self.linkouts = batch.linkouts.len();
    }

    pub fn to_report(&self, core: &AdapterCore, source: &str) -> AdapterReport {
        let requests = core.request_stats();
        AdapterReport {
            adapter: core.name().to_string(),
            source: source.to_string(),
            generated_at: Utc::now(),
            robots_allowed: self.robots_allowed,
            requests: requests.requests,
            retries: requests.retries,
            failed_requests: requests.failed,
            teams: self.teams,
            players: self.players,
            games: self.games,
            standings: self.standings,
            linkouts: self.linkouts,
            validation_issues: self.validation_issues,
            files_written: self.files_written.clone(),
        }
    }
}

/// 來源的 id 有時是數字、有時是字串，統一成字串
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// 取出 payload 裡預期的陣列；格式不符直接視為正規化錯誤
pub(crate) fn array_at<'a>(raw: &'a RawPayload, pointer: &str) -> Result<&'a Vec<Value>> {
    raw.body
        .pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::NormalizationError {
            source_name: raw.source.clone(),
            message: format!("{:?} payload from {} has no array at '{}'", raw.kind, raw.url, pointer),
        })
}

/// 每個設定的縮寫都必須對應到一支隊伍
pub(crate) fn ensure_filter_matched(
    field: &str,
    filter: &[String],
    found: &[DiscoveredTeam],
) -> Result<()> {
    let missing: Vec<&str> = filter
        .iter()
        .filter(|abbr| !found.iter().any(|t| t.abbreviation.eq_ignore_ascii_case(abbr)))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AdapterError::InvalidConfigValueError {
        field: field.to_string(),
        value: missing.join(","),
        reason: "No team with this abbreviation was found".to_string(),
    })
}

/// Team ids to keep while normalizing. `None` means no filter is configured;
/// a configured filter with nothing discovered keeps nothing.
pub(crate) fn team_filter<'a>(
    filter: &[String],
    discovered: &'a [DiscoveredTeam],
) -> Option<HashSet<&'a str>> {
    if filter.is_empty() {
        return None;
    }
    Some(discovered.iter().map(|t| t.id.as_str()).collect())
}

pub(crate) fn skips(wanted: &Option<HashSet<&str>>, team_id: &str) -> bool {
    wanted.as_ref().is_some_and(|ids| !ids.contains(team_id))
}

/// Score fields arrive as either numbers or numeric strings.
pub(crate) fn score(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
