use crate::domain::model::{EntityType, NormalizedBatch, ValidationReport};
use std::collections::HashSet;
use url::Url;

/// Structural checks shared by every source: non-empty identifiers, no
/// duplicates, and references that resolve to a team in the same batch.
pub fn validate_batch(batch: &NormalizedBatch) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut team_ids = HashSet::new();
    for team in &batch.teams {
        if team.id.trim().is_empty() {
            report.push(EntityType::Team, &team.name, "missing id");
            continue;
        }
        if team.name.trim().is_empty() {
            report.push(EntityType::Team, &team.id, "missing name");
        }
        if !team_ids.insert(team.id.as_str()) {
            report.push(EntityType::Team, &team.id, "duplicate team id");
        }
    }

    // 只有在同批次有球隊資料時才檢查參照
    let check_refs = !team_ids.is_empty();

    let mut player_ids = HashSet::new();
    for player in &batch.players {
        if player.id.trim().is_empty() {
            report.push(EntityType::Player, &player.full_name, "missing id");
            continue;
        }
        if player.full_name.trim().is_empty() {
            report.push(EntityType::Player, &player.id, "missing name");
        }
        if !player_ids.insert(player.id.as_str()) {
            report.push(EntityType::Player, &player.id, "duplicate player id");
        }
        if check_refs && !team_ids.contains(player.team_id.as_str()) {
            report.push(
                EntityType::Player,
                &player.id,
                format!("unknown team '{}'", player.team_id),
            );
        }
    }

    let mut game_ids = HashSet::new();
    for game in &batch.games {
        if game.id.trim().is_empty() {
            report.push(EntityType::Game, "?", "missing id");
            continue;
        }
        if !game_ids.insert(game.id.as_str()) {
            report.push(EntityType::Game, &game.id, "duplicate game id");
        }
        if game.home_team_id == game.away_team_id {
            report.push(EntityType::Game, &game.id, "home and away team are the same");
        }
    }

    for standing in &batch.standings {
        if check_refs && !team_ids.contains(standing.team_id.as_str()) {
            report.push(
                EntityType::Team,
                &standing.team_id,
                "standing references unknown team",
            );
        }
        if let Some(pct) = standing.win_pct {
            if !(0.0..=1.0).contains(&pct) {
                report.push(
                    EntityType::Team,
                    &standing.team_id,
                    format!("win percentage {} out of range", pct),
                );
            }
        }
    }

    for linkout in &batch.linkouts {
        let ok = Url::parse(&linkout.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !ok {
            report.push(
                linkout.entity_type,
                &linkout.entity_id,
                format!("invalid linkout url '{}'", linkout.url),
            );
        }
    }

    report
}
