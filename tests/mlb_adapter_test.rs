use blaze_ingest::config::toml_config::MlbSourceConfig;
use blaze_ingest::domain::model::{EntityType, PayloadKind};
use blaze_ingest::{
    AdapterConfig, AdapterError, AdapterRunner, LocalStorage, MlbStatsAdapter, SourceAdapter,
};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn adapter_config() -> AdapterConfig {
    AdapterConfig {
        user_agent: "BlazeTestBot/1.0".to_string(),
        rate_limit_ms: 0,
        retry_delay_ms: 10,
        timeout_ms: 5000,
        ..Default::default()
    }
}

fn source_config(server: &MockServer, teams: &[&str]) -> MlbSourceConfig {
    MlbSourceConfig {
        base_url: server.base_url(),
        site_url: server.base_url(),
        season: Some(2024),
        teams: teams.iter().map(|t| t.to_string()).collect(),
    }
}

fn mock_robots(server: &MockServer, body: &'static str) {
    server.mock(|when, then| {
        when.method(GET).path("/robots.txt");
        then.status(200).body(body);
    });
}

fn mock_teams(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/teams")
            .query_param("sportId", "1")
            .query_param("season", "2024");
        then.status(200).json_body(json!({
            "teams": [
                {
                    "id": 138,
                    "name": "St. Louis Cardinals",
                    "teamName": "Cardinals",
                    "abbreviation": "STL",
                    "locationName": "St. Louis",
                    "league": {"id": 104, "name": "National League"},
                    "division": {"id": 205, "name": "National League Central"},
                    "venue": {"id": 2889, "name": "Busch Stadium"}
                },
                {
                    "id": 112,
                    "name": "Chicago Cubs",
                    "teamName": "Cubs",
                    "abbreviation": "CHC",
                    "locationName": "Chicago",
                    "league": {"id": 104, "name": "National League"},
                    "division": {"id": 205, "name": "National League Central"},
                    "venue": {"id": 17, "name": "Wrigley Field"}
                }
            ]
        }));
    });
}

fn mock_roster(server: &MockServer, team_id: u32, player_id: u32, name: &str) {
    let path = format!("/api/v1/teams/{}/roster/Active", team_id);
    let body = json!({
        "roster": [{
            "person": {"id": player_id, "fullName": name},
            "jerseyNumber": "28",
            "position": {"abbreviation": "3B"},
            "status": {"code": "A"}
        }]
    });
    server.mock(move |when, then| {
        when.method(GET).path(path);
        then.status(200).json_body(body);
    });
}

fn mock_schedule(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/schedule").query_param("sportId", "1");
        then.status(200).json_body(json!({
            "dates": [{
                "date": "2024-04-01",
                "games": [{
                    "gamePk": 745000,
                    "gameDate": "2024-04-01T18:15:00Z",
                    "status": {"detailedState": "Final"},
                    "teams": {
                        "home": {"team": {"id": 138, "name": "St. Louis Cardinals"}, "score": 5},
                        "away": {"team": {"id": 112, "name": "Chicago Cubs"}, "score": 3}
                    }
                }]
            }]
        }));
    });
}

fn mock_standings(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/standings")
            .query_param("leagueId", "103,104");
        then.status(200).json_body(json!({
            "records": [{
                "division": {"id": 205, "name": "National League Central"},
                "teamRecords": [
                    {
                        "team": {"id": 138, "name": "St. Louis Cardinals"},
                        "wins": 83, "losses": 79,
                        "winningPercentage": ".512",
                        "gamesBack": "10.0",
                        "divisionRank": "2"
                    },
                    {
                        "team": {"id": 112, "name": "Chicago Cubs"},
                        "wins": 83, "losses": 79,
                        "winningPercentage": ".512",
                        "gamesBack": "-",
                        "divisionRank": "1"
                    }
                ]
            }]
        }));
    });
}

#[tokio::test]
async fn test_discover_filters_teams() {
    let server = MockServer::start();
    mock_robots(&server, "User-agent: *\nDisallow: /private\n");
    mock_teams(&server);

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let mut adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &["stl"]), storage).unwrap();

    let discovery = adapter.discover().await.unwrap();

    assert!(discovery.robots_allowed);
    assert_eq!(discovery.teams.len(), 1);
    assert_eq!(discovery.teams[0].id, "138");
    assert_eq!(discovery.teams[0].abbreviation, "STL");

    // discover 已抓過 teams，不會再打一次 API
    let teams = adapter.fetch_teams().await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].kind, PayloadKind::Teams);
    assert_eq!(adapter.core().request_stats().requests, 2);
}

#[tokio::test]
async fn test_discover_stops_when_robots_disallows() {
    let server = MockServer::start();
    mock_robots(&server, "User-agent: *\nDisallow: /\n");
    let teams_mock = server.mock(|when, then| {
        when.method(GET).path("/api/v1/teams");
        then.status(200).json_body(json!({"teams": []}));
    });

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let mut adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &[]), storage).unwrap();

    let discovery = adapter.discover().await.unwrap();

    assert!(!discovery.robots_allowed);
    assert!(discovery.teams.is_empty());
    teams_mock.assert_hits(0);
}

#[tokio::test]
async fn test_robots_checked_on_site_host() {
    let api = MockServer::start();
    let site = MockServer::start();
    let api_robots = api.mock(|when, then| {
        when.method(GET).path("/robots.txt");
        then.status(200).body("User-agent: *\nAllow: /\n");
    });
    let site_robots = site.mock(|when, then| {
        when.method(GET).path("/robots.txt");
        then.status(200).body("User-agent: *\nDisallow: /\n");
    });

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let source = MlbSourceConfig {
        site_url: site.base_url(),
        ..source_config(&api, &[])
    };
    let mut adapter = MlbStatsAdapter::new(adapter_config(), source, storage).unwrap();

    let discovery = adapter.discover().await.unwrap();

    assert!(!discovery.robots_allowed);
    site_robots.assert();
    api_robots.assert_hits(0);
}

#[tokio::test]
async fn test_discover_rejects_unmatched_team_filter() {
    let server = MockServer::start();
    mock_robots(&server, "");
    mock_teams(&server);

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let mut adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &["XYZ"]), storage).unwrap();

    let result = adapter.discover().await;

    assert!(matches!(
        result,
        Err(AdapterError::InvalidConfigValueError { ref value, .. }) if value == "XYZ"
    ));
}

#[tokio::test]
async fn test_runner_with_unmatched_filter_writes_nothing() {
    let server = MockServer::start();
    mock_robots(&server, "");
    mock_teams(&server);
    mock_standings(&server);

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &["XYZ"]), storage).unwrap();

    let mut runner = AdapterRunner::new(adapter);
    assert!(runner.run().await.is_err());
    assert!(!temp_dir.path().join("mlb").exists());
}

#[tokio::test]
async fn test_normalize_without_discovered_teams_keeps_nothing_when_filtered() {
    let server = MockServer::start();
    mock_teams(&server);
    mock_standings(&server);

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &["XYZ"]), storage).unwrap();

    // 跳過 discover：設定了篩選就不能退回「全部隊伍」
    let mut raw = adapter.fetch_teams().await.unwrap();
    raw.extend(adapter.fetch_standings().await.unwrap());
    let batch = adapter.normalize(&raw).await.unwrap();

    assert!(batch.teams.is_empty());
    assert!(batch.standings.is_empty());
}

#[tokio::test]
async fn test_normalize_full_run_payloads() {
    let server = MockServer::start();
    mock_robots(&server, "");
    mock_teams(&server);
    mock_roster(&server, 138, 571448, "Nolan Arenado");
    mock_roster(&server, 112, 664023, "Ian Happ");
    mock_schedule(&server);
    mock_standings(&server);

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let mut adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &[]), storage).unwrap();

    adapter.discover().await.unwrap();
    let mut raw = adapter.fetch_teams().await.unwrap();
    raw.extend(adapter.fetch_players().await.unwrap());
    raw.extend(adapter.fetch_games().await.unwrap());
    raw.extend(adapter.fetch_standings().await.unwrap());

    let batch = adapter.normalize(&raw).await.unwrap();

    assert_eq!(batch.source, "mlb");
    assert_eq!(batch.teams.len(), 2);
    assert_eq!(batch.teams[0].venue.as_deref(), Some("Busch Stadium"));
    assert_eq!(batch.players.len(), 2);
    assert_eq!(batch.players[0].team_id, "138");
    // 兩隊的賽程回傳同一場比賽，只保留一筆
    assert_eq!(batch.games.len(), 1);
    assert_eq!(batch.games[0].home_score, Some(5));
    assert_eq!(batch.games[0].away_team_id, "112");
    assert!(batch.games[0].scheduled_at.is_some());

    let cubs = batch.standings.iter().find(|s| s.team_id == "112").unwrap();
    assert_eq!(cubs.games_back, Some(0.0));
    assert_eq!(cubs.rank, Some(1));
    assert_eq!(cubs.win_pct, Some(0.512));

    let team_link = batch
        .linkouts
        .iter()
        .find(|l| l.entity_type == EntityType::Team && l.entity_id == "138")
        .unwrap();
    assert_eq!(team_link.url, server.url("/cardinals"));
    assert!(!team_link.verified);
    assert!(team_link.is_active);

    let validation = adapter.validate(&batch).await.unwrap();
    assert!(validation.is_valid(), "{:?}", validation.issues);
}

#[tokio::test]
async fn test_normalize_rejects_unexpected_shape() {
    let server = MockServer::start();
    mock_robots(&server, "");
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/standings");
        then.status(200).json_body(json!({"message": "Object not found"}));
    });

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &[]), storage).unwrap();

    let raw = adapter.fetch_standings().await.unwrap();
    let result = adapter.normalize(&raw).await;

    assert!(matches!(
        result,
        Err(AdapterError::NormalizationError { .. })
    ));
}

#[tokio::test]
async fn test_runner_end_to_end_writes_outputs() {
    let server = MockServer::start();
    mock_robots(&server, "User-agent: *\nAllow: /\n");
    mock_teams(&server);
    mock_roster(&server, 138, 571448, "Nolan Arenado");
    mock_schedule(&server);
    mock_standings(&server);

    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let storage = LocalStorage::new(output_path.clone());
    let adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &["STL"]), storage).unwrap();

    let mut runner = AdapterRunner::new(adapter);
    let report = runner.run().await.unwrap();

    assert_eq!(report.source, "mlb");
    assert_eq!(report.robots_allowed, Some(true));
    assert_eq!(report.teams, 1);
    assert_eq!(report.players, 1);
    assert_eq!(report.games, 1);
    assert_eq!(report.standings, 1);
    assert_eq!(report.validation_issues, 0);
    // robots + teams + roster + schedule + standings
    assert_eq!(report.requests, 5);
    assert_eq!(report.retries, 0);
    assert_eq!(report.files_written.len(), 5);

    let base = std::path::Path::new(&output_path).join("mlb");
    for file in [
        "teams.csv",
        "players.csv",
        "games.json",
        "standings.json",
        "linkouts.json",
        "manifest.json",
    ] {
        assert!(base.join(file).exists(), "missing {}", file);
    }

    let players = std::fs::read_to_string(base.join("players.csv")).unwrap();
    assert!(players.contains("Nolan Arenado"));

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(base.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["teams"], 1);
    assert_eq!(manifest["linkouts"], 3);
}

#[tokio::test]
async fn test_runner_aborts_when_robots_disallows() {
    let server = MockServer::start();
    mock_robots(&server, "User-agent: BlazeTestBot\nDisallow: /\n");

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let adapter =
        MlbStatsAdapter::new(adapter_config(), source_config(&server, &[]), storage).unwrap();

    let mut runner = AdapterRunner::new(adapter);
    let result = runner.run().await;

    assert!(matches!(
        result,
        Err(AdapterError::RobotsDisallowed { ref adapter }) if adapter == "MlbStatsAdapter"
    ));
    assert!(!temp_dir.path().join("mlb").exists());
}
