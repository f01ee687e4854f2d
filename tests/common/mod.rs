// Shared fixtures: a local axum server impersonating RuneMetrics and Hiscores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use clan_bot::commands::AppContext;
use clan_bot::db::Database;
use clan_bot::upstream::UpstreamClient;

/// Canned upstream data for one player.
#[derive(Clone, Default)]
pub struct FakePlayer {
    pub profile: Option<Value>,
    pub hiscores: Option<String>,
    /// Answer profile requests with HTTP 500.
    pub profile_broken: bool,
    /// Answer profile requests with this body as-is, status 200.
    pub profile_raw: Option<String>,
    /// Hold every response for this long.
    pub delay: Option<Duration>,
}

impl FakePlayer {
    pub fn with_profile(profile: Value) -> Self {
        FakePlayer {
            profile: Some(profile),
            ..Default::default()
        }
    }

    pub fn hiscores(mut self, body: String) -> Self {
        self.hiscores = Some(body);
        self
    }

    pub fn raw_profile(body: &str) -> Self {
        FakePlayer {
            profile_raw: Some(body.to_string()),
            ..Default::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Players = Arc<HashMap<String, FakePlayer>>;

pub fn profile_json(name: &str, xp: i64, level: i64, combat: i64, quests: i64) -> Value {
    json!({
        "name": name,
        "totalxp": xp,
        "totalskill": level,
        "combatlevel": combat,
        "questscomplete": quests,
        "questsstarted": 3,
        "questsnotstarted": 7,
        "rank": "1,234",
        "activities": [
            { "date": "01-Mar-2024 12:00", "details": "", "text": format!("{name} levelled up Necromancy.") },
            { "date": "28-Feb-2024 09:00", "details": "", "text": "Quest complete: Cook's Assistant" }
        ]
    })
}

/// index_lite body: overall row, then `levels` for the following skills in order.
pub fn hiscores_text(overall_xp: i64, levels: &[i64]) -> String {
    let total: i64 = levels.iter().sum();
    let mut lines = vec![format!("1000,{total},{overall_xp}")];
    lines.extend(levels.iter().enumerate().map(|(i, lvl)| format!("{},{lvl},{}", 5000 + i, lvl * 1000)));
    // Minigame rows after the skills carry two fields
    lines.push("-1,-1".to_string());
    lines.join("\n")
}

async fn runemetrics(
    State(players): State<Players>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("activities").map(String::as_str) != Some("20") {
        return (StatusCode::BAD_REQUEST, "activities must be 20").into_response();
    }
    let user = params.get("user").cloned().unwrap_or_default().to_lowercase();
    let player = players.get(&user);
    if let Some(delay) = player.and_then(|p| p.delay) {
        tokio::time::sleep(delay).await;
    }
    match player {
        Some(p) if p.profile_broken => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Some(FakePlayer {
            profile_raw: Some(body),
            ..
        }) => body.clone().into_response(),
        Some(FakePlayer {
            profile: Some(profile),
            ..
        }) => Json(profile.clone()).into_response(),
        _ => Json(json!({ "error": "NO_PROFILE", "loggedIn": "false" })).into_response(),
    }
}

async fn hiscores(
    State(players): State<Players>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let player = params.get("player").cloned().unwrap_or_default().to_lowercase();
    let player = players.get(&player);
    if let Some(delay) = player.and_then(|p| p.delay) {
        tokio::time::sleep(delay).await;
    }
    match player.and_then(|p| p.hiscores.clone()) {
        Some(body) => body.into_response(),
        None => (StatusCode::NOT_FOUND, "<html>not found</html>").into_response(),
    }
}

/// Start the fake providers and return their base URL.
pub async fn spawn_providers(players: Vec<(&str, FakePlayer)>) -> String {
    let players: Players = Arc::new(
        players
            .into_iter()
            .map(|(name, p)| (name.to_lowercase(), p))
            .collect(),
    );
    let app = Router::new()
        .route("/runemetrics/profile", get(runemetrics))
        .route("/hiscores", get(hiscores))
        .with_state(players);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn test_context(players: Vec<(&str, FakePlayer)>) -> AppContext {
    test_context_with_timeout(players, Duration::from_secs(10)).await
}

pub async fn test_context_with_timeout(
    players: Vec<(&str, FakePlayer)>,
    timeout: Duration,
) -> AppContext {
    let base = spawn_providers(players).await;
    let db = Database::new("sqlite::memory:").await.unwrap();
    let upstream = UpstreamClient::with_timeout(
        &format!("{base}/runemetrics/profile"),
        &format!("{base}/hiscores"),
        timeout,
    )
    .unwrap();
    AppContext::new(Arc::new(db), upstream)
}
