#![cfg(feature = "http-store")]

use std::{sync::Arc, time::Duration};

use reqwest::StatusCode;
use scoreboard_sync::{
    dao::match_store::memory::MemoryMatchStore,
    routes,
    services::{
        clock_ticker,
        sync_engine::{SyncEngine, SyncSettings},
    },
    state::{AppState, match_state::MatchState, store::MatchStateStore},
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::watch};

struct TestApp {
    base: String,
    client: reqwest::Client,
    remote: MemoryMatchStore,
    shutdown: watch::Sender<bool>,
}

impl TestApp {
    async fn spawn() -> Self {
        let store = Arc::new(MatchStateStore::default());
        let remote = MemoryMatchStore::with_state(MatchState::default());
        let settings = SyncSettings {
            debounce: Duration::from_millis(20),
            poll_interval: Duration::from_millis(200),
            suppression_window: Duration::from_millis(300),
            probe_interval: Duration::from_millis(100),
        };
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (engine, sync) = SyncEngine::new(
            store.clone(),
            Arc::new(remote.clone()),
            Arc::new(MemoryMatchStore::new()),
            settings,
        );
        engine.spawn(shutdown_rx.clone());
        clock_ticker::spawn(store.clone(), shutdown_rx.clone());

        let app = routes::router(AppState::new(store, sync, shutdown_rx));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let app = Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            remote,
            shutdown,
        };
        app.wait_for_health("synced").await;
        app
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn wait_for_health(&self, expected: &str) {
        for _ in 0..100 {
            let health = self.get_json("/healthcheck").await;
            if health["status"] == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("healthcheck never reported {expected}");
    }

    async fn wait_for_remote(&self, predicate: impl Fn(&MatchState) -> bool) {
        for _ in 0..100 {
            if self.remote.peek().is_some_and(|record| predicate(&record.state)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("remote record never converged");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[tokio::test]
async fn intents_update_the_state_and_reach_the_remote() {
    let app = TestApp::spawn().await;

    app.post("/intents", json!({ "type": "score", "side": "home", "delta": 1 }))
        .await;
    let response = app
        .post("/intents", json!({ "type": "score", "side": "home", "delta": 1 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["homeTeam"]["score"], 2);

    let response = app
        .post("/intents", json!({ "type": "name", "side": "away", "name": "brazil" }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["awayTeam"]["name"], "BRAZ");

    let state = app.get_json("/state").await;
    assert_eq!(state["homeTeam"]["score"], 2);
    assert_eq!(state["period"], "1T");

    app.wait_for_remote(|state| state.home_team.score == 2 && state.away_team.name == "BRAZ")
        .await;
}

#[tokio::test]
async fn invalid_intents_are_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/intents",
            json!({ "type": "logo", "side": "home", "logo": "https://example.com/crest.png" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post("/intents", json!({ "type": "offside" })).await;
    assert!(response.status().is_client_error());

    let state = app.get_json("/state").await;
    assert_eq!(state, serde_json::to_value(MatchState::default()).unwrap());
}

#[tokio::test]
async fn reset_returns_and_persists_the_default() {
    let app = TestApp::spawn().await;

    app.post("/intents", json!({ "type": "toggle_penalties" })).await;
    app.post("/intents", json!({ "type": "extra_time", "delta": 4 })).await;

    let response = app.post("/reset", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::to_value(MatchState::default()).unwrap());

    app.wait_for_remote(|state| *state == MatchState::default()).await;
}

#[tokio::test]
async fn healthcheck_follows_the_remote_connectivity() {
    let app = TestApp::spawn().await;

    app.remote.set_online(false);
    app.post("/intents", json!({ "type": "reset_clock" })).await;
    app.wait_for_health("degraded").await;

    app.remote.set_online(true);
    app.wait_for_health("synced").await;
}

#[tokio::test]
async fn refresh_adopts_external_edits() {
    let app = TestApp::spawn().await;

    let mut external = MatchState::default();
    external.away_team.red_cards = 1;
    app.remote.write(external.clone());

    let response = app.post("/refresh", json!({})).await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::to_value(external).unwrap());
}

#[tokio::test]
async fn state_stream_starts_with_the_current_document() {
    let app = TestApp::spawn().await;
    app.post("/intents", json!({ "type": "period", "code": "2T" })).await;

    let mut response = app
        .client
        .get(format!("{}/state/stream", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: state"));
    assert!(text.contains("\"period\":\"2T\""));
}
