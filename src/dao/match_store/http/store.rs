use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Response};

use crate::dao::{match_store::MatchStore, models::SyncRecord, storage::StorageResult};
use crate::state::match_state::MatchState;

use super::{
    config::HttpStoreConfig,
    error::{HttpResult, HttpStoreError},
};

const RECORD_PATH: &str = "gameState";

/// Remote authority: a record store exposing `GET`/`PUT /gameState`.
#[derive(Clone)]
pub struct HttpMatchStore {
    client: Client,
    base_url: Arc<str>,
}

impl HttpMatchStore {
    /// Build a client for the record store described by `config`.
    pub fn new(config: HttpStoreConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| HttpStoreError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self) -> String {
        format!("{}/{}", self.base_url, RECORD_PATH)
    }

    async fn get_record(&self) -> HttpResult<SyncRecord> {
        let response = self
            .client
            .get(self.record_url())
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                path: RECORD_PATH.to_string(),
                source,
            })?;

        decode_record(response).await
    }

    async fn put_record(&self, record: &SyncRecord) -> HttpResult<SyncRecord> {
        let response = self
            .client
            .put(self.record_url())
            .json(record)
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                path: RECORD_PATH.to_string(),
                source,
            })?;

        decode_record(response).await
    }

    async fn ping(&self) -> HttpResult<()> {
        let response = self
            .client
            .get(self.record_url())
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                path: RECORD_PATH.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HttpStoreError::RequestStatus {
                path: RECORD_PATH.to_string(),
                status: response.status(),
            })
        }
    }
}

async fn decode_record(response: Response) -> HttpResult<SyncRecord> {
    let status = response.status();
    if !status.is_success() {
        return Err(HttpStoreError::RequestStatus {
            path: RECORD_PATH.to_string(),
            status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| HttpStoreError::RequestSend {
            path: RECORD_PATH.to_string(),
            source,
        })?;

    serde_json::from_slice(&body).map_err(|source| HttpStoreError::DecodeResponse {
        path: RECORD_PATH.to_string(),
        source,
    })
}

impl MatchStore for HttpMatchStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn fetch(&self) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move { store.get_record().await.map_err(Into::into) })
    }

    fn replace(&self, state: MatchState) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move {
            // The server may re-stamp the record; its copy is authoritative.
            let record = SyncRecord::new(state).stamped();
            store.put_record(&record).await.map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;
    use crate::{dao::storage::StorageError, state::match_state::Side};

    #[derive(Clone, Default)]
    struct FakeRecordServer {
        record: Arc<Mutex<Option<Value>>>,
        writes: Arc<Mutex<u32>>,
    }

    async fn get_record(State(server): State<FakeRecordServer>) -> Result<Json<Value>, StatusCode> {
        let record = server.record.lock().unwrap().clone();
        record.map(Json).ok_or(StatusCode::NOT_FOUND)
    }

    async fn put_record(
        State(server): State<FakeRecordServer>,
        Json(mut body): Json<Value>,
    ) -> Json<Value> {
        let mut writes = server.writes.lock().unwrap();
        *writes += 1;
        body["lastUpdated"] = Value::String(format!("server-stamp-{}", *writes));
        *server.record.lock().unwrap() = Some(body.clone());
        Json(body)
    }

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    async fn spawn_record_server() -> (String, FakeRecordServer) {
        let server = FakeRecordServer::default();
        let router = Router::new()
            .route("/gameState", get(get_record).put(put_record))
            .with_state(server.clone());
        (spawn(router).await, server)
    }

    fn store(base_url: &str) -> HttpMatchStore {
        HttpMatchStore::new(HttpStoreConfig::new(base_url)).unwrap()
    }

    #[tokio::test]
    async fn replace_returns_the_server_copy() {
        let (base_url, _server) = spawn_record_server().await;
        let store = store(&format!("{base_url}/"));

        let mut state = MatchState::default();
        state.team_mut(Side::Home).score = 2;

        let written = store.replace(state.clone()).await.unwrap();
        assert_eq!(written.version(), Some("server-stamp-1"));
        assert_eq!(written.state, state);

        let fetched = store.fetch().await.unwrap();
        assert_eq!(fetched, written);
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn reset_writes_the_default_document() {
        let (base_url, server) = spawn_record_server().await;
        let store = store(&base_url);

        let mut state = MatchState::default();
        state.extra_time = 4;
        store.replace(state).await.unwrap();

        let reset = store.reset_to_default().await.unwrap();
        assert_eq!(reset.state, MatchState::default());
        assert_eq!(*server.writes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_record_is_reported_unreachable() {
        let (base_url, _server) = spawn_record_server().await;
        let err = store(&base_url).fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::Unreachable { .. }));
        assert!(store(&base_url).health_check().await.is_err());
    }

    #[tokio::test]
    async fn refused_connection_is_reported_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = store(&format!("http://{addr}")).fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn unexpected_payload_is_reported_malformed() {
        let router = Router::new().route("/gameState", get(|| async { "not a record" }));
        let base_url = spawn(router).await;

        let err = store(&base_url).fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedResponse { .. }));
    }
}
