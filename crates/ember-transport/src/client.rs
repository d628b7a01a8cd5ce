//! Campfire REST client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ember_core::{TransportError, TransportResult};

use crate::model::{
    MessageEnvelope, MessageType, RoomRecord, RoomsEnvelope, SpeakBody, SpeakRequest,
    StreamMessage, UserEnvelope, UserRecord,
};
use crate::stream::{StreamEvent, StreamHandle, run_stream};

/// Password sent alongside the API token; Campfire ignores it.
const TOKEN_PASSWORD: &str = "X";

const USER_AGENT: &str = concat!("ember/", env!("CARGO_PKG_VERSION"));

/// Connection settings for a [`CampfireClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account subdomain (`<subdomain>.campfirenow.com`).
    pub subdomain: String,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Whether to use HTTPS.
    pub ssl: bool,
    /// Overrides the REST base URL derived from the subdomain.
    pub base_url: Option<String>,
    /// Overrides the streaming base URL.
    pub streaming_url: Option<String>,
    /// Timeout for REST calls. The stream has no overall timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates settings for an account with HTTPS enabled.
    pub fn new(
        subdomain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            subdomain: subdomain.into(),
            username: username.into(),
            password: password.into(),
            ssl: true,
            base_url: None,
            streaming_url: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_streaming_url(mut self, url: impl Into<String>) -> Self {
        self.streaming_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn scheme(&self) -> &'static str {
        if self.ssl { "https" } else { "http" }
    }

    /// Returns the REST base URL.
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}://{}.campfirenow.com", self.scheme(), self.subdomain),
        }
    }

    /// Returns the streaming base URL.
    pub fn resolved_streaming_url(&self) -> String {
        match &self.streaming_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}://streaming.campfirenow.com", self.scheme()),
        }
    }
}

/// Client for one Campfire account.
///
/// [`authenticate`](Self::authenticate) must succeed before any other call;
/// it exchanges the login credentials for the account's API token.
pub struct CampfireClient {
    http: Client,
    stream_http: Client,
    base_url: String,
    streaming_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
    me: RwLock<Option<UserRecord>>,
    users: RwLock<HashMap<u64, UserRecord>>,
}

impl CampfireClient {
    /// Creates a client. No request is made until `authenticate`.
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let base_url = config.resolved_base_url();
        let streaming_url = config.resolved_streaming_url();

        let http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| connection_failed(&base_url, e))?;
        let stream_http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| connection_failed(&streaming_url, e))?;

        Ok(Self {
            http,
            stream_http,
            base_url,
            streaming_url,
            username: config.username,
            password: config.password,
            token: RwLock::new(None),
            me: RwLock::new(None),
            users: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn streaming_url(&self) -> &str {
        &self.streaming_url
    }

    /// Returns true once `authenticate` has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Returns the authenticated user.
    pub fn me(&self) -> Option<UserRecord> {
        self.me.read().clone()
    }

    /// Logs in and stores the API token.
    pub async fn authenticate(&self) -> TransportResult<UserRecord> {
        let url = format!("{}/users/me.json", self.base_url);
        debug!(url = %url, username = %self.username, "Authenticating");

        let request = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password));
        let envelope: UserEnvelope = decode(&url, send(&url, request).await?).await?;
        let user = envelope.user;

        let token = user
            .api_auth_token
            .clone()
            .ok_or_else(|| TransportError::decode("login response carried no api_auth_token"))?;

        *self.token.write() = Some(token);
        *self.me.write() = Some(user.clone());
        self.users.write().insert(user.id, user.clone());

        info!(user = %user.name, id = user.id, "Authenticated with Campfire");
        Ok(user)
    }

    /// Lists the rooms visible to the account.
    pub async fn rooms(&self) -> TransportResult<Vec<RoomRecord>> {
        let envelope: RoomsEnvelope = self.get_json("/rooms.json").await?;
        Ok(envelope.rooms)
    }

    /// Finds a room by exact name.
    pub async fn room_by_name(&self, name: &str) -> TransportResult<RoomRecord> {
        self.rooms()
            .await?
            .into_iter()
            .find(|room| room.name == name)
            .ok_or_else(|| TransportError::RoomNotFound {
                name: name.to_string(),
            })
    }

    /// Joins a room.
    pub async fn join(&self, room_id: u64) -> TransportResult<()> {
        self.post_empty(&format!("/room/{room_id}/join.json"))
            .await
    }

    /// Leaves a room.
    pub async fn leave(&self, room_id: u64) -> TransportResult<()> {
        self.post_empty(&format!("/room/{room_id}/leave.json"))
            .await
    }

    /// Posts a text message to a room and returns it as stored.
    pub async fn speak(&self, room_id: u64, body: &str) -> TransportResult<StreamMessage> {
        let url = format!("{}/room/{room_id}/speak.json", self.base_url);
        let payload = SpeakRequest {
            message: SpeakBody {
                kind: MessageType::TextMessage,
                body,
            },
        };
        let request = self.authorized(self.http.post(&url))?.json(&payload);
        let envelope: MessageEnvelope = decode(&url, send(&url, request).await?).await?;
        Ok(envelope.message)
    }

    /// Fetches a user, answering from the cache when possible.
    pub async fn user(&self, user_id: u64) -> TransportResult<UserRecord> {
        if let Some(user) = self.users.read().get(&user_id) {
            return Ok(user.clone());
        }

        let envelope: UserEnvelope = self.get_json(&format!("/users/{user_id}.json")).await?;
        let user = envelope.user;
        self.users.write().insert(user_id, user.clone());
        Ok(user)
    }

    /// Returns a user from the cache without a request.
    pub fn cached_user(&self, user_id: u64) -> Option<UserRecord> {
        self.users.read().get(&user_id).cloned()
    }

    /// Opens the live stream of a joined room.
    ///
    /// Returns once the service has accepted the stream request; messages
    /// and the eventual failure are delivered on `events`.
    pub async fn open_stream(
        &self,
        room: &RoomRecord,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> TransportResult<StreamHandle> {
        let url = format!("{}/room/{}/live.json", self.streaming_url, room.id);
        debug!(url = %url, room = %room.name, "Opening stream");

        let request = self.authorized(self.stream_http.get(&url))?;
        let response = send(&url, request).await?;

        let live = Arc::new(AtomicBool::new(true));
        tokio::spawn(run_stream(
            response,
            room.name.clone(),
            events,
            Arc::clone(&live),
            cancel.clone(),
        ));

        Ok(StreamHandle::new(room.name.clone(), live, cancel))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> TransportResult<T> {
        let url = format!("{}{path}", self.base_url);
        let request = self.authorized(self.http.get(&url))?;
        decode(&url, send(&url, request).await?).await
    }

    async fn post_empty(&self, path: &str) -> TransportResult<()> {
        let url = format!("{}{path}", self.base_url);
        let request = self.authorized(self.http.post(&url))?;
        send(&url, request).await?;
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> TransportResult<RequestBuilder> {
        let token = self.token.read().clone().ok_or_else(|| TransportError::ConnectionFailed {
            url: self.base_url.clone(),
            reason: "not authenticated".to_string(),
        })?;
        Ok(request.basic_auth(token, Some(TOKEN_PASSWORD)))
    }
}

impl std::fmt::Debug for CampfireClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampfireClient")
            .field("base_url", &self.base_url)
            .field("streaming_url", &self.streaming_url)
            .field("username", &self.username)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Sends a request and rejects non-success statuses.
async fn send(url: &str, request: RequestBuilder) -> TransportResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| connection_failed(url, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Http {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> TransportResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| connection_failed(url, e))?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::decode(format!("{url}: {e}")))
}

fn connection_failed(url: &str, err: reqwest::Error) -> TransportError {
    TransportError::ConnectionFailed {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOGIN_AUTH: &str = "Basic YWxpY2U6c2VjcmV0";
    const TOKEN_AUTH: &str = "Basic dG9rMTIzOlg=";

    fn authorization(headers: &HeaderMap) -> &str {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fake_campfire(user_hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/users/me.json",
                get(|headers: HeaderMap| async move {
                    if authorization(&headers) != LOGIN_AUTH {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({"user": {
                        "id": 1, "name": "Ember Bot", "api_auth_token": "tok123"
                    }})))
                }),
            )
            .route(
                "/rooms.json",
                get(|headers: HeaderMap| async move {
                    if authorization(&headers) != TOKEN_AUTH {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({"rooms": [
                        {"id": 10, "name": "Lobby", "topic": "general"},
                        {"id": 11, "name": "Ops"}
                    ]})))
                }),
            )
            .route("/room/10/join.json", post(|| async { StatusCode::OK }))
            .route("/room/10/leave.json", post(|| async { StatusCode::OK }))
            .route(
                "/room/10/speak.json",
                post(|Json(body): Json<Value>| async move {
                    let text = body["message"]["body"].as_str().unwrap_or_default().to_string();
                    assert_eq!(body["message"]["type"], "TextMessage");
                    (
                        StatusCode::CREATED,
                        Json(json!({"message": {
                            "id": 99, "room_id": 10, "user_id": 1,
                            "body": text, "type": "TextMessage"
                        }})),
                    )
                }),
            )
            .route(
                "/users/7.json",
                get(move || {
                    let hits = Arc::clone(&user_hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Json(json!({"user": {"id": 7, "name": "Carol"}}))
                    }
                }),
            )
            .route(
                "/room/10/live.json",
                get(|| async {
                    " \r{\"id\":1,\"room_id\":10,\"user_id\":7,\"body\":\"hello\",\"type\":\"TextMessage\"}\r \r"
                }),
            )
    }

    async fn client_for(url: &str, password: &str) -> CampfireClient {
        let config = ClientConfig::new("acme", "alice", password)
            .with_base_url(url)
            .with_streaming_url(url);
        CampfireClient::new(config).unwrap()
    }

    #[test]
    fn test_default_urls() {
        let config = ClientConfig::new("acme", "alice", "secret");
        assert_eq!(config.resolved_base_url(), "https://acme.campfirenow.com");
        assert_eq!(
            config.resolved_streaming_url(),
            "https://streaming.campfirenow.com"
        );

        let plain = config.with_ssl(false);
        assert_eq!(plain.resolved_base_url(), "http://acme.campfirenow.com");
        assert_eq!(
            plain.resolved_streaming_url(),
            "http://streaming.campfirenow.com"
        );
    }

    #[test]
    fn test_override_strips_trailing_slash() {
        let config = ClientConfig::new("acme", "a", "b").with_base_url("http://localhost:3000/");
        assert_eq!(config.resolved_base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let client = client_for("http://127.0.0.1:9", "secret").await;
        assert!(!client.is_authenticated());
        let err = client.rooms().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_authenticate_and_list_rooms() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "secret").await;

        let me = client.authenticate().await.unwrap();
        assert_eq!(me.id, 1);
        assert!(client.is_authenticated());
        assert_eq!(client.me().unwrap().name, "Ember Bot");

        let rooms = client.rooms().await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].topic.as_deref(), Some("general"));

        let ops = client.room_by_name("Ops").await.unwrap();
        assert_eq!(ops.id, 11);
    }

    #[tokio::test]
    async fn test_bad_password_is_unauthorized() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "wrong").await;

        let err = client.authenticate().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "secret").await;
        client.authenticate().await.unwrap();

        let err = client.room_by_name("Nowhere").await.unwrap_err();
        assert!(matches!(err, TransportError::RoomNotFound { name } if name == "Nowhere"));
    }

    #[tokio::test]
    async fn test_join_speak_leave() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "secret").await;
        client.authenticate().await.unwrap();

        client.join(10).await.unwrap();
        let posted = client.speak(10, "hi there").await.unwrap();
        assert_eq!(posted.body(), "hi there");
        client.leave(10).await.unwrap();

        let err = client.join(12).await.unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_user_lookup_is_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = serve(fake_campfire(Arc::clone(&hits))).await;
        let client = client_for(&url, "secret").await;
        client.authenticate().await.unwrap();

        assert!(client.cached_user(7).is_none());
        assert_eq!(client.user(7).await.unwrap().name, "Carol");
        assert_eq!(client.user(7).await.unwrap().name, "Carol");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(client.cached_user(1).is_some());
    }

    #[tokio::test]
    async fn test_stream_delivers_messages_then_closes() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "secret").await;
        client.authenticate().await.unwrap();
        let lobby = client.room_by_name("Lobby").await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let handle = client
            .open_stream(&lobby, tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handle.room(), "Lobby");

        match rx.recv().await.unwrap() {
            StreamEvent::Message { room, message } => {
                assert_eq!(room, "Lobby");
                assert_eq!(message.body(), "hello");
                assert_eq!(message.user_id, Some(7));
            }
            other => panic!("expected message, got {other:?}"),
        }

        match rx.recv().await.unwrap() {
            StreamEvent::Error { room, error } => {
                assert_eq!(room, "Lobby");
                assert!(matches!(error, TransportError::StreamClosed { .. }));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert!(!handle.is_live());
    }

    #[tokio::test]
    async fn test_stream_of_unknown_room_fails_to_open() {
        let url = serve(fake_campfire(Arc::new(AtomicUsize::new(0)))).await;
        let client = client_for(&url, "secret").await;
        client.authenticate().await.unwrap();

        let ghost = RoomRecord {
            id: 404,
            name: "Ghost".into(),
            topic: None,
            membership_limit: None,
            locked: false,
        };
        let (tx, _rx) = mpsc::channel(1);
        let err = client
            .open_stream(&ghost, tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 404, .. }));
    }
}
