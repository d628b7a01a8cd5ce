//! In-process fake of the Campfire API for tests.
//!
//! Rooms: `Lobby` (id 10) streams whatever the test pushes, `Ops` (id 11)
//! closes its stream immediately, `Broken` (id 12) can be joined but its
//! stream answers 503. Users: the bot (id 1, "Ember Bot") and
//! alice (id 7).
//!
//! [`LogBuffer`] captures formatted log output for assertions.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::CampfireConfig;

const LOGIN_AUTH: &str = "Basic Ym90QGFjbWUuY29tOnNlY3JldA==";
const TOKEN_AUTH: &str = "Basic dG9rOlg=";

pub(crate) const LOBBY: u64 = 10;
pub(crate) const OPS: u64 = 11;
pub(crate) const BROKEN: u64 = 12;
pub(crate) const ALICE: u64 = 7;

#[derive(Default)]
struct FakeState {
    joins: AtomicUsize,
    leaves: AtomicUsize,
    fail_speak: AtomicBool,
    spoken: Mutex<Vec<String>>,
    lobby_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

/// A running fake service.
pub(crate) struct FakeCampfire {
    url: String,
    state: Arc<FakeState>,
    lobby_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl FakeCampfire {
    pub(crate) async fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(FakeState {
            lobby_rx: Mutex::new(Some(rx)),
            ..Default::default()
        });

        let router = Router::new()
            .route("/users/me.json", get(me))
            .route("/users/{file}", get(user))
            .route("/rooms.json", get(rooms))
            .route("/room/{id}/join.json", post(join))
            .route("/room/{id}/leave.json", post(leave))
            .route("/room/{id}/speak.json", post(speak))
            .route("/room/{id}/live.json", get(live))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            lobby_tx: Mutex::new(Some(tx)),
        }
    }

    /// Returns a valid configuration pointing at this server.
    pub(crate) fn config(&self) -> CampfireConfig {
        let mut config = CampfireConfig {
            chatroom_presence: vec!["Lobby".to_string()],
            base_url: Some(self.url.clone()),
            streaming_url: Some(self.url.clone()),
            ..Default::default()
        };
        config.bot_identity.subdomain = "acme".to_string();
        config.bot_identity.username = "bot@acme.com".to_string();
        config.bot_identity.password = "secret".to_string();
        config
    }

    /// Writes a frame to the Lobby stream.
    pub(crate) fn push(&self, frame: Value) {
        if let Some(tx) = self.lobby_tx.lock().as_ref() {
            let _ = tx.send(format!("{frame}\r"));
        }
    }

    /// Ends the Lobby stream.
    pub(crate) fn close_lobby(&self) {
        self.lobby_tx.lock().take();
    }

    pub(crate) fn fail_speak(&self, fail: bool) {
        self.state.fail_speak.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn joins(&self) -> usize {
        self.state.joins.load(Ordering::SeqCst)
    }

    pub(crate) fn leaves(&self) -> usize {
        self.state.leaves.load(Ordering::SeqCst)
    }

    pub(crate) fn spoken(&self) -> Vec<String> {
        self.state.spoken.lock().clone()
    }
}

/// A `TextMessage` stream frame.
pub(crate) fn text_event(id: u64, user_id: u64, body: &str) -> Value {
    json!({
        "id": id, "room_id": LOBBY, "user_id": user_id,
        "body": body, "type": "TextMessage", "starred": false
    })
}

/// An `EnterMessage` stream frame.
pub(crate) fn enter_event(id: u64, user_id: u64) -> Value {
    json!({
        "id": id, "room_id": LOBBY, "user_id": user_id,
        "body": null, "type": "EnterMessage"
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(TOKEN_AUTH)
}

fn known_room(id: u64) -> bool {
    matches!(id, LOBBY | OPS | BROKEN)
}

async fn me(headers: HeaderMap) -> Response {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    if auth != Some(LOGIN_AUTH) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"user": {
        "id": 1, "name": "Ember Bot", "email_address": "bot@acme.com",
        "admin": false, "api_auth_token": "tok"
    }}))
    .into_response()
}

async fn user(headers: HeaderMap, Path(file): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match file.strip_suffix(".json").and_then(|id| id.parse::<u64>().ok()) {
        Some(ALICE) => Json(json!({"user": {"id": ALICE, "name": "alice"}})).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn rooms(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"rooms": [
        {"id": LOBBY, "name": "Lobby", "topic": "general chatter"},
        {"id": OPS, "name": "Ops", "locked": false},
        {"id": BROKEN, "name": "Broken"}
    ]}))
    .into_response()
}

async fn join(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if !known_room(id) {
        return StatusCode::NOT_FOUND;
    }
    state.joins.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn leave(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if !known_room(id) {
        return StatusCode::NOT_FOUND;
    }
    state.leaves.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn speak(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(payload): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.fail_speak.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "speak failed").into_response();
    }
    let body = payload["message"]["body"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.spoken.lock().push(body.clone());
    (
        StatusCode::CREATED,
        Json(json!({"message": {
            "id": 500, "room_id": id, "user_id": 1,
            "body": body, "type": "TextMessage"
        }})),
    )
        .into_response()
}

async fn live(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id {
        LOBBY => match state.lobby_rx.lock().take() {
            Some(rx) => {
                let frames = futures::stream::unfold(rx, |mut rx| async move {
                    rx.recv()
                        .await
                        .map(|frame| (Ok::<_, std::io::Error>(frame), rx))
                });
                Body::from_stream(frames).into_response()
            }
            // Later subscribers get a stream that never ends.
            None => Body::from_stream(futures::stream::pending::<Result<String, std::io::Error>>())
                .into_response(),
        },
        OPS => " ".into_response(),
        BROKEN => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Shared in-memory log sink.
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// A subscriber writing plain DEBUG-and-above lines into this buffer.
    pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish()
    }

    /// Counts the captured lines containing `needle`.
    pub(crate) fn count(&self, needle: &str) -> usize {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
