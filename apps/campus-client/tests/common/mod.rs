#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

use campus_client::auth::store::{CredentialStore, MemoryCredentialStore};
use campus_client::config::Config;
use campus_client::Portal;

pub const TESS_EMAIL: &str = "tess@school.test";
pub const SAM_EMAIL: &str = "sam@school.test";
pub const DISABLED_EMAIL: &str = "gone@school.test";
pub const PASSWORD: &str = "right";
pub const DISABLED_DETAIL: &str = "This account has been disabled.";

/// Request counters and mutable data of the stub backend.
#[derive(Clone, Default)]
pub struct BackendState {
    pub token_calls: Arc<AtomicUsize>,
    pub me_calls: Arc<AtomicUsize>,
    pub users_calls: Arc<AtomicUsize>,
    pub user_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub created_bodies: Arc<Mutex<Vec<Value>>>,
    pub discussions: Arc<Mutex<Vec<Value>>>,
    pub messages: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    pub fail_discussion_list: Arc<AtomicBool>,
}

impl BackendState {
    pub fn users_calls(&self) -> usize {
        self.users_calls.load(Ordering::SeqCst)
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }
}

pub struct TestBackend {
    pub addr: SocketAddr,
    pub state: BackendState,
}

impl TestBackend {
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Config pointing at the stub, with a short quiet period to keep tests fast.
    pub fn config(&self) -> Config {
        let mut config = Config::new(self.api_url());
        config.resolver_quiet_period = Duration::from_millis(50);
        config.support_contact = "help@school.test".to_string();
        config
    }

    pub fn portal(&self) -> Portal {
        self.portal_with_store(Arc::new(MemoryCredentialStore::new()))
    }

    pub fn portal_with_store(&self, store: Arc<dyn CredentialStore>) -> Portal {
        Portal::with_store(self.config(), store).unwrap()
    }

    /// Portal already signed in as `email`.
    pub async fn signed_in(&self, email: &str) -> Portal {
        let portal = self.portal();
        portal.session.login(email, PASSWORD).await.unwrap();
        portal
    }
}

/// Start the stub backend on an ephemeral port. The server runs in the background.
pub async fn start_backend() -> TestBackend {
    let state = BackendState::default();
    let api = Router::new()
        .route("/auth/token", post(token))
        .route("/auth/me", get(me))
        .route("/users", get(users))
        .route("/discussions/", get(list_discussions).post(create_discussion))
        .route(
            "/discussions/{id}/messages",
            get(list_messages).post(post_message),
        )
        .with_state(state.clone());
    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend { addr, state }
}

fn tess_profile() -> Value {
    json!({
        "id": "u1",
        "username": "tess",
        "email": TESS_EMAIL,
        "first_name": "Tess",
        "last_name": "Teacher",
        "role": "enseignant",
        "is_active": true
    })
}

fn sam_profile() -> Value {
    json!({
        "id": 7,
        "username": "sam",
        "email": SAM_EMAIL,
        "firstName": "Sam",
        "lastName": "Student",
        "role": " Etudiant ",
        "is_active": true
    })
}

fn directory() -> Vec<Value> {
    vec![
        json!({ "id": "u1", "firstName": "Tess", "lastName": "Teacher", "email": TESS_EMAIL, "role": "enseignant" }),
        json!({ "id": "u2", "firstName": "Ana", "lastName": "Lopez", "email": "ana@school.test", "role": "etudiant" }),
        json!({ "id": "u3", "firstName": "Ana", "lastName": "", "email": "ana.k@school.test", "role": "etudiant" }),
        json!({ "id": "u4", "first_name": "Anton", "last_name": "Berg", "email": "anton@school.test", "role": "etudiant" }),
        json!({ "id": 5, "firstName": "Dana", "lastName": "Ray", "email": "dana@school.test", "role": "admin" }),
    ]
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Profile behind a token, if the token is valid.
fn profile_for(headers: &HeaderMap) -> Option<Value> {
    match bearer(headers)? {
        "tok-tess" => Some(tess_profile()),
        "tok-sam" => Some(sam_profile()),
        _ => None,
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn token(State(state): State<BackendState>, Form(form): Form<LoginForm>) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    match (form.username.as_str(), form.password.as_str()) {
        (TESS_EMAIL, PASSWORD) => Json(json!({
            "access_token": "tok-tess",
            "token_type": "bearer",
            "user": tess_profile()
        }))
        .into_response(),
        // No embedded user: the client has to ask /auth/me.
        (SAM_EMAIL, PASSWORD) => Json(json!({
            "access_token": "tok-sam",
            "token_type": "bearer"
        }))
        .into_response(),
        (DISABLED_EMAIL, _) => detail(StatusCode::FORBIDDEN, DISABLED_DETAIL),
        _ => detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    }
}

async fn me(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    match profile_for(&headers) {
        Some(profile) => Json(profile).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"),
    }
}

async fn users(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.users_calls.fetch_add(1, Ordering::SeqCst);
    state.user_queries.lock().push(query.clone());

    match bearer(&headers) {
        Some("tok-tess") => {}
        Some("tok-sam") => return detail(StatusCode::FORBIDDEN, "Not enough permissions"),
        _ => return detail(StatusCode::UNAUTHORIZED, "Not authenticated"),
    }

    let search = query.get("search").map(|s| s.to_lowercase()).unwrap_or_default();
    let role = query.get("role");
    let text = |entry: &Value, field: &str, alias: &str| {
        entry[field]
            .as_str()
            .or_else(|| entry[alias].as_str())
            .unwrap_or_default()
            .to_lowercase()
    };

    let matches: Vec<Value> = directory()
        .into_iter()
        .filter(|entry| role.map_or(true, |role| entry["role"] == role.as_str()))
        .filter(|entry| {
            [
                text(entry, "firstName", "first_name"),
                text(entry, "lastName", "last_name"),
                text(entry, "email", "email"),
            ]
            .iter()
            .any(|field| field.contains(&search))
        })
        .collect();
    Json(matches).into_response()
}

async fn list_discussions(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    if profile_for(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    if state.fail_discussion_list.load(Ordering::SeqCst) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    Json(state.discussions.lock().clone()).into_response()
}

async fn create_discussion(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(author) = profile_for(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    state.created_bodies.lock().push(body.clone());

    let mut discussions = state.discussions.lock();
    let id = discussions.len() + 1;
    let participants: Vec<Value> = body["participantIds"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|id| json!({ "id": id }))
        .collect();
    let discussion = json!({
        "id": id,
        "title": body["title"],
        "createdBy": author["id"],
        "createdAt": "2024-03-01T09:30:00",
        "lastMessageAt": "2024-03-01T09:30:00",
        "messageCount": 1,
        "isGroup": body["isGroup"],
        "participants": participants,
    });
    discussions.push(discussion.clone());

    state.messages.lock().insert(
        id.to_string(),
        vec![json!({
            "id": 1,
            "content": body["initialMessage"],
            "userId": author["id"],
            "createdAt": "2024-03-01T09:30:00",
            "sender": { "id": author["id"], "firstName": author["first_name"], "lastName": author["last_name"] }
        })],
    );

    (StatusCode::CREATED, Json(discussion)).into_response()
}

async fn list_messages(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if profile_for(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    match state.messages.lock().get(&id) {
        Some(messages) => Json(messages.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Discussion not found"),
    }
}

async fn post_message(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(author) = profile_for(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    let mut messages = state.messages.lock();
    let Some(thread) = messages.get_mut(&id) else {
        return detail(StatusCode::NOT_FOUND, "Discussion not found");
    };
    let message = json!({
        "id": thread.len() + 1,
        "content": body["content"],
        "userId": author["id"],
        "userName": author["username"],
        "createdAt": "2024-03-01T10:00:00Z"
    });
    thread.push(message.clone());
    (StatusCode::CREATED, Json(message)).into_response()
}
