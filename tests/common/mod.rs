#![allow(dead_code)]

use std::io::Write;
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use axum::extract::{Form, Path, State};
use axum::http::header::{COOKIE, REFERER, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use delete_old_releases::Session;
use delete_old_releases::auth::{LOGIN_PATH, TWO_FACTOR_PATH};
use delete_old_releases::credentials::{PASSWORD_VAR, USERNAME_VAR};
use serde::Deserialize;
use tempfile::NamedTempFile;
use url::Url;

pub const PACKAGE: &str = "snowflake-connector-python-nightly";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "hunter2";
pub const TOTP_CODE: &str = "123456";

const LOGIN_TOKEN: &str = "login-token";
const TWO_FACTOR_TOKEN: &str = "two-factor-token";
const SESSION_COOKIE: &str = "session_id=authenticated";

static LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that read or write the process environment.
pub fn lock() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// A `.env` file holding the account the mock index accepts.
pub fn env_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# mock index account").unwrap();
    writeln!(file, "{}={}", USERNAME_VAR, USERNAME).unwrap();
    writeln!(file, "{}={}", PASSWORD_VAR, PASSWORD).unwrap();
    file
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub package: String,
    pub releases: Vec<String>,
    pub two_factor: bool,
    pub login_status: StatusCode,
    pub login_page_has_token: bool,
}

impl MockConfig {
    pub fn new(releases: &[&str]) -> Self {
        MockConfig {
            package: PACKAGE.to_string(),
            releases: releases.iter().map(|r| r.to_string()).collect(),
            two_factor: false,
            login_status: StatusCode::OK,
            login_page_has_token: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub login_posts: usize,
    pub two_factor_posts: usize,
    pub delete_posts: usize,
    pub deleted: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    recorded: Arc<Mutex<Recorded>>,
}

/// In-process stand-in for the package index, served on an ephemeral port
/// from its own tokio runtime so blocking clients can talk to it.
pub struct MockIndex {
    pub url: Url,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockIndex {
    pub fn start(config: MockConfig) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let app = router(AppState {
            config: Arc::new(config),
            recorded: recorded.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        MockIndex {
            url: Url::parse(&format!("http://{}", addr)).unwrap(),
            recorded,
        }
    }

    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    pub fn session(&self) -> Session {
        Session::with_builder(
            self.url.clone(),
            reqwest::blocking::Client::builder().no_proxy(),
        )
        .unwrap()
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/pypi/{package}/json", get(project_json))
        .route(LOGIN_PATH, get(login_page).post(login_submit))
        .route(TWO_FACTOR_PATH, get(two_factor_page).post(two_factor_submit))
        .route("/manage/projects/", get(projects_page))
        .route(
            "/manage/project/{package}/release/{version}/",
            get(release_page).post(release_delete),
        )
        .route("/manage/project/{package}/releases/", get(projects_page))
        .with_state(state)
}

fn form_page(action: &str, token: Option<&str>) -> Html<String> {
    let token = token
        .map(|t| format!(r#"<input name="csrf_token" type="hidden" value="{}">"#, t))
        .unwrap_or_default();
    Html(format!(
        r#"<html><body><form method="POST" action="{}">{}<button type="submit">Go</button></form></body></html>"#,
        action, token
    ))
}

fn authenticated(headers: &HeaderMap) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == SESSION_COOKIE))
}

fn referer_path_is(headers: &HeaderMap, path: &str) -> bool {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .is_some_and(|u| u.path() == path)
}

fn session_cookie() -> [(axum::http::HeaderName, String); 1] {
    [(SET_COOKIE, format!("{}; Path=/; HttpOnly", SESSION_COOKIE))]
}

async fn project_json(State(state): State<AppState>, Path(package): Path<String>) -> Response {
    if package != state.config.package {
        return StatusCode::NOT_FOUND.into_response();
    }
    let releases: serde_json::Map<String, serde_json::Value> = state
        .config
        .releases
        .iter()
        .map(|r| (r.clone(), serde_json::json!([])))
        .collect();
    Json(serde_json::json!({
        "info": { "name": package },
        "releases": releases,
    }))
    .into_response()
}

async fn login_page(State(state): State<AppState>) -> Html<String> {
    form_page(
        LOGIN_PATH,
        state.config.login_page_has_token.then_some(LOGIN_TOKEN),
    )
}

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: String,
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    state.recorded.lock().unwrap().login_posts += 1;

    if form.csrf_token != LOGIN_TOKEN || !referer_path_is(&headers, LOGIN_PATH) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if form.username != USERNAME || form.password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            form_page(LOGIN_PATH, Some(LOGIN_TOKEN)),
        )
            .into_response();
    }
    if state.config.two_factor {
        return Redirect::to("/account/two-factor/?next=%2Fmanage%2Fprojects%2F").into_response();
    }
    (
        state.config.login_status,
        session_cookie(),
        Html("<p>Welcome back</p>"),
    )
        .into_response()
}

async fn two_factor_page() -> Html<String> {
    form_page(TWO_FACTOR_PATH, Some(TWO_FACTOR_TOKEN))
}

#[derive(Deserialize)]
struct TwoFactorForm {
    csrf_token: String,
    method: String,
    totp_value: String,
}

async fn two_factor_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TwoFactorForm>,
) -> Response {
    state.recorded.lock().unwrap().two_factor_posts += 1;

    if form.csrf_token != TWO_FACTOR_TOKEN
        || form.method != "totp"
        || !referer_path_is(&headers, TWO_FACTOR_PATH)
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if form.totp_value != TOTP_CODE {
        return (
            StatusCode::UNAUTHORIZED,
            form_page(TWO_FACTOR_PATH, Some(TWO_FACTOR_TOKEN)),
        )
            .into_response();
    }
    (session_cookie(), Redirect::to("/manage/projects/")).into_response()
}

async fn projects_page() -> Html<&'static str> {
    Html("<p>Your projects</p>")
}

async fn release_page(
    headers: HeaderMap,
    Path((package, version)): Path<(String, String)>,
) -> Response {
    if !authenticated(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let action = format!("/manage/project/{}/release/{}/", package, version);
    let token = format!("delete-{}", version);
    form_page(&action, Some(&token)).into_response()
}

#[derive(Deserialize)]
struct DeleteForm {
    confirm_delete_version: String,
    csrf_token: String,
}

async fn release_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((package, version)): Path<(String, String)>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let mut recorded = state.recorded.lock().unwrap();
    recorded.delete_posts += 1;

    let page = format!("/manage/project/{}/release/{}/", package, version);
    if !authenticated(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if form.csrf_token != format!("delete-{}", version)
        || form.confirm_delete_version != version
        || !referer_path_is(&headers, &page)
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if package != state.config.package || !state.config.releases.contains(&version) {
        return StatusCode::NOT_FOUND.into_response();
    }

    recorded.deleted.push(version);
    Redirect::to(&format!("/manage/project/{}/releases/", package)).into_response()
}
