use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::downloader;
use crate::error::SearchError;
use crate::login::{self, AccessGate, Selection, SessionId, SessionStore};
use crate::projection::WidthPolicy;
use crate::table::Tables;
use crate::views::{self, DetailView, GradeOptions, ResultPage, SearchQuery, ViewKind, ViewSpec};

const SESSION_SWEEP: Duration = Duration::from_secs(10 * 60);

/// Shared, read-only application state.
///
/// Tables are loaded before the server starts and never change. Everything that
/// varies per user lives in `sessions`.
pub struct AppState {
    pub tables: Arc<Tables>,
    pub gate: AccessGate,
    pub sessions: SessionStore,
    pub page_size: usize,
    pub widths: WidthPolicy,
}

impl AppState {
    pub fn new(tables: Arc<Tables>, config: &AppConfig) -> Self {
        AppState {
            tables,
            gate: AccessGate::new(&config.auth),
            sessions: SessionStore::default(),
            page_size: config.page_size,
            widths: config.width,
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    status: String,
    message: Option<String>,
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = match &self {
            SearchError::NotFound { .. } => StatusCode::NOT_FOUND,
            SearchError::InvalidCredential => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if self.is_fatal() {
            error!("{}", self);
        }
        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    alloy: Option<String>,
    grade: Option<String>,
    page: Option<usize>,
    format: Option<String>,
}

impl SearchParams {
    fn query(&self, spec: &ViewSpec) -> SearchQuery {
        SearchQuery {
            text: self.q.clone(),
            constraints: spec.constraints_from(|param| match param {
                "alloy" => self.alloy.as_deref(),
                "grade" => self.grade.as_deref(),
                _ => None,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OptionsQuery {
    alloy: Option<String>,
}

#[derive(Serialize)]
struct ViewInfo {
    kind: ViewKind,
    title: &'static str,
}

#[derive(Serialize)]
struct SessionResponse {
    gate_enabled: bool,
    logged_in: bool,
    page_size: usize,
    selection: Option<Selection>,
    views: Vec<ViewInfo>,
}

/// Load the workbook, validate both views and serve until shutdown.
///
/// Data and configuration errors are returned before the listener is bound, so a
/// broken workbook never produces a half-working page.
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let store = config.table_store();
    let tables = tokio::task::spawn_blocking(move || store.load()).await??;
    views::validate_views(&tables)?;
    info!(
        "{} records, {} grade rows ready",
        tables.records.len(),
        tables.grades.len()
    );

    let app_state = Arc::new(AppState::new(tables, &config));
    if !app_state.gate.is_enabled() {
        info!("login gate disabled");
    }
    spawn_session_sweeper(app_state.clone());
    let app = router(app_state);

    let listener = TcpListener::bind(&config.listen).await?;
    info!("Listening on http://{}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drop expired sessions every [`SESSION_SWEEP`] for the life of the server.
fn spawn_session_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SESSION_SWEEP);
        loop {
            ticks.tick().await;
            let removed = state.sessions.purge_expired();
            if removed > 0 {
                debug!("dropped {} expired sessions", removed);
            }
        }
    });
}

/// Build the router; everything except the login endpoints sits behind the gate.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/search", get(serve_search))
        .route("/api/session", get(get_session))
        .route("/api/options", get(get_grade_options))
        .route("/api/:view/search", get(search_view))
        .route("/api/:view/detail/:key", get(get_detail))
        .route("/api/:view/export", get(export_view))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/search") }))
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", post(login::handle_logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_search() -> Html<&'static str> {
    Html(include_str!("./static/search.html"))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
) -> Json<SessionResponse> {
    let session = state.sessions.get(&session_id.0).unwrap_or_default();

    Json(SessionResponse {
        gate_enabled: state.gate.is_enabled(),
        logged_in: state.gate.permits(&session),
        page_size: state.page_size,
        selection: session.selection,
        views: [ViewKind::Materials, ViewKind::Grades]
            .into_iter()
            .map(|kind| ViewInfo {
                kind,
                title: kind.spec().title,
            })
            .collect(),
    })
}

async fn get_grade_options(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OptionsQuery>,
) -> Result<Json<GradeOptions>, SearchError> {
    let alloy = params.alloy.as_deref().unwrap_or(crate::filter::ANY);
    Ok(Json(views::grade_options(&state.tables.grades, alloy)?))
}

async fn search_view(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewKind>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultPage>, SearchError> {
    let spec = view.spec();
    let page = spec.page(
        spec.table(&state.tables),
        &params.query(spec),
        params.page.unwrap_or(1),
        state.page_size,
        &state.widths,
    )?;
    Ok(Json(page))
}

/// Resolve one row and remember it as the session's selection.
///
/// A miss clears the selection and answers 404 so the page can show an empty
/// detail panel.
async fn get_detail(
    State(state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
    Path((view, key)): Path<(ViewKind, String)>,
) -> Result<Json<DetailView>, SearchError> {
    let spec = view.spec();
    let detail = spec.detail(spec.table(&state.tables), &key);

    let found = detail.is_ok();
    state
        .sessions
        .update(&session_id.0, |session| session.record_detail(view, &key, found));

    Ok(Json(detail?))
}

async fn export_view(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewKind>,
    Query(params): Query<SearchParams>,
) -> Result<Response, SearchError> {
    let spec = view.spec();
    let table = spec.export_table(spec.table(&state.tables), &params.query(spec))?;

    let (content_type, extension, body) = match params.format.as_deref().unwrap_or("csv") {
        "csv" => (
            "text/csv; charset=utf-8",
            "csv",
            downloader::to_csv(&table).into_bytes(),
        ),
        "xlsx" => match downloader::to_xlsx(&table) {
            Ok(bytes) => (
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "xlsx",
                bytes,
            ),
            Err(e) => {
                error!("xlsx export failed: {}", e);
                return Ok((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(e.to_string())),
                )
                    .into_response());
            }
        },
        other => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("unsupported format: {}", other))),
            )
                .into_response());
        }
    };

    let disposition = format!("attachment; filename=\"{}.{}\"", view.as_str(), extension);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
