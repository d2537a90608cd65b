use crate::app::{App, AppError, LoadOutcome, SearchOutcome};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

async fn start_app(app: App) {
    let listen_addr = app.listen_addr().to_string();
    let shared_state = Arc::new(SharedState { app: Arc::new(app) });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = Router::new()
        .route("/", get(index_page))
        .route("/api/catalog", get(catalog))
        .route("/api/course/load", post(load_course))
        .route("/api/search", post(search))
        .route("/api/status", get(status))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(app: App) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app).await });
}

// Make our own error that wraps `AppError`.
#[derive(Debug)]
struct HttpError(AppError);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::UnknownCourse(_) => (
                axum::http::StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Embedding(_)
            | AppError::Index(_)
            | AppError::IndexCourse(_)
            | AppError::Internal(_)
            | AppError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

#[derive(Debug, Serialize)]
struct CourseEntry {
    title: String,
    url: String,
}

async fn catalog(State(state): State<Arc<SharedState>>) -> Json<Vec<CourseEntry>> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let courses = app
            .catalog()
            .into_iter()
            .map(|(title, url)| CourseEntry { title, url })
            .collect();
        Json(courses)
    })
}

#[derive(Debug, Deserialize)]
struct LoadCourseRequest {
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum LoadCourseResponse {
    Indexed { course: String, count: usize },
    NoVideos,
}

async fn load_course(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<LoadCourseRequest>,
) -> Result<Json<LoadCourseResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let response = match app.load_course(&payload.title)? {
            LoadOutcome::Indexed { name, count } => LoadCourseResponse::Indexed {
                course: name,
                count,
            },
            LoadOutcome::NoVideos => LoadCourseResponse::NoVideos,
        };
        Ok(Json(response))
    })
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct MatchEntry {
    title: String,
    url: String,
    score: f32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum SearchResponse {
    NoCourseLoaded,
    NoCloseMatches {
        course: String,
    },
    Matches {
        course: String,
        matches: Vec<MatchEntry>,
    },
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let response = match app.search(&payload.query, None)? {
            SearchOutcome::NoCourseLoaded => SearchResponse::NoCourseLoaded,
            SearchOutcome::NoCloseMatches { course } => SearchResponse::NoCloseMatches { course },
            SearchOutcome::Matches { course, matches } => SearchResponse::Matches {
                course,
                matches: matches
                    .into_iter()
                    .map(|m| MatchEntry {
                        url: m.record.watch_url(),
                        title: m.record.title,
                        score: m.score,
                    })
                    .collect(),
            },
        };
        Ok(Json(response))
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    model: String,
    course: Option<String>,
    indexed: usize,
}

async fn status(State(state): State<Arc<SharedState>>) -> Json<StatusResponse> {
    let app = state.app.clone();

    let (course, indexed) = match app.active_course() {
        Some((name, count)) => (Some(name), count),
        None => (None, 0),
    };

    Json(StatusResponse {
        model: app.model_name().to_string(),
        course,
        indexed,
    })
}
