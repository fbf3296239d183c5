use crate::commands::db::Store;
use crate::commands::scheduler::SharedRefreshStatus;
use crate::commands::views::{self, ViewError};
use crate::models::network::{
    DaoGriResponse, DaoListResponse, DaoOverviewResponse, DaoProposalsResponse,
    NetworkHealthResponse, NetworkStatusResponse, ProposalDetailResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub refresh: SharedRefreshStatus,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/daos", get(list_daos))
        .route("/dao/:id/overview", get(dao_overview))
        .route("/dao/:id/proposals", get(dao_proposals))
        .route("/dao/:id/gri", get(dao_gri))
        .route("/dao/:id/proposal/:proposal_id", get(proposal_detail))
        .route("/network/health", get(network_health))
        .route("/network/status", get(network_status))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Browser access for the listed origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring invalid CORS origin {origin:?}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers(Any)
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        match self {
            ViewError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            e @ (ViewError::Store(_) | ViewError::Worker(_)) => {
                log::error!("Store error while serving request: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Store unavailable" })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ViewError>;

/// Run a read model on the blocking pool so SQLite scans stay off the
/// async workers.
async fn with_store<T, F>(state: &AppState, view: F) -> ApiResult<T>
where
    F: FnOnce(&Store) -> Result<T, ViewError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || view(&store))
        .await
        .map_err(|e| ViewError::Worker(e.to_string()))?
        .map(Json)
}

async fn service_info() -> impl IntoResponse {
    Json(json!({
        "name": "Governance Reality Index (GRI) API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "NEAR Protocol governance observability and telemetry",
        "endpoints": [
            "GET /daos",
            "GET /dao/:id/overview",
            "GET /dao/:id/proposals",
            "GET /dao/:id/gri",
            "GET /dao/:id/proposal/:proposalId",
            "GET /network/health",
            "GET /network/status",
        ],
    }))
}

/// GET /daos
async fn list_daos(State(state): State<AppState>) -> ApiResult<DaoListResponse> {
    with_store(&state, views::list_daos).await
}

/// GET /dao/:id/overview
async fn dao_overview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DaoOverviewResponse> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    with_store(&state, move |store| views::dao_overview(store, &id, now_ms)).await
}

#[derive(Debug, Deserialize)]
struct ProposalsQuery {
    status: Option<String>,
}

/// GET /dao/:id/proposals?status=
async fn dao_proposals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ProposalsQuery>,
) -> ApiResult<DaoProposalsResponse> {
    let status = query.status.filter(|s| !s.is_empty());
    with_store(&state, move |store| {
        views::dao_proposals(store, &id, status.as_deref())
    })
    .await
}

/// GET /dao/:id/gri
async fn dao_gri(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DaoGriResponse> {
    with_store(&state, move |store| views::dao_gri(store, &id)).await
}

/// GET /dao/:id/proposal/:proposal_id
async fn proposal_detail(
    State(state): State<AppState>,
    Path((id, proposal_id)): Path<(String, String)>,
) -> ApiResult<ProposalDetailResponse> {
    with_store(&state, move |store| {
        // A non-numeric id can never match a stored proposal.
        let Ok(proposal_id) = proposal_id.parse::<u64>() else {
            return match store.find_dao(&id)? {
                Some(_) => Err(ViewError::NotFound("Proposal")),
                None => Err(ViewError::NotFound("DAO")),
            };
        };
        views::proposal_detail(store, &id, proposal_id)
    })
    .await
}

/// GET /network/health
async fn network_health(
    State(state): State<AppState>,
) -> ApiResult<NetworkHealthResponse> {
    let now = chrono::Utc::now();
    with_store(&state, move |store| views::network_health(store, now)).await
}

/// GET /network/status
async fn network_status(
    State(state): State<AppState>,
) -> ApiResult<NetworkStatusResponse> {
    let refresh = state.refresh.read().await.clone();
    with_store(&state, move |store| views::network_status(store, refresh)).await
}
