mod farmacias;

use std::path::Path;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use farmaturno_core::{Region, REGIONS};
use farmaturno_store::DatasetStore;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::middleware::{request_id, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub store: DatasetStore,
}

/// Error body shared by the JSON endpoints. The map client shows `error`
/// to the user as-is.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl ErrorBody {
    pub(super) fn new(error: &'static str) -> Self {
        Self { error }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    dataset: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<DateTime<Utc>>,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Full application router: the JSON API plus the static map client.
pub fn build_app(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/api/farmacias", get(farmacias::get_dataset))
        .route("/api/health", get(health))
        .route("/api/regiones", get(regions))
        .fallback_service(ServeDir::new(public_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                )),
        )
        .with_state(state)
}

/// Region table for the map client's picker, in code order.
async fn regions() -> Json<&'static [Region]> {
    let regions: &'static [Region] = &REGIONS;
    Json(regions)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let data = match state.store.load().await {
        Ok(Some(dataset)) => HealthData {
            status: "ok",
            dataset: "ready",
            generated_at: Some(dataset.generated_at),
        },
        Ok(None) => HealthData {
            status: "ok",
            dataset: "pending",
            generated_at: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "health check: dataset unreadable");
            HealthData {
                status: "ok",
                dataset: "pending",
                generated_at: None,
            }
        }
    };
    Json(data)
}
