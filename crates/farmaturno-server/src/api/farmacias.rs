//! The publisher endpoint: the last committed dataset, byte for byte.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use super::{AppState, ErrorBody};
use crate::middleware::RequestId;

pub(super) const NOT_READY_MESSAGE: &str =
    "Los datos de las farmacias aún no están disponibles. Intente en unos momentos.";
const UNREADABLE_MESSAGE: &str = "No fue posible leer los datos de las farmacias.";

/// `GET /api/farmacias`
///
/// Re-reads storage on every call. Before the first successful collection
/// the answer is 503 with a fixed message, never an empty list.
pub(super) async fn get_dataset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    match state.store.read_raw().await {
        Ok(Some(bytes)) => (
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Ok(None) => {
            tracing::debug!(request_id = %req_id.0, "dataset requested before first collection");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(NOT_READY_MESSAGE)),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %req_id.0, error = %e, "dataset read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(UNREADABLE_MESSAGE)),
            )
                .into_response()
        }
    }
}
