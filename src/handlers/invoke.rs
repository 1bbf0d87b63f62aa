use crate::dispatcher;
use crate::models::{Event, ResponseEnvelope};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// POST /invoke handler - Dispatch a routeKey event
///
/// Accepts the gateway-style event JSON and returns the response envelope.
/// The HTTP status is always 200; the operation outcome lives in the
/// envelope's statusCode, matching how a function invocation surface
/// reports results.
#[utoipa::path(
    post,
    path = routes::INVOKE,
    request_body = Event,
    responses(
        (status = 200, description = "Response envelope for the dispatched event", body = ResponseEnvelope)
    ),
    tag = "products"
)]
pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let response = dispatcher::dispatch(&state.store, event).await;
    (StatusCode::OK, Json(response))
}
