use crate::detection::Detection;
use crate::server::SharedState;
use axum::{extract::State, Json};
use tracing::instrument;

/// Latest accepted detection batch, re-read from the live store on every
/// request. An empty batch serializes as `[]`.
#[instrument(skip(state))]
pub async fn get_detections(State(state): State<SharedState>) -> Json<Vec<Detection>> {
    let snapshot = state.store.read();
    Json((*snapshot).clone())
}
