// --------------------------------------------------
// Handles API endpoints that read and write the saved
// JSON state documents.
//
// Responsibilities:
// - Playlist progress      (/load, /save)
// - Movie progress         (/movies-progress)
// - Alarm settings         (/alarm-settings)
// -------------------------------------------------

use std::{io, sync::Arc};

use axum::{extract::State, Json};
use serde_json::Value;

use crate::error::StoreError;
use crate::models::{StateDocument, StatusResponse, StoreKey};
use crate::AppState;

// Store calls lock and fsync, so they run on the blocking pool and never
// hold a runtime worker.
async fn load(state: &AppState, key: StoreKey) -> Json<StateDocument> {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.load(key)).await {
        Ok(doc) => Json(doc),
        Err(e) => {
            tracing::warn!(?key, error = %e, "load task failed, using default");
            Json(key.default_document())
        }
    }
}

async fn save(
    state: &AppState,
    key: StoreKey,
    body: Value,
) -> Result<Json<StatusResponse>, StoreError> {
    let store = Arc::clone(&state.store);
    let path = store.path_for(key);
    tokio::task::spawn_blocking(move || store.save(key, body))
        .await
        .map_err(|e| {
            tracing::error!(?key, error = %e, "save task failed");
            StoreError::StorageUnavailable {
                path,
                source: io::Error::other(e),
            }
        })??;
    Ok(Json(StatusResponse::ok()))
}

// -----------------------------
// GET /load
// Returns playlist progress, {} when nothing is saved
// -----------------------------
pub async fn load_progress(State(state): State<AppState>) -> Json<StateDocument> {
    load(&state, StoreKey::Progress).await
}

// -----------------------------
// POST /save
// Replaces playlist progress with the request body
// -----------------------------
pub async fn save_progress(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<StatusResponse>, StoreError> {
    save(&state, StoreKey::Progress, body).await
}

// -----------------------------
// GET /movies-progress
// -----------------------------
pub async fn load_movies_progress(State(state): State<AppState>) -> Json<StateDocument> {
    load(&state, StoreKey::MoviesProgress).await
}

// -----------------------------
// POST /movies-progress
// -----------------------------
pub async fn save_movies_progress(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<StatusResponse>, StoreError> {
    save(&state, StoreKey::MoviesProgress, body).await
}

// -----------------------------
// GET /alarm-settings
// Falls back to 08:00, disabled
// -----------------------------
pub async fn load_alarm_settings(State(state): State<AppState>) -> Json<StateDocument> {
    load(&state, StoreKey::AlarmSettings).await
}

// -----------------------------
// POST /alarm-settings
// -----------------------------
pub async fn save_alarm_settings(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<StatusResponse>, StoreError> {
    save(&state, StoreKey::AlarmSettings, body).await
}
