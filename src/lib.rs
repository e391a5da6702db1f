// Define data modules
pub mod config; // Start-up configuration (dirs, bind address, plug url)
pub mod error; // Error types and their HTTP mapping
pub mod media; // Movies directory listing and safe lookup
pub mod models; // Store keys, documents, request/response bodies
pub mod plug; // Smart-plug client
pub mod store; // Durable JSON state files
pub mod routes_media; // HTTP handlers for movie list & streaming
pub mod routes_power; // HTTP handler for TV power
pub mod routes_state; // HTTP handlers for progress & alarm state

use std::sync::Arc;

use axum::{
    routing::{get, post}, // HTTP method helpers
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::media::MediaLibrary;
use crate::plug::PlugClient;
use crate::store::JsonStore;

/// Shared handles injected into every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub media: Arc<MediaLibrary>,
    pub plug: PlugClient,
}

impl AppState {
    pub fn new(store: JsonStore, media: MediaLibrary, plug: PlugClient) -> Self {
        Self {
            store: Arc::new(store),
            media: Arc::new(media),
            plug,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // playlist progress
        .route("/load", get(routes_state::load_progress))
        .route("/save", post(routes_state::save_progress))
        // movies
        .route(
            "/movies-progress",
            get(routes_state::load_movies_progress).post(routes_state::save_movies_progress),
        )
        .route("/movies-list", get(routes_media::list_movies))
        .route("/get-movie/:filename", get(routes_media::get_movie))
        // alarm
        .route(
            "/alarm-settings",
            get(routes_state::load_alarm_settings).post(routes_state::save_alarm_settings),
        )
        // hardware
        .route("/tv-power", post(routes_power::set_tv_power))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
