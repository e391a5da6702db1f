use axum::{extract::State, Json};

use crate::error::PlugError;
use crate::models::{PowerInput, PowerResponse};
use crate::AppState;

// -----------------------------
// POST /tv-power
// Forwards {"on": bool} to the smart plug
// -----------------------------
pub async fn set_tv_power(
    State(state): State<AppState>,
    Json(input): Json<PowerInput>,
) -> Result<Json<PowerResponse>, PlugError> {
    let device = match state.plug.set_power(input.on).await {
        Ok(device) => device,
        Err(e) => {
            tracing::warn!(on = input.on, url = state.plug.url(), error = %e, "tv power request failed");
            return Err(e);
        }
    };

    tracing::info!(on = input.on, "tv power switched");
    Ok(Json(PowerResponse {
        status: "ok".to_string(),
        on: input.on,
        device,
    }))
}
