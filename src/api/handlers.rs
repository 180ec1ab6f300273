//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    error::{RoomError, TimerError},
    state::{AppState, LocalRoom, StateError, TimerDurations},
};
use super::responses::{ApiResponse, ErrorResponse, HealthResponse, StatusResponse};

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Stage size used to project avatars into pixels when none is given
const DEFAULT_STAGE_WIDTH: f64 = 960.0;
const DEFAULT_STAGE_HEIGHT: f64 = 540.0;

#[derive(Debug, Deserialize)]
pub struct StageQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Deserialize)]
pub struct StatusMessageRequest {
    pub status: Option<String>,
    pub shared: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HoverRequest {
    pub id: String,
    pub hovering: bool,
}

#[derive(Debug, Deserialize)]
pub struct LowPowerRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationsRequest {
    pub focus_minutes: i64,
    pub break_minutes: i64,
}

fn reject(action: &str, e: StateError) -> (StatusCode, Json<ErrorResponse>) {
    let code = match &e {
        StateError::Room(RoomError::Timer(TimerError::InvalidDuration { .. })) => {
            warn!("Rejected {}: {}", action, e);
            StatusCode::BAD_REQUEST
        }
        _ => {
            error!("Failed to apply {}: {}", action, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (code, Json(ErrorResponse::new(e.to_string())))
}

/// Run an action against the room and answer with the resulting timer
fn room_action<F>(state: &AppState, action: &str, apply: F) -> ApiResult<ApiResponse>
where
    F: FnOnce(&mut LocalRoom) -> Result<String, RoomError>,
{
    let result = state.update_room(action, |room| {
        let message = apply(room)?;
        Ok((message, room.timer_state(), room.connection_status()))
    });

    match result {
        Ok((message, timer, connection)) => {
            info!("{} endpoint called - {}", action, message);
            Ok(Json(ApiResponse::ok(message, timer, connection)))
        }
        Err(e) => Err(reject(action, e)),
    }
}

/// Handle POST /timer/toggle - Start or pause the timer
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    room_action(&state, "timer-toggle", |room| {
        let timer = room.toggle_running();
        Ok(if timer.is_running { "Timer started" } else { "Timer paused" }.to_string())
    })
}

/// Handle POST /timer/reset - Back to a stopped focus phase
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    room_action(&state, "timer-reset", |room| {
        room.reset_timer()?;
        Ok("Timer reset".to_string())
    })
}

/// Handle POST /timer/skip - Jump to the other phase
pub async fn skip_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    room_action(&state, "timer-skip", |room| {
        let timer = room.skip_phase()?;
        Ok(format!("Skipped to {}", timer.phase))
    })
}

/// Handle POST /timer/mode - Switch between solo and shared
pub async fn mode_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    room_action(&state, "timer-mode", |room| {
        let timer = room.toggle_mode()?;
        Ok(format!("Timer mode set to {}", timer.mode))
    })
}

/// Handle POST /timer/durations - Change focus and break lengths
pub async fn durations_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationsRequest>,
) -> ApiResult<ApiResponse> {
    room_action(&state, "timer-durations", |room| {
        let durations = TimerDurations::from_minutes(request.focus_minutes, request.break_minutes)?;
        room.set_durations(durations)?;
        Ok(format!(
            "Durations set to {}m focus / {}m break",
            request.focus_minutes, request.break_minutes
        ))
    })
}

/// Handle POST /move - Walk the local avatar toward a normalized point
pub async fn move_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<ApiResponse> {
    room_action(&state, "move", |room| {
        room.move_to(request.x, request.y);
        let target = room.reconciler().target();
        Ok(format!("Walking to ({:.3}, {:.3})", target.x, target.y))
    })
}

/// Handle POST /status-message - Set the local status and whether it is shared
pub async fn status_message_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatusMessageRequest>,
) -> ApiResult<ApiResponse> {
    room_action(&state, "status-message", |room| {
        room.set_status(request.status.as_deref());
        if let Some(shared) = request.shared {
            room.set_share_status(shared);
        }
        Ok(match room.reconciler().status() {
            Some(status) => format!("Status set to \"{}\"", status),
            None => "Status cleared".to_string(),
        })
    })
}

/// Handle POST /hover - Mark an avatar as hovered or not
pub async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HoverRequest>,
) -> ApiResult<ApiResponse> {
    room_action(&state, "hover", |room| {
        room.set_hover(&request.id, request.hovering);
        Ok(match room.reconciler().hovered() {
            Some(id) => format!("Hovering {}", id),
            None => "No avatar hovered".to_string(),
        })
    })
}

/// Handle POST /low-power - Toggle the low power cadence
pub async fn low_power_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LowPowerRequest>,
) -> ApiResult<ApiResponse> {
    room_action(&state, "low-power", |room| {
        room.set_low_power(request.enabled);
        Ok(format!("Low power {}", if request.enabled { "enabled" } else { "disabled" }))
    })
}

/// Handle GET /status - Return the current room snapshot
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Query(stage): Query<StageQuery>,
) -> ApiResult<StatusResponse> {
    let width = stage.width.unwrap_or(DEFAULT_STAGE_WIDTH);
    let height = stage.height.unwrap_or(DEFAULT_STAGE_HEIGHT);
    let (last_action, last_action_time) = state.get_last_action();
    let hub_online = state.hub.is_online();

    let snapshot = state.read_room(|room| {
        let timer = room.timer_state();
        StatusResponse {
            identity: room.identity().clone(),
            timer,
            remaining_seconds: timer.remaining_seconds(),
            shared_snapshot: room.shared_snapshot(),
            durations: room.durations(),
            connection: room.connection_status(),
            hub_online,
            online_count: room.online_count(),
            low_power: room.low_power(),
            status_message: room.reconciler().status().map(str::to_string),
            avatars: room.render_list(width, height),
            notices: room.notices().cloned().collect(),
            uptime: state.get_uptime(),
            port: state.port,
            host: state.host.clone(),
            last_action,
            last_action_time,
        }
    });

    snapshot.map(Json).map_err(|e| reject("status", e))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
