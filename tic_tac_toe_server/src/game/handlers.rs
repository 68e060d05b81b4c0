use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use std::{str::FromStr, sync::Arc};
use tracing::{error, info, warn};

use crate::app_state::AppState;
use crate::game::error::{InvalidMark, InvalidSeat};
use crate::game::message::{MoveForm, MoveReply, StartGameForm};
use crate::game::models::{GameBoard, Mark, Move, Seat};
use crate::game::service::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidMark(#[from] InvalidMark),
    #[error(transparent)]
    InvalidSeat(#[from] InvalidSeat),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidMark(_) | ApiError::InvalidSeat(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::Precondition(_)) => StatusCode::PRECONDITION_FAILED,
            ApiError::Service(ServiceError::Rejected(_)) => StatusCode::CONFLICT,
            ApiError::Service(ServiceError::Halted) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Service(ServiceError::Persistence(_) | ServiceError::Encode(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("❌ Request failed: {}", self);
        } else {
            warn!("⚠️ Request rejected: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

pub async fn new_game() -> Redirect {
    Redirect::to("/tictactoe.html")
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StartGameForm>,
) -> Result<Json<GameBoard>, ApiError> {
    info!("📥 Received START_GAME request - Mark: {}", form.mark);

    let mark = Mark::from_str(&form.mark)?;
    let board = state.game.start_game(mark).await?;
    Ok(Json(board))
}

pub async fn join_game(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    info!("📥 Received JOIN_GAME request");

    state.game.join().await?;
    Ok(Redirect::to("/tictactoe.html?p=2"))
}

/// Rejected moves are a normal reply carrying `moveValidity: false`, not an HTTP error.
pub async fn make_move(
    State(state): State<Arc<AppState>>,
    Path(seat): Path<i64>,
    Form(form): Form<MoveForm>,
) -> Result<Json<MoveReply>, ApiError> {
    info!(
        "📥 MOVE request received - Player: {}, Position: ({}, {})",
        seat, form.x, form.y
    );

    let mv = Move::new(Seat::try_from(seat)?, form.x, form.y);
    match state.game.make_move(mv).await {
        Ok(_) => Ok(Json(MoveReply::accepted())),
        Err(ServiceError::Rejected(rejection)) => Ok(Json(MoveReply::rejected(&rejection))),
        Err(err) => Err(err.into()),
    }
}

pub async fn board(State(state): State<Arc<AppState>>) -> Json<GameBoard> {
    Json(state.game.snapshot().await)
}

pub async fn echo(body: String) -> String {
    body
}
