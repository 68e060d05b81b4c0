pub mod app_state;
pub mod broadcast;
pub mod config;
pub mod game;
pub mod store;
pub mod ws_socket;

use axum::{
    routing::{get, post},
    Router,
};
use std::{path::Path, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::app_state::AppState;
use crate::game::handlers;
use crate::ws_socket::ws_handler;

/// Builds the HTTP and websocket routes. Paths without a route fall back to
/// files under `static_dir` when one is given.
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/newgame", get(handlers::new_game))
        .route("/startgame", post(handlers::start_game))
        .route("/joingame", get(handlers::join_game))
        .route("/move/{seat}", post(handlers::make_move))
        .route("/board", get(handlers::board))
        .route("/echo", post(handlers::echo))
        .route("/gameboard", get(ws_handler));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
