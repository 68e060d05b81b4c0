use crate::broadcast::BroadcastHub;
use crate::game::service::GameService;

pub struct AppState {
    pub game: GameService,
    pub hub: BroadcastHub,
}

impl AppState {
    pub fn new(game: GameService, hub: BroadcastHub) -> Self {
        AppState { game, hub }
    }
}
