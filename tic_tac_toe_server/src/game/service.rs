use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use super::error::{InvalidMove, PreconditionError};
use super::models::{GameBoard, Mark, Move, Phase};
use crate::broadcast::BroadcastHub;
use crate::store::{GameStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Rejected(#[from] InvalidMove),
    #[error("failed to persist game state: {0}")]
    Persistence(#[source] StoreError),
    #[error("game state could not be persisted earlier, no further changes are accepted until restart")]
    Halted,
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The single authoritative game.
///
/// Every transition runs under the board's write lock and follows the same
/// sequence on a copy of the board: transition, encode, persist, commit,
/// publish. A rejected transition or a failed write leaves the in-memory board
/// untouched. After a failed write the service refuses all further changes.
pub struct GameService {
    board: RwLock<GameBoard>,
    // Only locked while `board` is write-locked, from the blocking pool.
    store: Arc<Mutex<Box<dyn GameStore>>>,
    hub: BroadcastHub,
    halted: AtomicBool,
}

impl GameService {
    /// Restores the last saved game from `store`, or starts from an empty board.
    pub fn new(mut store: impl GameStore + 'static, hub: BroadcastHub) -> Result<Self, StoreError> {
        let board = match store.load()? {
            Some(board) => board,
            None => {
                info!("No saved game, starting with an empty board");
                GameBoard::new()
            }
        };

        Ok(Self {
            board: RwLock::new(board),
            store: Arc::new(Mutex::new(Box::new(store))),
            hub,
            halted: AtomicBool::new(false),
        })
    }

    pub async fn snapshot(&self) -> GameBoard {
        self.board.read().await.clone()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Throws away the current game, wipes the saved copy and seats player 1 with `mark`.
    #[instrument(skip(self))]
    pub async fn start_game(&self, mark: Mark) -> Result<GameBoard, ServiceError> {
        let mut board = self.board.write().await;
        self.ensure_running()?;

        let mut next = GameBoard::new();
        next.assign_player1(mark)?;

        let staged = next.clone();
        self.persist(move |store| store.replace(&staged)).await?;

        *board = next.clone();
        info!("New game started, player 1 plays {}", mark);
        Ok(next)
    }

    #[instrument(skip(self))]
    pub async fn join(&self) -> Result<GameBoard, ServiceError> {
        let mut board = self.board.write().await;
        self.ensure_running()?;

        let mut next = board.clone();
        let player = next.assign_player2()?;
        self.commit(&mut board, next).await?;

        info!("Player 2 joined with {}, game started", player.mark);
        Ok(board.clone())
    }

    #[instrument(skip(self))]
    pub async fn make_move(&self, mv: Move) -> Result<Phase, ServiceError> {
        let mut board = self.board.write().await;
        self.ensure_running()?;

        let mut next = board.clone();
        let phase = next.apply_move(mv).inspect_err(|rejection| {
            debug!(code = rejection.code(), "Move rejected: {}", rejection);
        })?;
        self.commit(&mut board, next).await?;

        info!(
            "Move applied: player {} at ({}, {}), now {:?}",
            mv.seat, mv.row, mv.col, phase
        );
        Ok(phase)
    }

    /// Persists `next`, installs it as the current board and publishes it to viewers.
    async fn commit(&self, board: &mut GameBoard, next: GameBoard) -> Result<(), ServiceError> {
        let snapshot = serde_json::to_string(&next)?;
        let staged = next.clone();
        self.persist(move |store| store.save(&staged)).await?;

        *board = next;
        self.hub.publish(snapshot);
        Ok(())
    }

    /// Runs `write` against the store on the blocking pool and waits for it.
    ///
    /// Callers hold the board's write lock, so writes never overlap and the
    /// caller only replies once the write is durable.
    async fn persist<F>(&self, write: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut dyn GameStore) -> Result<(), StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut store = store.lock()?;
            write(&mut **store)
        })
        .await
        .map_err(StoreError::from)
        .and_then(|written| written)
        .map_err(|e| self.halt(e))
    }

    fn ensure_running(&self) -> Result<(), ServiceError> {
        if self.is_halted() {
            return Err(ServiceError::Halted);
        }
        Ok(())
    }

    fn halt(&self, err: StoreError) -> ServiceError {
        error!("Persisting game state failed, halting further changes: {}", err);
        self.halted.store(true, Ordering::SeqCst);
        ServiceError::Persistence(err)
    }
}
