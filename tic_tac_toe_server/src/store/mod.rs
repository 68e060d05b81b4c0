//! Durable snapshot of the single game board.

mod error;
mod models;
mod schema;
mod sqlite;

pub use error::StoreError;
pub use sqlite::SqliteStore;

use crate::game::models::GameBoard;

/// Storage for the one live game.
///
/// `save` must not return before the write is durable, and saving the same
/// board twice must leave the same stored representation.
pub trait GameStore: Send {
    /// Reconstructs the last saved board, or `None` if nothing was ever saved.
    fn load(&mut self) -> Result<Option<GameBoard>, StoreError>;

    fn save(&mut self, board: &GameBoard) -> Result<(), StoreError>;

    /// Clears all stored state in one step.
    fn reset(&mut self) -> Result<(), StoreError>;

    /// Clears all stored state and saves `board` as one atomic write.
    /// On failure the previously stored game is still what `load` returns.
    fn replace(&mut self, board: &GameBoard) -> Result<(), StoreError>;
}
