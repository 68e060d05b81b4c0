use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info, instrument};

use super::models::{GameBoardRow, PlayerRow, BOARD_ROW_ID};
use super::schema::{game_board, player};
use super::{GameStore, StoreError};
use crate::game::models::GameBoard;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// [`GameStore`] backed by a single SQLite connection held for the process lifetime.
pub struct SqliteStore {
    conn: SqliteConnection,
    path: String,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and applies pending migrations.
    ///
    /// `":memory:"` gives a private in-memory database.
    #[instrument]
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut conn = SqliteConnection::establish(path).map_err(|source| StoreError::Connection {
            path: path.to_string(),
            source,
        })?;
        conn.batch_execute("PRAGMA synchronous = FULL;")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(path, "Opened game store");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }
}

impl GameStore for SqliteStore {
    #[instrument(skip(self), fields(path = %self.path))]
    fn load(&mut self) -> Result<Option<GameBoard>, StoreError> {
        let row = game_board::table
            .find(BOARD_ROW_ID)
            .select(GameBoardRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        let Some(row) = row else {
            debug!("No saved game");
            return Ok(None);
        };

        let players = player::table
            .select(PlayerRow::as_select())
            .load(&mut self.conn)?;
        let board = row.into_board(&players)?;

        info!(phase = ?board.phase(), "Restored saved game");
        Ok(Some(board))
    }

    #[instrument(skip(self, board), fields(path = %self.path))]
    fn save(&mut self, board: &GameBoard) -> Result<(), StoreError> {
        let rows = BoardRows::from(board);
        self.conn
            .immediate_transaction::<_, StoreError, _>(|conn| rows.write(conn))?;

        debug!(board_state = %rows.board.board_state, "Saved game");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path))]
    fn reset(&mut self) -> Result<(), StoreError> {
        self.conn.immediate_transaction::<_, StoreError, _>(clear)?;

        info!("Cleared saved game");
        Ok(())
    }

    #[instrument(skip(self, board), fields(path = %self.path))]
    fn replace(&mut self, board: &GameBoard) -> Result<(), StoreError> {
        let rows = BoardRows::from(board);
        self.conn.immediate_transaction::<_, StoreError, _>(|conn| {
            clear(conn)?;
            rows.write(conn)
        })?;

        info!(board_state = %rows.board.board_state, "Replaced saved game");
        Ok(())
    }
}

fn clear(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    diesel::delete(game_board::table).execute(conn)?;
    diesel::delete(player::table).execute(conn)?;
    Ok(())
}

/// Everything one board occupies on disk.
struct BoardRows {
    players: Vec<PlayerRow>,
    board: GameBoardRow,
}

impl From<&GameBoard> for BoardRows {
    fn from(board: &GameBoard) -> Self {
        Self {
            players: [board.player1(), board.player2()]
                .into_iter()
                .flatten()
                .map(PlayerRow::from)
                .collect(),
            board: GameBoardRow::from(board),
        }
    }
}

impl BoardRows {
    fn write(&self, conn: &mut SqliteConnection) -> Result<(), StoreError> {
        for player_row in &self.players {
            diesel::replace_into(player::table)
                .values(player_row)
                .execute(conn)?;
        }
        diesel::replace_into(game_board::table)
            .values(&self.board)
            .execute(conn)?;
        Ok(())
    }
}
