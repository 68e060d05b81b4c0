use diesel::prelude::*;
use std::str::FromStr;

use super::{schema, StoreError};
use crate::game::models::{Cell, GameBoard, Grid, Mark, Player, Seat, BOARD_SIZE};

/// The game board table only ever holds this row.
pub const BOARD_ROW_ID: i32 = 1;

const EMPTY_STORED: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::player)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlayerRow {
    pub id: i32,
    pub mark: String,
}

impl From<Player> for PlayerRow {
    fn from(player: Player) -> Self {
        PlayerRow {
            id: seat_id(player.seat),
            mark: player.mark.to_string(),
        }
    }
}

impl PlayerRow {
    fn to_player(&self) -> Result<Player, StoreError> {
        let mark = Mark::from_str(&self.mark)
            .map_err(|e| StoreError::corrupt(format!("player {}: {e}", self.id)))?;
        Ok(Player::new(mark, parse_seat(self.id)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::game_board)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GameBoardRow {
    pub id: i32,
    pub p1: Option<i32>,
    pub p2: Option<i32>,
    pub game_started: bool,
    pub turn: i32,
    pub board_state: String,
    pub winner: Option<i32>,
    pub is_draw: bool,
}

impl From<&GameBoard> for GameBoardRow {
    fn from(board: &GameBoard) -> Self {
        GameBoardRow {
            id: BOARD_ROW_ID,
            p1: board.player1().map(|p| seat_id(p.seat)),
            p2: board.player2().map(|p| seat_id(p.seat)),
            game_started: board.started(),
            turn: seat_id(board.turn()),
            board_state: encode_cells(board.cells()),
            winner: board.winner().map(seat_id),
            is_draw: board.is_draw(),
        }
    }
}

impl GameBoardRow {
    pub fn into_board(self, players: &[PlayerRow]) -> Result<GameBoard, StoreError> {
        let player1 = self.p1.map(|id| find_player(players, id)).transpose()?;
        let player2 = self.p2.map(|id| find_player(players, id)).transpose()?;
        let turn = parse_seat(self.turn)?;
        let winner = self.winner.map(parse_seat).transpose()?;
        let cells = decode_cells(&self.board_state)?;

        GameBoard::restore(
            player1,
            player2,
            self.game_started,
            turn,
            cells,
            winner,
            self.is_draw,
        )
        .map_err(StoreError::corrupt)
    }
}

fn seat_id(seat: Seat) -> i32 {
    match seat {
        Seat::One => 1,
        Seat::Two => 2,
    }
}

fn parse_seat(id: i32) -> Result<Seat, StoreError> {
    Seat::try_from(i64::from(id)).map_err(|e| StoreError::corrupt(e.to_string()))
}

fn find_player(players: &[PlayerRow], id: i32) -> Result<Player, StoreError> {
    players
        .iter()
        .find(|row| row.id == id)
        .ok_or_else(|| StoreError::corrupt(format!("player {id} is referenced but not stored")))?
        .to_player()
}

/// Row-major, one character per cell.
fn encode_cells(cells: &Grid) -> String {
    cells
        .iter()
        .flatten()
        .map(|cell| cell.mark().map_or(EMPTY_STORED, Mark::as_char))
        .collect()
}

fn decode_cells(raw: &str) -> Result<Grid, StoreError> {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() != BOARD_SIZE * BOARD_SIZE {
        return Err(StoreError::corrupt(format!(
            "board state {raw:?} is not {} characters long",
            BOARD_SIZE * BOARD_SIZE
        )));
    }

    let mut cells = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
    for (i, c) in chars.into_iter().enumerate() {
        cells[i / BOARD_SIZE][i % BOARD_SIZE] = match c {
            EMPTY_STORED => Cell::Empty,
            'X' => Cell::Taken(Mark::X),
            'O' => Cell::Taken(Mark::O),
            other => {
                return Err(StoreError::corrupt(format!(
                    "unexpected character {other:?} in board state"
                )))
            }
        };
    }
    Ok(cells)
}
