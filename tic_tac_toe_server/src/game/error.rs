use super::models::Seat;

/// Why a move was refused. The board is left untouched in every case.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidMove {
    #[error("game has not started yet")]
    NotStarted,
    #[error("game is already over")]
    GameFinished,
    #[error("it is player {expected}'s turn, not player {found}'s")]
    WrongTurn { expected: Seat, found: Seat },
    #[error("cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: i32, col: i32 },
    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: i32, col: i32 },
}

impl InvalidMove {
    pub fn wrong_turn(expected: Seat, found: Seat) -> Self {
        Self::WrongTurn { expected, found }
    }

    pub fn out_of_bounds(row: i32, col: i32) -> Self {
        Self::OutOfBounds { row, col }
    }

    pub fn occupied(row: i32, col: i32) -> Self {
        Self::Occupied { row, col }
    }

    /// Stable numeric code reported to clients next to [`InvalidMove::cause`].
    pub fn code(&self) -> u16 {
        match self {
            Self::NotStarted => 101,
            Self::GameFinished => 102,
            Self::WrongTurn { .. } => 103,
            Self::OutOfBounds { .. } => 104,
            Self::Occupied { .. } => 105,
        }
    }

    pub fn cause(&self) -> String {
        self.to_string()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Player 1 not joined yet")]
    Player1NotJoined,
    #[error("Player 1 already joined")]
    Player1AlreadyJoined,
    #[error("Player 2 already joined")]
    Player2AlreadyJoined,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid mark {0:?}, expected X or O")]
pub struct InvalidMark(pub String);

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid player id {0}")]
pub struct InvalidSeat(pub i64);
