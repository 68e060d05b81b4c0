use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use tracing::debug;

use super::error::{InvalidMark, InvalidMove, InvalidSeat, PreconditionError};

pub const BOARD_SIZE: usize = 3;

pub type Grid = [[Cell; BOARD_SIZE]; BOARD_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl FromStr for Mark {
    type Err = InvalidMark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Mark::X),
            "O" => Ok(Mark::O),
            other => Err(InvalidMark(other.to_string())),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A player's fixed position in the game. Seat 1 always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }
}

impl TryFrom<i64> for Seat {
    type Error = InvalidSeat;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Seat::One),
            2 => Ok(Seat::Two),
            other => Err(InvalidSeat(other)),
        }
    }
}

impl From<Seat> for i64 {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "type")]
    pub mark: Mark,
    #[serde(rename = "id")]
    pub seat: Seat,
}

impl Player {
    pub fn new(mark: Mark, seat: Seat) -> Self {
        Player { mark, seat }
    }
}

/// One square of the grid. Serialized as a single character, `'\0'` when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Taken(Mark),
}

impl Cell {
    const EMPTY_WIRE: char = '\0';

    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Taken(mark) => Some(mark),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.mark().map_or(Cell::EMPTY_WIRE, Mark::as_char))
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match char::deserialize(deserializer)? {
            Cell::EMPTY_WIRE => Ok(Cell::Empty),
            'X' => Ok(Cell::Taken(Mark::X)),
            'O' => Ok(Cell::Taken(Mark::O)),
            other => Err(serde::de::Error::custom(format!("invalid cell {other:?}"))),
        }
    }
}

/// A request from `seat` to mark the cell at (`row`, `col`).
///
/// Coordinates are kept signed so that out-of-range input reaches the state
/// machine and is rejected there rather than failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub seat: Seat,
    pub row: i32,
    pub col: i32,
}

impl Move {
    pub fn new(seat: Seat, row: i32, col: i32) -> Self {
        Move { seat, row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Mark),
    Draw,
}

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Checks the eight lines of the grid, then fullness.
///
/// A completed line takes precedence over a full grid, so a last move that
/// both fills the board and completes a line is a win.
pub fn evaluate_outcome(cells: &Grid) -> Option<Outcome> {
    for line in LINES {
        let [a, b, c] = line.map(|(row, col)| cells[row][col]);
        if let Cell::Taken(mark) = a {
            if a == b && b == c {
                return Some(Outcome::Winner(mark));
            }
        }
    }

    let full = cells
        .iter()
        .all(|row| row.iter().all(|&cell| cell != Cell::Empty));
    full.then_some(Outcome::Draw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingPlayer1,
    AwaitingPlayer2,
    InProgress,
    Won(Seat),
    Drawn,
}

impl Phase {
    pub fn is_finished(self) -> bool {
        matches!(self, Phase::Won(_) | Phase::Drawn)
    }
}

/// The authoritative game state. Only [`GameBoard::assign_player1`],
/// [`GameBoard::assign_player2`] and [`GameBoard::apply_move`] mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameBoard {
    #[serde(rename = "p1", default, skip_serializing_if = "Option::is_none")]
    player1: Option<Player>,
    #[serde(rename = "p2", default, skip_serializing_if = "Option::is_none")]
    player2: Option<Player>,
    #[serde(rename = "gameStarted")]
    started: bool,
    turn: Seat,
    #[serde(rename = "boardState")]
    cells: Grid,
    #[serde(with = "winner_seat")]
    winner: Option<Seat>,
    #[serde(rename = "isDraw")]
    is_draw: bool,
}

impl Default for GameBoard {
    fn default() -> Self {
        GameBoard {
            player1: None,
            player2: None,
            started: false,
            turn: Seat::One,
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
            winner: None,
            is_draw: false,
        }
    }
}

impl GameBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a board from previously saved fields, refusing any
    /// combination that the transitions could not have produced.
    pub fn restore(
        player1: Option<Player>,
        player2: Option<Player>,
        started: bool,
        turn: Seat,
        cells: Grid,
        winner: Option<Seat>,
        is_draw: bool,
    ) -> Result<Self, &'static str> {
        let board = GameBoard {
            player1,
            player2,
            started,
            turn,
            cells,
            winner,
            is_draw,
        };
        board.check_invariants()?;
        Ok(board)
    }

    fn check_invariants(&self) -> Result<(), &'static str> {
        if self.player1.is_some_and(|p| p.seat != Seat::One) {
            return Err("player 1 does not hold seat 1");
        }
        if self.player2.is_some_and(|p| p.seat != Seat::Two) {
            return Err("player 2 does not hold seat 2");
        }
        match (self.player1, self.player2) {
            (None, Some(_)) => return Err("player 2 joined without player 1"),
            (Some(p1), Some(p2)) if p1.mark == p2.mark => return Err("both players share a mark"),
            _ => {}
        }
        if self.started != self.player2.is_some() {
            return Err("started flag disagrees with player 2");
        }

        let filled = self.cells.iter().flatten().filter(|c| **c != Cell::Empty).count();
        if !self.started {
            if filled > 0 || self.winner.is_some() || self.is_draw || self.turn != Seat::One {
                return Err("game progressed before it started");
            }
            return Ok(());
        }

        let (Some(p1), Some(p2)) = (self.player1, self.player2) else {
            return Err("game started without both players");
        };
        let count = |mark: Mark| {
            self.cells
                .iter()
                .flatten()
                .filter(|c| c.mark() == Some(mark))
                .count()
        };
        let (first, second) = (count(p1.mark), count(p2.mark));
        if first != second && first != second + 1 {
            return Err("players have not alternated moves");
        }

        let recorded = (self.winner, self.is_draw);
        let derived = match evaluate_outcome(&self.cells) {
            Some(Outcome::Winner(mark)) => (self.seat_of(mark), false),
            Some(Outcome::Draw) => (None, true),
            None => (None, false),
        };
        if recorded != derived {
            return Err("recorded result does not match the board");
        }

        let next = if filled % 2 == 0 { Seat::One } else { Seat::Two };
        let expected_turn = if self.phase().is_finished() {
            next.other()
        } else {
            next
        };
        if self.turn != expected_turn {
            return Err("turn does not match the number of moves");
        }
        Ok(())
    }

    pub fn player1(&self) -> Option<Player> {
        self.player1
    }

    pub fn player2(&self) -> Option<Player> {
        self.player2
    }

    pub fn player(&self, seat: Seat) -> Option<Player> {
        match seat {
            Seat::One => self.player1,
            Seat::Two => self.player2,
        }
    }

    fn seat_of(&self, mark: Mark) -> Option<Seat> {
        [self.player1, self.player2]
            .into_iter()
            .flatten()
            .find(|p| p.mark == mark)
            .map(|p| p.seat)
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn cells(&self) -> &Grid {
        &self.cells
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn is_draw(&self) -> bool {
        self.is_draw
    }

    pub fn phase(&self) -> Phase {
        if let Some(seat) = self.winner {
            return Phase::Won(seat);
        }
        if self.is_draw {
            return Phase::Drawn;
        }
        match (self.player1, self.player2) {
            (None, _) => Phase::AwaitingPlayer1,
            (Some(_), None) => Phase::AwaitingPlayer2,
            (Some(_), Some(_)) => Phase::InProgress,
        }
    }

    pub fn assign_player1(&mut self, mark: Mark) -> Result<Player, PreconditionError> {
        if self.player1.is_some() {
            return Err(PreconditionError::Player1AlreadyJoined);
        }
        let player = Player::new(mark, Seat::One);
        self.player1 = Some(player);
        debug!("Player 1 assigned mark {}", mark);
        Ok(player)
    }

    /// Seats the second player with the complement of player 1's mark and
    /// starts the game.
    pub fn assign_player2(&mut self) -> Result<Player, PreconditionError> {
        let player1 = match (self.player1, self.player2) {
            (None, _) => return Err(PreconditionError::Player1NotJoined),
            (Some(_), Some(_)) => return Err(PreconditionError::Player2AlreadyJoined),
            (Some(player1), None) => player1,
        };
        let player = Player::new(player1.mark.opponent(), Seat::Two);
        self.player2 = Some(player);
        self.started = true;
        debug!("Player 2 assigned mark {}, game started", player.mark);
        Ok(player)
    }

    /// Validates and applies a move, returning the phase the game is in afterwards.
    pub fn apply_move(&mut self, mv: Move) -> Result<Phase, InvalidMove> {
        match self.phase() {
            Phase::AwaitingPlayer1 | Phase::AwaitingPlayer2 => {
                debug!("Move rejected: game has not started.");
                return Err(InvalidMove::NotStarted);
            }
            Phase::Won(_) | Phase::Drawn => {
                debug!("Move rejected: game is already over.");
                return Err(InvalidMove::GameFinished);
            }
            Phase::InProgress => {}
        }
        if mv.seat != self.turn {
            debug!("Move rejected: not player {}'s turn.", mv.seat);
            return Err(InvalidMove::wrong_turn(self.turn, mv.seat));
        }
        let (row, col) = match (usize::try_from(mv.row), usize::try_from(mv.col)) {
            (Ok(row), Ok(col)) if row < BOARD_SIZE && col < BOARD_SIZE => (row, col),
            _ => {
                debug!("Move rejected: coordinates out of bounds.");
                return Err(InvalidMove::out_of_bounds(mv.row, mv.col));
            }
        };
        if self.cells[row][col] != Cell::Empty {
            debug!("Move rejected: cell already taken.");
            return Err(InvalidMove::occupied(mv.row, mv.col));
        }
        let Some(player) = self.player(mv.seat) else {
            return Err(InvalidMove::NotStarted);
        };

        self.cells[row][col] = Cell::Taken(player.mark);

        match evaluate_outcome(&self.cells) {
            Some(Outcome::Winner(mark)) => {
                // A single placement can only complete lines of the mover's own mark.
                debug_assert_eq!(mark, player.mark);
                self.winner = Some(mv.seat);
                debug!("Game over: player {} wins.", mv.seat);
            }
            Some(Outcome::Draw) => {
                self.is_draw = true;
                debug!("Game over: it's a draw.");
            }
            None => {
                self.turn = self.turn.other();
                debug!("Turn switched: now it's player {}'s turn.", self.turn);
            }
        }

        Ok(self.phase())
    }
}

/// `winner` travels as a plain seat number, `0` meaning nobody has won.
mod winner_seat {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Seat;

    pub fn serialize<S: Serializer>(winner: &Option<Seat>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(winner.map_or(0, i64::from))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Seat>, D::Error> {
        match i64::deserialize(deserializer)? {
            0 => Ok(None),
            n => Seat::try_from(n).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_game(mark: Mark) -> GameBoard {
        let mut board = GameBoard::new();
        board.assign_player1(mark).unwrap();
        board.assign_player2().unwrap();
        board
    }

    fn seat(n: i64) -> Seat {
        Seat::try_from(n).unwrap()
    }

    fn play(board: &mut GameBoard, moves: &[(i64, i32, i32)]) -> Phase {
        let mut phase = board.phase();
        for &(s, row, col) in moves {
            phase = board.apply_move(Move::new(seat(s), row, col)).unwrap();
        }
        phase
    }

    #[test]
    fn fresh_board_awaits_player1() {
        let board = GameBoard::new();
        assert_eq!(board.phase(), Phase::AwaitingPlayer1);
        assert_eq!(board.turn(), Seat::One);
        assert!(!board.started());
    }

    #[test]
    fn player2_gets_complementary_mark_and_starts_game() {
        let mut board = GameBoard::new();
        board.assign_player1(Mark::O).unwrap();
        assert_eq!(board.phase(), Phase::AwaitingPlayer2);
        assert!(!board.started());

        let p2 = board.assign_player2().unwrap();
        assert_eq!(p2, Player::new(Mark::X, Seat::Two));
        assert!(board.started());
        assert_eq!(board.phase(), Phase::InProgress);
    }

    #[test]
    fn join_preconditions() {
        let mut board = GameBoard::new();
        assert_eq!(board.assign_player2(), Err(PreconditionError::Player1NotJoined));

        board.assign_player1(Mark::X).unwrap();
        assert_eq!(
            board.assign_player1(Mark::O),
            Err(PreconditionError::Player1AlreadyJoined)
        );
        board.assign_player2().unwrap();
        assert_eq!(board.assign_player2(), Err(PreconditionError::Player2AlreadyJoined));
    }

    #[test]
    fn mark_parsing() {
        assert_eq!("X".parse::<Mark>(), Ok(Mark::X));
        assert_eq!("O".parse::<Mark>(), Ok(Mark::O));
        assert_eq!("A".parse::<Mark>(), Err(InvalidMark("A".to_string())));
        assert!(Seat::try_from(3).is_err());
    }

    #[test]
    fn cannot_move_before_both_joined() {
        let mut board = GameBoard::new();
        assert_eq!(
            board.apply_move(Move::new(Seat::One, 0, 0)),
            Err(InvalidMove::NotStarted)
        );
        board.assign_player1(Mark::X).unwrap();
        assert_eq!(
            board.apply_move(Move::new(Seat::One, 0, 0)),
            Err(InvalidMove::NotStarted)
        );
    }

    #[test]
    fn seats_alternate_starting_with_seat_one() {
        let mut board = started_game(Mark::X);
        assert_eq!(
            board.apply_move(Move::new(Seat::Two, 0, 0)),
            Err(InvalidMove::wrong_turn(Seat::One, Seat::Two))
        );

        board.apply_move(Move::new(Seat::One, 0, 0)).unwrap();
        assert_eq!(board.turn(), Seat::Two);
        assert_eq!(
            board.apply_move(Move::new(Seat::One, 0, 1)),
            Err(InvalidMove::wrong_turn(Seat::Two, Seat::One))
        );
        assert_eq!(board.turn(), Seat::Two);

        board.apply_move(Move::new(Seat::Two, 1, 1)).unwrap();
        assert_eq!(board.turn(), Seat::One);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut board = started_game(Mark::X);
        for (row, col) in [(-1, 0), (0, -1), (3, 0), (0, 3), (4, 4)] {
            assert_eq!(
                board.apply_move(Move::new(Seat::One, row, col)),
                Err(InvalidMove::out_of_bounds(row, col))
            );
        }
        assert_eq!(board, started_game(Mark::X));
    }

    #[test]
    fn occupied_cell_is_rejected_and_board_unchanged() {
        let mut board = started_game(Mark::X);
        board.apply_move(Move::new(Seat::One, 0, 0)).unwrap();
        let before = board.clone();

        let err = board.apply_move(Move::new(Seat::Two, 0, 0)).unwrap_err();
        assert_eq!(err, InvalidMove::occupied(0, 0));
        assert_eq!(err.code(), 105);
        assert_eq!(board, before);
    }

    #[test]
    fn row_win_for_seat_one() {
        let mut board = started_game(Mark::O);
        let phase = play(&mut board, &[(1, 0, 0), (2, 2, 2), (1, 0, 1), (2, 1, 1), (1, 0, 2)]);
        assert_eq!(phase, Phase::Won(Seat::One));
        assert_eq!(board.winner(), Some(Seat::One));
        assert!(!board.is_draw());
        assert_eq!(board.turn(), Seat::One);
    }

    #[test]
    fn column_win_for_seat_two() {
        let mut board = started_game(Mark::O);
        let phase = play(
            &mut board,
            &[(1, 0, 0), (2, 0, 1), (1, 0, 2), (2, 1, 1), (1, 1, 0), (2, 2, 1)],
        );
        assert_eq!(phase, Phase::Won(Seat::Two));
    }

    #[test]
    fn diagonal_wins() {
        let mut board = started_game(Mark::O);
        play(&mut board, &[(1, 0, 0), (2, 0, 1), (1, 1, 1), (2, 0, 2), (1, 2, 2)]);
        assert_eq!(board.winner(), Some(Seat::One));

        let mut board = started_game(Mark::O);
        play(&mut board, &[(1, 0, 2), (2, 0, 0), (1, 1, 1), (2, 0, 1), (1, 2, 0)]);
        assert_eq!(board.winner(), Some(Seat::One));
    }

    #[test]
    fn full_board_without_line_is_draw() {
        let mut board = started_game(Mark::X);
        let phase = play(
            &mut board,
            &[
                (1, 0, 0),
                (2, 0, 2),
                (1, 0, 1),
                (2, 1, 0),
                (1, 1, 2),
                (2, 1, 1),
                (1, 2, 0),
                (2, 2, 1),
                (1, 2, 2),
            ],
        );
        assert_eq!(phase, Phase::Drawn);
        assert!(board.is_draw());
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn finished_game_rejects_every_move() {
        let mut board = started_game(Mark::X);
        play(&mut board, &[(1, 0, 0), (2, 1, 0), (1, 0, 1), (2, 1, 1), (1, 0, 2)]);
        let finished = board.clone();

        for s in [1, 2] {
            for (row, col) in [(2, 2), (0, 0), (5, 5)] {
                assert_eq!(
                    board.apply_move(Move::new(seat(s), row, col)),
                    Err(InvalidMove::GameFinished)
                );
            }
        }
        assert_eq!(board, finished);
    }

    #[test]
    fn winning_last_move_beats_full_board() {
        let mut cells = [[Cell::Taken(Mark::X); 3]; 3];
        cells[0][1] = Cell::Taken(Mark::O);
        cells[1][0] = Cell::Taken(Mark::O);
        cells[1][2] = Cell::Taken(Mark::O);
        cells[2][1] = Cell::Taken(Mark::O);
        assert_eq!(evaluate_outcome(&cells), Some(Outcome::Winner(Mark::X)));
        assert_eq!(evaluate_outcome(&GameBoard::new().cells), None);
    }

    #[test]
    fn snapshot_json_shape() {
        let mut board = GameBoard::new();
        board.assign_player1(Mark::X).unwrap();
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["p1"], serde_json::json!({ "type": "X", "id": 1 }));
        assert!(json.get("p2").is_none());
        assert_eq!(json["gameStarted"], false);
        assert_eq!(json["turn"], 1);
        assert_eq!(json["boardState"][0][0], "\u{0}");
        assert_eq!(json["winner"], 0);
        assert_eq!(json["isDraw"], false);

        board.assign_player2().unwrap();
        board.apply_move(Move::new(Seat::One, 1, 2)).unwrap();
        let text = serde_json::to_string(&board).unwrap();
        let parsed: GameBoard = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, board);
    }

    #[test]
    fn restore_rejects_impossible_states() {
        let p1 = Some(Player::new(Mark::X, Seat::One));
        let p2 = Some(Player::new(Mark::O, Seat::Two));
        let empty = [[Cell::Empty; 3]; 3];

        assert!(GameBoard::restore(p1, p2, true, Seat::One, empty, None, false).is_ok());
        assert!(GameBoard::restore(None, p2, true, Seat::One, empty, None, false).is_err());
        assert!(GameBoard::restore(p1, p2, false, Seat::One, empty, None, false).is_err());
        assert!(GameBoard::restore(p1, p2, true, Seat::Two, empty, None, false).is_err());
        assert!(GameBoard::restore(p1, p2, true, Seat::One, empty, Some(Seat::One), false).is_err());
        assert!(GameBoard::restore(p1, p1, true, Seat::One, empty, None, false).is_err());
    }

    #[test]
    fn restore_requires_alternating_marks() {
        let p1 = Some(Player::new(Mark::X, Seat::One));
        let p2 = Some(Player::new(Mark::O, Seat::Two));
        let x = Cell::Taken(Mark::X);
        let o = Cell::Taken(Mark::O);
        let e = Cell::Empty;

        // Two X and no O: right total for seat 1 to move, impossible split.
        let lopsided = [[x, x, e], [e, e, e], [e, e, e]];
        assert!(GameBoard::restore(p1, p2, true, Seat::One, lopsided, None, false).is_err());

        // Player 2 ahead of player 1.
        let reversed = [[o, e, e], [e, e, e], [e, e, e]];
        assert!(GameBoard::restore(p1, p2, true, Seat::Two, reversed, None, false).is_err());

        let fair = [[x, o, e], [e, x, e], [e, e, e]];
        assert!(GameBoard::restore(p1, p2, true, Seat::Two, fair, None, false).is_ok());

        // A mark on the grid before player 2 exists.
        let early = [[x, e, e], [e, e, e], [e, e, e]];
        assert!(GameBoard::restore(p1, None, false, Seat::Two, early, None, false).is_err());
        assert!(GameBoard::restore(p1, None, false, Seat::One, early, None, false).is_err());
    }
}
