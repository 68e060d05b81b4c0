use serde::{Deserialize, Serialize};

use super::error::InvalidMove;

pub const MOVE_ACCEPTED: u16 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameForm {
    #[serde(rename = "type")]
    pub mark: String,
}

/// Target cell of a move; `x` is the row and `y` the column.
#[derive(Debug, Serialize, Deserialize)]
pub struct MoveForm {
    pub x: i32,
    pub y: i32,
}

/// Direct reply to the player who submitted a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReply {
    #[serde(rename = "moveValidity")]
    pub move_validity: bool,
    pub code: u16,
    pub message: String,
}

impl MoveReply {
    pub fn accepted() -> Self {
        MoveReply {
            move_validity: true,
            code: MOVE_ACCEPTED,
            message: String::new(),
        }
    }

    pub fn rejected(rejection: &InvalidMove) -> Self {
        MoveReply {
            move_validity: false,
            code: rejection.code(),
            message: rejection.cause(),
        }
    }
}
