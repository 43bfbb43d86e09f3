use serde::{Deserialize, Serialize};

use crate::{ActionType, Location, Piece, Token};

/// The atomic move: relocate one piece or one token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subaction {
    pub source: Location,
    pub dest: Location,
    #[serde(default)]
    pub piece: Piece,
    #[serde(default)]
    pub token: Token,
}

impl Subaction {
    pub fn piece(source: Location, dest: Location, piece: Piece) -> Self {
        Self {
            source,
            dest,
            piece,
            token: Token::None,
        }
    }

    pub fn token(source: Location, dest: Location, token: Token) -> Self {
        Self {
            source,
            dest,
            piece: Piece::EMPTY,
            token,
        }
    }

    /// The structural inverse.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.dest,
            dest: self.source,
            piece: self.piece,
            token: self.token,
        }
    }

    pub fn is_token(&self) -> bool {
        self.token != Token::None
    }
}

/// A turn-consuming action and the subactions that made it up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionType,
    pub player: usize,
    pub subactions: Vec<Subaction>,
}

impl Action {
    pub fn new(kind: ActionType, player: usize) -> Self {
        Self {
            kind,
            player,
            subactions: Vec::new(),
        }
    }
}
