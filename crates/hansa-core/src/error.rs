//! Error taxonomy for the rules engine.

use hansa_protocol::{Location, Subaction};
use thiserror::Error;

/// A broken engine invariant. Reaching one of these means validation let
/// something through that it never should have; the enclosing game is
/// abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("bump staging slot already occupied at {0:?}")]
    BumpedSlotOccupied(Location),
    #[error("swap touches a player board: {0:?}")]
    PlayerBoardSwap(Subaction),
    #[error("no seat plays {0:?}")]
    UnseatedColor(hansa_protocol::PlayerColor),
    #[error("piece lookup on the none location")]
    NoneLocation,
    #[error("location does not exist: {0:?}")]
    MissingLocation(Location),
    #[error("no open route spot within {hops} hops of route {route}")]
    BumpSearchExhausted { route: usize, hops: usize },
    #[error("planner left the table mutated after evaluating {0}")]
    PlannerMutatedTable(String),
    #[error("nothing to clear from the {0} track")]
    EmptyTrack(&'static str),
    #[error("planner could not pay for the bump at {0:?}")]
    UnpaidBump(Location),
}

/// Outcome of a rejected or failed game operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The player broke a rule. Nothing was mutated.
    #[error("{header}: {content}")]
    Rule { header: String, content: String },
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl GameError {
    pub fn rule(header: impl Into<String>, content: impl Into<String>) -> Self {
        GameError::Rule {
            header: header.into(),
            content: content.into(),
        }
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, GameError::Invariant(_))
    }
}
