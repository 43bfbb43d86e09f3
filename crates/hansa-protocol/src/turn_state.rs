use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Award, Location};

/// What must happen next within the current turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnStateType {
    #[default]
    None,
    Bags,
    BumpPaying,
    Bumping,
    Moving,
    Clearing,
    // Reserved for token actions; never entered by the current rules.
    Remove3,
    LevelUp,
    BonusOffice,
    SwapOffice,
}

/// Turn progress. Reset at the start of every turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    pub kind: TurnStateType,
    /// Seat whose turn it is
    pub player: usize,
    pub actions_left: u32,
    pub turn_start: DateTime<Utc>,
    /// Milliseconds to add to the elapsed clock for this turn (bump windows are split out)
    pub turn_elapsed_delta_ms: i64,
    pub bags_left: u32,
    pub moves_left: u32,

    /// Seat that must resolve the current bump
    pub bumping_player: usize,
    /// Staging slot holding the bumped piece
    pub bumping_location: Location,
    pub bumping_start: DateTime<Utc>,
    /// Pieces still owed Supply to Stock
    pub bumping_cost: u32,
    /// Replacement pieces the bumped player may still place
    pub bumping_replaces: u32,
    pub bumping_moved: bool,

    pub clearing_route: usize,
    pub clearing_award: Award,
    pub clearing_can_office: bool,
}

impl TurnState {
    pub fn new(player: usize, actions_left: u32, now: DateTime<Utc>) -> Self {
        Self {
            kind: TurnStateType::None,
            player,
            actions_left,
            turn_start: now,
            turn_elapsed_delta_ms: 0,
            bags_left: 0,
            moves_left: 0,
            bumping_player: 0,
            bumping_location: Location::None,
            bumping_start: now,
            bumping_cost: 0,
            bumping_replaces: 0,
            bumping_moved: false,
            clearing_route: 0,
            clearing_award: Award::None,
            clearing_can_office: false,
        }
    }

    /// The seat allowed to act right now.
    pub fn acting_player(&self) -> usize {
        if self.kind == TurnStateType::Bumping {
            self.bumping_player
        } else {
            self.player
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new(0, 0, DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acting_player_follows_bump() {
        let mut state = TurnState::new(1, 2, Utc::now());
        assert_eq!(state.acting_player(), 1);
        state.kind = TurnStateType::Bumping;
        state.bumping_player = 3;
        assert_eq!(state.acting_player(), 3);
    }
}
