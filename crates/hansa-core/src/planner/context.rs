use hansa_protocol::{PlayerSection, Shape};
use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Coarse game clock used to pick a weight table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Early,
    Mid,
    Late,
}

impl GamePhase {
    /// Early below 5 points, Mid below 15, Late otherwise.
    pub fn from_scores(scores: &[i32]) -> Self {
        match scores.iter().copied().max().unwrap_or(0) {
            s if s < 5 => GamePhase::Early,
            s if s < 15 => GamePhase::Mid,
            _ => GamePhase::Late,
        }
    }
}

/// Snapshot of my resources when a plan search starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanContext {
    pub actions_left: u32,
    /// Moves still open from a Move action begun by an earlier plan this turn.
    pub moves_left: u32,
    pub live_pieces: usize,
    pub stock_pieces: usize,
    pub supply_pieces: usize,
    pub board_pieces: usize,
    pub stock_disc: bool,
    pub supply_disc: bool,
    pub board_disc: bool,
    pub phase: GamePhase,
}

impl PlanContext {
    pub fn new(table: &Table, seat: usize, scores: &[i32], actions_left: u32, moves_left: u32) -> Self {
        let board = &table.player_boards[seat];
        let color = board.color;

        let mine = table
            .board
            .routes
            .iter()
            .flat_map(|r| r.spots.iter())
            .filter(|p| p.color == color);
        let (board_pieces, board_disc) =
            mine.fold((0, false), |(n, disc), p| (n + 1, disc || p.is_disc()));
        let stock_pieces = board.count(PlayerSection::Stock, None);
        let supply_pieces = board.count(PlayerSection::Supply, None);

        Self {
            actions_left,
            moves_left,
            live_pieces: board_pieces + stock_pieces + supply_pieces,
            stock_pieces,
            supply_pieces,
            board_pieces,
            stock_disc: board.find(PlayerSection::Stock, Shape::Disc).is_some(),
            supply_disc: board.find(PlayerSection::Supply, Shape::Disc).is_some(),
            board_disc,
            phase: GamePhase::from_scores(scores),
        }
    }

    pub fn has_disc(&self) -> bool {
        self.stock_disc || self.supply_disc || self.board_disc
    }

    pub fn stock_and_supply(&self) -> usize {
        self.stock_pieces + self.supply_pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_thresholds() {
        assert_eq!(GamePhase::from_scores(&[]), GamePhase::Early);
        assert_eq!(GamePhase::from_scores(&[0, 4, 2]), GamePhase::Early);
        assert_eq!(GamePhase::from_scores(&[5, 0]), GamePhase::Mid);
        assert_eq!(GamePhase::from_scores(&[1, 14]), GamePhase::Mid);
        assert_eq!(GamePhase::from_scores(&[15, 3]), GamePhase::Late);
    }
}
