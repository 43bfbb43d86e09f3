//! Endgame scoring categories.

use std::collections::BTreeMap;

use hansa_protocol::{GameStatus, PlayerSection, ScoreType};
use tracing::info;

use super::Game;
use crate::table::Table;

/// Points for each track fully upgraded by the end of the game.
const FULL_TRACK_POINTS: i32 = 4;
/// Points per controlled city.
const CONTROL_POINTS: i32 = 2;

const SCORED_TRACKS: [PlayerSection; 4] = [
    PlayerSection::Actions,
    PlayerSection::Books,
    PlayerSection::Priviledge,
    PlayerSection::Bags,
];

/// Every endgame category, in reveal order, with one value per seat.
/// Pure in the table: the same table always yields the same sequence.
pub fn endgame_scores(table: &Table) -> Vec<(ScoreType, Vec<i32>)> {
    let seats = 0..table.player_boards.len();
    let board = &table.board;

    let game = table.scores.clone();
    let full_tracks = seats
        .clone()
        .map(|seat| {
            let player = &table.player_boards[seat];
            SCORED_TRACKS
                .iter()
                .filter(|t| player.track_left(**t) == 0)
                .count() as i32
                * FULL_TRACK_POINTS
        })
        .collect::<Vec<_>>();
    let coellen = seats
        .clone()
        .map(|seat| {
            let color = table.player_boards[seat].color;
            board
                .cities
                .iter()
                .flat_map(|c| c.coellen.iter())
                .filter(|spot| spot.piece.color == color && !spot.piece.is_empty())
                .map(|spot| spot.points as i32)
                .sum()
        })
        .collect::<Vec<_>>();
    let control = seats
        .clone()
        .map(|seat| {
            let color = table.player_boards[seat].color;
            board
                .cities
                .iter()
                .filter(|c| c.control() == Some(color))
                .count() as i32
                * CONTROL_POINTS
        })
        .collect::<Vec<_>>();
    let network = seats
        .clone()
        .map(|seat| {
            let player = &table.player_boards[seat];
            (board.network_score(player.color) as u32 * player.keys()) as i32
        })
        .collect::<Vec<_>>();
    let total = seats
        .clone()
        .map(|s| game[s] + full_tracks[s] + coellen[s] + control[s] + network[s])
        .collect::<Vec<_>>();

    // Ascending by (total, seat), so the later seat wins a tie.
    let mut order = seats.collect::<Vec<_>>();
    order.sort_by_key(|s| (total[*s], *s));
    let mut place = vec![0; order.len()];
    for (rank, seat) in order.iter().enumerate() {
        place[*seat] = (order.len() - 1 - rank) as i32;
    }

    vec![
        (ScoreType::Game, game),
        (ScoreType::Board, full_tracks),
        (ScoreType::Coellen, coellen),
        (ScoreType::Control, control),
        (ScoreType::Network, network),
        (ScoreType::Total, total),
        (ScoreType::Place, place),
    ]
}

impl Game {
    /// Remember a revealed category.
    pub fn record_endgame_score(&mut self, kind: ScoreType, scores: &[i32]) {
        let n = self.player_count();
        self.final_scores.resize_with(n, BTreeMap::new);
        for (seat, score) in scores.iter().enumerate().take(n) {
            self.final_scores[seat].insert(kind, *score);
        }
    }

    /// Close out scoring: live scores become the totals.
    pub fn complete(&mut self) {
        let totals = self
            .final_scores
            .iter()
            .map(|s| s.get(&ScoreType::Total).copied().unwrap_or(0))
            .collect::<Vec<_>>();
        if totals.len() == self.table.scores.len() {
            self.table.scores = totals;
        }
        self.status = GameStatus::Complete;
        info!(game = self.id, scores = ?self.table.scores, "game complete");
    }
}
