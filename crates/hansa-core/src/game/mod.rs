//! The per-game turn state machine.
//!
//! `Game` is a deterministic reducer over the `Table`: every operation
//! either fails with a `GameError::Rule` and mutates nothing, or commits
//! fully. Wall-clock time and randomness are passed in by the caller.

mod scoring;
mod seating;
mod turn;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hansa_protocol::{
    Action, ActionType, GameStatus, Identity, Piece, PlayerColor, ScoreType, Subaction,
    TurnState, TurnStateType,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::Board;
use crate::error::{GameError, InvariantViolation};
use crate::player_board::new_base_player_boards;
use crate::table::Table;

pub use scoring::endgame_scores;

pub const MAX_SEATS: usize = 5;
pub const MIN_PLAYERS: usize = 4;
/// Any score at or above this ends the game.
pub const END_SCORE: i32 = 20;
/// Filling this many cities ends the game.
pub const END_FILLED_CITIES: usize = 10;
/// First, second and third bonus-route completions.
pub const BONUS_ROUTE_POINTS: [i32; 3] = [7, 4, 2];
/// Cubes dealt at start; seat i keeps 5 + i of them in supply.
pub const STARTING_CUBES: usize = 11;

/// What `end_turn` led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    NextTurn,
    Scoring,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub status: GameStatus,
    pub creator: Identity,
    pub table: Table,
    pub turn_state: TurnState,
    /// Milliseconds each seat has spent acting
    pub elapsed_ms: Vec<i64>,
    /// Seats that have completed the bonus route
    pub bonus_route: Vec<bool>,
    /// Set once an endgame condition triggers
    pub game_end: bool,
    /// Per seat, filled in as the endgame categories are revealed
    pub final_scores: Vec<BTreeMap<ScoreType, i32>>,
    /// Completed actions, oldest first
    pub history: Vec<Action>,
    /// Subactions of the action in progress
    pending: Vec<Subaction>,
}

impl Game {
    /// A game waiting for players, seats 0-4 empty.
    pub fn new(id: u64, creator: Identity, board: Board) -> Self {
        let table = Table::new(board, new_base_player_boards());
        Self {
            id,
            status: GameStatus::Creating,
            creator,
            table,
            turn_state: TurnState::default(),
            elapsed_ms: Vec::new(),
            bonus_route: Vec::new(),
            game_end: false,
            final_scores: Vec::new(),
            history: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.table.player_boards.len()
    }

    /// Seat held by `identity`.
    pub fn seat_of(&self, identity: &Identity) -> Option<usize> {
        self.table
            .player_boards
            .iter()
            .position(|b| !b.identity.is_empty() && b.identity == *identity)
    }

    pub fn identity_at(&self, seat: usize) -> Option<&Identity> {
        self.table
            .player_boards
            .get(seat)
            .map(|b| &b.identity)
            .filter(|i| !i.is_empty())
    }

    pub fn seated(&self) -> impl Iterator<Item = (usize, &Identity)> {
        self.table
            .player_boards
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.identity.is_empty())
            .map(|(i, b)| (i, &b.identity))
    }

    fn seat_of_color(&self, color: PlayerColor) -> Result<usize, InvariantViolation> {
        self.table
            .seat_of(color)
            .ok_or(InvariantViolation::UnseatedColor(color))
    }

    /// Begin play: deal start tokens, drop empty seats, shuffle seating,
    /// deal starting pieces and open seat 0's turn.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        requester: &Identity,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        const HEADER: &str = "StartGame Error";
        if self.status != GameStatus::Creating {
            return Err(GameError::rule(HEADER, "Can only start when game is 'Creating'"));
        }
        if *requester != self.creator {
            return Err(GameError::rule(
                HEADER,
                format!("Only the Creator ({}) can start the game", self.creator.name),
            ));
        }
        if self.seated().count() < MIN_PLAYERS {
            return Err(GameError::rule(HEADER, "Only 4-5 players is supported :("));
        }

        let mut start_tokens = hansa_protocol::Token::START.to_vec();
        start_tokens.shuffle(rng);
        for route in self.table.board.routes.iter_mut().filter(|r| r.start_token) {
            if let Some(token) = start_tokens.pop() {
                route.token = token;
            }
        }
        self.table.tokens.shuffle(rng);

        self.table.player_boards.retain(|b| !b.identity.is_empty());
        self.table.player_boards.shuffle(rng);

        for (seat, board) in self.table.player_boards.iter_mut().enumerate() {
            let color = board.color;
            board.supply[0] = Piece::disc(color);
            for i in 0..STARTING_CUBES {
                if i < 5 + seat {
                    board.supply[i + 1] = Piece::cube(color);
                } else {
                    board.stock[i - (5 + seat)] = Piece::cube(color);
                }
            }
        }

        let n = self.player_count();
        self.table.scores = vec![0; n];
        self.elapsed_ms = vec![0; n];
        self.bonus_route = vec![false; n];
        self.game_end = false;
        self.history.clear();
        self.pending.clear();
        self.status = GameStatus::Running;
        self.turn_state = TurnState::new(0, 2, now);
        info!(game = self.id, players = n, "game started");
        Ok(())
    }

    /// Finish the current turn. Open Move or Bags actions are closed; a
    /// pending bump or clear must be resolved first.
    pub fn end_turn(&mut self, seat: usize, now: DateTime<Utc>) -> Result<TurnOutcome, GameError> {
        const HEADER: &str = "Endturn Error";
        if self.status != GameStatus::Running {
            return Err(GameError::rule(HEADER, "The game is not 'Running'"));
        }
        if self.turn_state.player != seat {
            return Err(GameError::rule(HEADER, "It's not your turn"));
        }
        match self.turn_state.kind {
            TurnStateType::Bumping => {
                return Err(GameError::rule(HEADER, "Wait for opponent to react to the bump"));
            }
            TurnStateType::BumpPaying => {
                return Err(GameError::rule(HEADER, "You must pay for your bump"));
            }
            TurnStateType::Clearing => {
                return Err(GameError::rule(
                    HEADER,
                    "You must complete clearing the route before ending your turn (including rewards)",
                ));
            }
            _ => {}
        }

        debug!(game = self.id, seat, "end turn");
        let ts = &self.turn_state;
        self.elapsed_ms[seat] += (now - ts.turn_start).num_milliseconds() + ts.turn_elapsed_delta_ms;
        self.close_open_action();

        if self.game_end {
            self.status = GameStatus::Scoring;
            info!(game = self.id, "scoring");
            return Ok(TurnOutcome::Scoring);
        }

        let next = (seat + 1) % self.player_count();
        let actions = self.table.player_boards[next].actions();
        self.turn_state = TurnState::new(next, actions, now);
        Ok(TurnOutcome::NextTurn)
    }

    /// The bumped player hands control back to the active player.
    pub fn end_bump(&mut self, seat: usize, now: DateTime<Utc>) -> Result<(), GameError> {
        const HEADER: &str = "Endbump Error";
        let ts = &self.turn_state;
        if self.status != GameStatus::Running || ts.kind != TurnStateType::Bumping {
            return Err(GameError::rule(HEADER, "There is no bump in progress"));
        }
        if ts.bumping_player != seat {
            return Err(GameError::rule(HEADER, "You are not being bumped"));
        }
        if !ts.bumping_moved {
            return Err(GameError::rule(
                HEADER,
                "You must move your bumped piece to another route",
            ));
        }

        debug!(game = self.id, seat, "end bump");
        self.elapsed_ms[seat] += (now - ts.bumping_start).num_milliseconds();
        let ts = &mut self.turn_state;
        ts.turn_elapsed_delta_ms += (ts.bumping_start - ts.turn_start).num_milliseconds();
        ts.turn_start = now;
        ts.kind = TurnStateType::None;
        ts.bumping_player = 0;
        ts.bumping_location = Default::default();
        ts.bumping_moved = false;
        ts.bumping_replaces = 0;
        ts.bumping_cost = 0;
        self.close_action(ActionType::Bump);
        self.game_end_if_necessary();
        Ok(())
    }

    /// Checked after every mutation. Once triggered, the current action may
    /// finish but no new one can start.
    fn game_end_if_necessary(&mut self) {
        if self.status != GameStatus::Running {
            return;
        }
        if !self.game_end {
            let by_score = self.table.scores.iter().any(|s| *s >= END_SCORE);
            let by_cities = self.table.board.filled_city_count() >= END_FILLED_CITIES;
            if !by_score && !by_cities {
                return;
            }
            info!(game = self.id, by_score, by_cities, "game end triggered");
            self.game_end = true;
        }
        if self.turn_state.kind == TurnStateType::None {
            self.turn_state.actions_left = 0;
        }
    }

    /// Tiered 7/4/2 award for the first three seats to link the bonus termini.
    fn bonus_route_score(&mut self, seat: usize) -> i32 {
        let mut tier = 0;
        for (i, done) in self.bonus_route.iter().enumerate() {
            if *done {
                if i == seat {
                    return 0;
                }
                tier += 1;
            }
        }
        let Some(worth) = BONUS_ROUTE_POINTS.get(tier).copied() else {
            return 0;
        };
        let color = self.table.player_boards[seat].color;
        if self.table.board.bonus_route_completed(color) {
            self.bonus_route[seat] = true;
            return worth;
        }
        0
    }

    fn apply(&mut self, s: Subaction) -> Result<(), InvariantViolation> {
        debug!(game = self.id, player = self.turn_state.acting_player(), ?s, "subaction");
        self.table.apply_subaction(&s)?;
        self.pending.push(s);
        Ok(())
    }

    /// Flush the accumulated subactions into the history as one action.
    fn close_action(&mut self, kind: ActionType) {
        let subactions = std::mem::take(&mut self.pending);
        self.history.push(Action {
            kind,
            player: self.turn_state.player,
            subactions,
        });
    }

    /// Close an unfinished Move or Bags action.
    fn close_open_action(&mut self) {
        match self.turn_state.kind {
            TurnStateType::Moving => {
                self.close_action(ActionType::Move);
                self.turn_state.moves_left = 0;
                self.turn_state.kind = TurnStateType::None;
            }
            TurnStateType::Bags => {
                self.close_action(ActionType::Bags);
                self.turn_state.bags_left = 0;
                self.turn_state.kind = TurnStateType::None;
            }
            _ => {}
        }
    }

    pub fn abandon(&mut self) {
        info!(game = self.id, "game abandoned");
        self.status = GameStatus::Abandoned;
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::test_support::*;
    use super::*;
    use hansa_protocol::{PlayerSection, Shape, Token};

    #[test]
    fn test_start_deals_pieces() {
        let game = running_game(4);
        assert_eq!(game.status, GameStatus::Running);
        assert_eq!(game.player_count(), 4);
        for (seat, board) in game.table.player_boards.iter().enumerate() {
            assert_eq!(board.count(PlayerSection::Supply, Some(Shape::Disc)), 1);
            assert_eq!(board.count(PlayerSection::Supply, Some(Shape::Cube)), 5 + seat);
            assert_eq!(board.count(PlayerSection::Stock, None), 6 - seat);
        }
        let start_tokens: Vec<Token> = game
            .table
            .board
            .routes
            .iter()
            .filter(|r| r.start_token)
            .map(|r| r.token)
            .collect();
        assert_eq!(start_tokens.len(), 3);
        assert!(start_tokens.iter().all(|t| t.is_start()));
        assert_eq!(game.turn_state.player, 0);
        assert_eq!(game.turn_state.actions_left, 2);
    }

    #[test]
    fn test_start_requires_creator_and_players() {
        let mut game = Game::new(1, creator(), crate::board_data::base45().unwrap());
        let mut rng = rand::thread_rng();
        game.sitdown(&creator(), 0, true).unwrap();
        let err = game
            .start(&Identity::new("P9", "Zed"), &mut rng, t0())
            .unwrap_err();
        assert_eq!(
            err,
            GameError::rule("StartGame Error", "Only the Creator (Ada) can start the game")
        );
        let err = game.start(&creator(), &mut rng, t0()).unwrap_err();
        assert_eq!(
            err,
            GameError::rule("StartGame Error", "Only 4-5 players is supported :(")
        );
    }

    #[test]
    fn test_end_turn_rotates_and_tracks_time() {
        let mut game = running_game(4);
        let later = t0() + Duration::seconds(30);
        assert_eq!(
            game.end_turn(1, later),
            Err(GameError::rule("Endturn Error", "It's not your turn"))
        );
        assert_eq!(game.end_turn(0, later), Ok(TurnOutcome::NextTurn));
        assert_eq!(game.elapsed_ms[0], 30_000);
        assert_eq!(game.turn_state.player, 1);
        assert_eq!(game.turn_state.turn_start, later);
        assert_eq!(
            game.turn_state.actions_left,
            game.table.player_boards[1].actions()
        );
        for seat in 1..4 {
            game.end_turn(seat, later).unwrap();
        }
        assert_eq!(game.turn_state.player, 0);
    }

    #[test]
    fn test_bonus_route_tiers() {
        let mut game = running_game(4);
        let termini = [(9, 0), (11, 1), (12, 0), (15, 0), (16, 0)];
        for seat in 0..4 {
            let color = game.table.player_boards[seat].color;
            for (city, office) in termini {
                game.table.board.cities[city].offices[office].piece = Piece::cube(color);
            }
            let expected = [7, 4, 2, 0][seat];
            assert_eq!(game.bonus_route_score(seat), expected);
            assert_eq!(game.bonus_route_score(seat), 0);
        }
    }

    #[test]
    fn test_abandon() {
        let mut game = running_game(4);
        game.abandon();
        assert!(game.status.is_terminal());
    }
}
