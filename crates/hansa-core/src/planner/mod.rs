//! Route-based bot planner.
//!
//! For every route and goal the planner sketches the subactions it would
//! take, scores the result with a multiplicative fitness chain and executes
//! the best plan. Sketches run against the caller's table and are undone
//! before the planner returns; a table fingerprint taken before and after
//! every generation guards that.

mod context;
mod fitness;
mod goals;
mod plan;
mod sketch;
mod weights;

use hansa_protocol::{Location, Piece, PlayerSection, Shape, Subaction, TurnState};
use tracing::debug;

use crate::error::InvariantViolation;
use crate::table::Table;

pub use context::{GamePhase, PlanContext};
pub use fitness::{BumpInfo, ClearFitness, Fitness};
pub use plan::{Command, Goal, Plan, PlanLength, Step, StepKind};
pub use weights::{WeightSet, Weights};

/// Replacement sources after being bumped, in preference order.
const REPLACE_ORDER: [(PlayerSection, Shape); 4] = [
    (PlayerSection::Stock, Shape::Disc),
    (PlayerSection::Stock, Shape::Cube),
    (PlayerSection::Supply, Shape::Disc),
    (PlayerSection::Supply, Shape::Cube),
];

#[derive(Clone, Debug)]
pub struct Planner {
    pub seat: usize,
    pub weights: WeightSet,
}

impl Planner {
    pub fn new(seat: usize, weights: WeightSet) -> Self {
        Self { seat, weights }
    }

    /// Every plan for one route and goal. The table is left as found.
    pub fn generate_plans(
        &self,
        table: &mut Table,
        route: usize,
        goal: Goal,
        ctx: &PlanContext,
    ) -> Result<Vec<Plan>, InvariantViolation> {
        let w = self.weights.for_phase(ctx.phase);
        let before = table.fingerprint();
        let plans = match goal {
            Goal::Award => goals::award_plans(table, self.seat, route, ctx, w)?,
            Goal::Office => goals::office_plans(table, self.seat, route, ctx, w)?,
            Goal::Points => goals::points_plans(table, self.seat, route, ctx, w, Shape::None)?,
            Goal::Block => goals::block_plans(table, self.seat, route, ctx, w)?,
        };
        if table.fingerprint() != before {
            return Err(InvariantViolation::PlannerMutatedTable(format!(
                "route {route} goal {goal:?}"
            )));
        }
        Ok(plans)
    }

    /// The highest valued plan over every route and goal. Earlier routes win
    /// ties.
    pub fn choose_plan(
        &self,
        table: &mut Table,
        ctx: &PlanContext,
    ) -> Result<Option<Plan>, InvariantViolation> {
        let mut best: Option<Plan> = None;
        for route in 0..table.board.routes.len() {
            for goal in Goal::ALL {
                for plan in self.generate_plans(table, route, goal, ctx)? {
                    if best.as_ref().map_or(true, |b| plan.value > b.value) {
                        best = Some(plan);
                    }
                }
            }
        }
        Ok(best)
    }

    /// Commands for the rest of my turn. Plans are chained until actions run
    /// out or one hands control to a bumped opponent; in the latter case no
    /// EndTurn is sent.
    pub fn choose_turn(
        &self,
        table: &mut Table,
        scores: &[i32],
        actions_left: u32,
    ) -> Result<Vec<Command>, InvariantViolation> {
        let before = table.fingerprint();
        let mut applied: Vec<Subaction> = Vec::new();
        let mut commands = Vec::new();
        let mut actions = actions_left;
        let mut moves = 0;
        let mut handed_off = false;

        while actions > 0 {
            let ctx = PlanContext::new(table, self.seat, scores, actions, moves);
            let Some(plan) = self.choose_plan(table, &ctx)? else {
                break;
            };
            if plan.value <= 0.0 || plan.steps.is_empty() || plan.actions == 0 {
                break;
            }
            debug!(
                seat = self.seat,
                route = plan.route,
                goal = ?plan.goal,
                length = plan.length.name(),
                value = plan.value,
                fitness = %plan.description,
                "chose plan"
            );

            let level = table.player_boards[self.seat].actions();
            for step in plan.executable() {
                table.apply_subaction(&step.subaction)?;
                applied.push(step.subaction);
                commands.push(Command::Subaction(step.subaction));
            }
            // An Actions award is usable straight away.
            let gained = table.player_boards[self.seat].actions().saturating_sub(level);
            actions = actions.saturating_sub(plan.actions) + gained;
            moves = plan.leftover_moves;
            if plan.hands_off() {
                handed_off = true;
                break;
            }
        }

        table.undo_subactions(&applied)?;
        if table.fingerprint() != before {
            return Err(InvariantViolation::PlannerMutatedTable("turn".to_string()));
        }
        if !handed_off {
            commands.push(Command::EndTurn);
        }
        Ok(commands)
    }

    /// Resolve a bump against me: move the bumped piece to the nearest open
    /// spot, then place every replacement I am owed, stock before supply and
    /// discs before cubes.
    pub fn respond_to_bump(
        &self,
        table: &mut Table,
        turn: &TurnState,
    ) -> Result<Vec<Command>, InvariantViolation> {
        let staged = turn.bumping_location;
        let mut applied: Vec<Subaction> = Vec::new();

        let bumped = table.get_piece(staged)?;
        if !bumped.is_empty() && !turn.bumping_moved {
            if let Some(dest) = table.valid_bumps(staged)?.first().copied() {
                let s = Subaction::piece(staged, dest, bumped);
                table.apply_subaction(&s)?;
                applied.push(s);
            }
        }

        for _ in 0..turn.bumping_replaces {
            let board = &table.player_boards[self.seat];
            let Some((section, shape, index)) = REPLACE_ORDER
                .iter()
                .find_map(|(section, shape)| board.find(*section, *shape).map(|i| (*section, *shape, i)))
            else {
                break;
            };
            let piece = Piece::new(board.color, shape);
            let Some(dest) = table.valid_bumps(staged)?.first().copied() else {
                break;
            };
            let s = Subaction::piece(Location::player(self.seat, section, index), dest, piece);
            table.apply_subaction(&s)?;
            applied.push(s);
        }

        table.undo_subactions(&applied)?;
        let mut commands: Vec<Command> = applied.into_iter().map(Command::Subaction).collect();
        commands.push(Command::EndBump);
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use hansa_protocol::{GameStatus, TurnStateType};

    use super::*;
    use crate::game::test_support::*;
    use crate::game::{Game, TurnOutcome};

    fn planners(game: &Game) -> Vec<Planner> {
        (0..game.player_count())
            .map(|seat| Planner::new(seat, WeightSet::default()))
            .collect()
    }

    /// Send `commands` from `seat` and panic on any rejection.
    fn play(game: &mut Game, seat: usize, commands: &[Command]) -> Option<TurnOutcome> {
        let mut outcome = None;
        for command in commands {
            match command {
                Command::Subaction(s) => {
                    game.do_subaction(seat, *s, t0()).unwrap();
                }
                Command::EndBump => game.end_bump(seat, t0()).unwrap(),
                Command::EndTurn => outcome = Some(game.end_turn(seat, t0()).unwrap()),
            }
        }
        outcome
    }

    #[test]
    fn test_generation_leaves_table_untouched() {
        let mut game = running_game(4);
        let color = game.table.player_boards[1].color;
        let rival = game.table.player_boards[2].color;
        game.table.board.routes[0].spots[0] = Piece::cube(color);
        game.table.board.routes[0].spots[1] = Piece::disc(rival);
        game.table.board.routes[5].spots[2] = Piece::cube(rival);
        game.table.board.routes[30].spots[1] = Piece::cube(color);

        let planner = Planner::new(1, WeightSet::default());
        let before = game.table.clone();
        for actions in 1..=3 {
            let ctx = PlanContext::new(&game.table, 1, &[0, 0, 0, 0], actions, 0);
            for route in 0..game.table.board.routes.len() {
                for goal in Goal::ALL {
                    planner
                        .generate_plans(&mut game.table, route, goal, &ctx)
                        .unwrap();
                    assert_eq!(game.table, before);
                }
            }
        }
    }

    #[test]
    fn test_opening_turn_places_and_ends() {
        let mut game = running_game(4);
        let planner = Planner::new(0, WeightSet::default());
        let commands = planner
            .choose_turn(&mut game.table, &[0, 0, 0, 0], game.turn_state.actions_left)
            .unwrap();
        assert_eq!(commands.last(), Some(&Command::EndTurn));
        let placed = commands
            .iter()
            .filter(|c| matches!(c, Command::Subaction(_)))
            .count();
        assert_eq!(placed, 2);
        assert_eq!(play(&mut game, 0, &commands), Some(TurnOutcome::NextTurn));
        assert_eq!(game.turn_state.player, 1);
    }

    #[test]
    fn test_bump_response_is_accepted() {
        let mut game = running_game(4);
        let victim = game.table.player_boards[1].color;
        game.table.board.routes[0].spots[1] = Piece::cube(victim);

        let cube = Piece::cube(game.table.player_boards[0].color);
        let supply = |i| Location::supply(0, i);
        game.do_subaction(0, Subaction::piece(supply(1), Location::spot(0, 1), cube), t0())
            .unwrap();
        game.do_subaction(0, Subaction::piece(supply(2), Location::stock(0, 20), cube), t0())
            .unwrap();
        assert_eq!(game.turn_state.kind, TurnStateType::Bumping);

        let responder = Planner::new(1, WeightSet::default());
        let commands = responder
            .respond_to_bump(&mut game.table, &game.turn_state.clone())
            .unwrap();
        assert_eq!(commands.last(), Some(&Command::EndBump));
        // The bumped piece plus one replacement for a cube.
        assert_eq!(commands.len(), 3);
        play(&mut game, 1, &commands);
        assert_eq!(game.turn_state.kind, TurnStateType::None);
        assert_eq!(game.turn_state.player, 0);
    }

    #[test]
    fn test_bots_play_two_rounds() {
        let mut game = running_game(4);
        let planners = planners(&game);
        let mut turns = 0;
        while game.status == GameStatus::Running && turns < 8 {
            let seat = game.turn_state.player;
            let scores = game.table.scores.clone();
            let commands = planners[seat]
                .choose_turn(&mut game.table, &scores, game.turn_state.actions_left)
                .unwrap();
            play(&mut game, seat, &commands);

            while game.turn_state.kind == TurnStateType::Bumping {
                let bumped = game.turn_state.bumping_player;
                let turn = game.turn_state.clone();
                let response = planners[bumped]
                    .respond_to_bump(&mut game.table, &turn)
                    .unwrap();
                play(&mut game, bumped, &response);

                let scores = game.table.scores.clone();
                let rest = planners[seat]
                    .choose_turn(&mut game.table, &scores, game.turn_state.actions_left)
                    .unwrap();
                play(&mut game, seat, &rest);
            }
            if game.turn_state.player == seat && game.status == GameStatus::Running {
                game.end_turn(seat, t0()).unwrap();
            }
            turns += 1;
        }
        assert_eq!(turns, 8);
        let census = game.table.census();
        for board in &game.table.player_boards {
            let pieces: usize = census
                .iter()
                .filter(|((c, _), _)| *c == board.color)
                .map(|(_, n)| n)
                .sum();
            assert_eq!(pieces, 11 + 1 + 18);
        }
    }
}
