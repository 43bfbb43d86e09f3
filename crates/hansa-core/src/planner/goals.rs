//! Plan generators, one per goal. Each runs its sketch against the live
//! table and leaves it exactly as it found it.

use std::collections::BTreeSet;

use hansa_protocol::{Award, Location, Piece, PlayerColor, Shape};

use super::context::PlanContext;
use super::fitness::{BumpInfo, ClearFitness, Fitness};
use super::plan::{Goal, Plan, PlanLength, Step, StepKind};
use super::sketch::{route_award, Sketch};
use super::weights::{Weights, NETWORK_CAP, PIECE_CAP};
use crate::error::InvariantViolation;
use crate::table::Table;

fn score(plan: &mut Plan, w: &Weights) {
    let (value, description) = plan.fitness.evaluate(w);
    plan.value = value;
    plan.description = description;
}

fn cleared(plan: &Plan) -> bool {
    matches!(plan.length, PlanLength::Short | PlanLength::Full)
}

fn capped_pieces(ctx: &PlanContext) -> u32 {
    (ctx.stock_and_supply() as u32).min(PIECE_CAP)
}

/// Send the last clear of a `shape` piece to `dest` instead of stock and run
/// it after the other clears, so the opening clear is the one that starts
/// the Clearing state.
fn retarget_clear(steps: &mut Vec<Step>, route: usize, shape: Shape, dest: Location) -> bool {
    let Some(i) = steps.iter().rposition(|s| {
        s.kind == StepKind::Clear
            && s.subaction.source.route_id() == Some(route)
            && s.subaction.piece.shape == shape
    }) else {
        return false;
    };
    let mut step = steps.remove(i);
    step.subaction.dest = dest;
    let at = steps
        .iter()
        .rposition(|s| s.kind == StepKind::Clear)
        .map_or(steps.len(), |j| j + 1);
    steps.insert(at, step);
    true
}

/// The last empty Coellen spot my priviledge reaches.
pub(super) fn coellen_target(table: &Table, seat: usize) -> Option<Location> {
    let mine = table.player_boards[seat].priviledge();
    table
        .board
        .cities
        .iter()
        .flat_map(|c| {
            c.coellen
                .iter()
                .enumerate()
                .map(move |(i, s)| (c.id, i, s))
        })
        .filter(|(_, _, s)| s.priviledge <= mine && s.piece.is_empty())
        .last()
        .map(|(city, i, _)| Location::coellen(city, i))
}

fn coellen_index(l: Location) -> usize {
    match l {
        Location::City { index, .. } => index,
        _ => 0,
    }
}

/// How much I want `award` right now. Zero when I could not take it.
pub(super) fn raw_award_weight(
    table: &Table,
    seat: usize,
    award: Award,
    ctx: &PlanContext,
    w: &Weights,
) -> f64 {
    match award {
        Award::None => 0.0,
        Award::Coellen => {
            if !ctx.has_disc() {
                return 0.0;
            }
            coellen_target(table, seat)
                .map(|l| w.award(Award::Coellen, coellen_index(l)))
                .unwrap_or(0.0)
        }
        track => match table.player_boards[seat].award_track_remaining(track) {
            0 => 0.0,
            left => w.award(track, left),
        },
    }
}

/// First empty office of `city` and its shape. None when it is beyond my
/// priviledge or the city is full.
pub(super) fn office_target(table: &Table, seat: usize, city: usize) -> Option<(usize, Shape)> {
    let c = &table.board.cities[city];
    let i = c.next_office()?;
    let office = &c.offices[i];
    if table.player_boards[seat].priviledge() < office.priviledge {
        return None;
    }
    Some((i, office.shape))
}

/// Fill `route` with my pieces and clear it for control points. With
/// `use_moves` a second variant tries to fill open spots by moving pieces
/// off my weakest routes.
pub(super) fn points_plans(
    table: &mut Table,
    seat: usize,
    route: usize,
    ctx: &PlanContext,
    w: &Weights,
    shape: Shape,
) -> Result<Vec<Plan>, InvariantViolation> {
    let mut plans = vec![points_plan(table, seat, route, ctx, w, shape, false)?];
    let moved = points_plan(table, seat, route, ctx, w, shape, true)?;
    if moved.steps.iter().any(|s| s.kind == StepKind::Move) {
        plans.push(moved);
    }
    Ok(plans)
}

fn points_plan(
    table: &mut Table,
    seat: usize,
    route: usize,
    ctx: &PlanContext,
    w: &Weights,
    mut shape: Shape,
    use_moves: bool,
) -> Result<Plan, InvariantViolation> {
    let color = table.player_boards[seat].color;
    let bags = table.player_boards[seat].bags();
    let books = table.player_boards[seat].books();
    let r = &table.board.routes[route];
    if shape != Shape::None && r.spots.contains(&Piece::new(color, shape)) {
        shape = Shape::None;
    }

    let mut fitness = ClearFitness::default();
    let mut stock_and_supply = capped_pieces(ctx);
    let mut open = Vec::new();
    let mut cubes = Vec::new();
    let mut discs = Vec::new();
    for (i, p) in r.spots.iter().enumerate() {
        if p.color == color {
            continue;
        }
        let l = Location::spot(route, i);
        if p.is_empty() {
            open.push(l);
            continue;
        }
        if p.is_disc() {
            discs.push(l);
            stock_and_supply = stock_and_supply.saturating_sub(2);
        } else {
            cubes.push(l);
            stock_and_supply = stock_and_supply.saturating_sub(1);
        }
        fitness.bumps.push(BumpInfo {
            disc: p.is_disc(),
            bags,
            stock_and_supply,
        });
    }
    for city in [r.left_city, r.right_city] {
        match table.board.cities[city].control() {
            Some(c) if c == color => fitness.my_points += 1,
            Some(_) => fitness.others_points += 1,
            None => {}
        }
    }

    let mut sketch = Sketch::new(table, seat);
    let mut actions = ctx.actions_left;
    let mut moves = if use_moves { ctx.moves_left } else { 0 };
    let mut complete = true;
    let mut handoffs = Vec::new();

    for (n, dest) in open.iter().enumerate() {
        if moves > 0 && shape == Shape::None {
            if let Some(delta) = sketch.move_into(*dest, route)? {
                moves -= 1;
                fitness.moves.push(delta);
                continue;
            }
        }
        moves = 0;
        if actions == 0 {
            complete = false;
            break;
        }
        let start_move = use_moves
            && shape == Shape::None
            && open.len() - n >= 2
            && books >= 2
            && sketch.donor(route).is_some();
        if start_move {
            if let Some(delta) = sketch.move_into(*dest, route)? {
                actions -= 1;
                moves = books - 1;
                fitness.moves.push(delta);
                continue;
            }
        }
        let (used, done) = sketch.place(*dest, shape, actions == 1)?;
        shape = Shape::None;
        actions -= used;
        if !done {
            complete = false;
            break;
        }
    }

    let bumps = cubes
        .iter()
        .map(|l| (*l, false))
        .chain(discs.iter().map(|l| (*l, true)));
    for (dest, disc) in bumps {
        if !complete || actions == 0 {
            complete = false;
            break;
        }
        moves = 0;
        let (used, done) = sketch.bump(dest, shape, disc, actions == 1)?;
        shape = Shape::None;
        actions -= used;
        if !done {
            complete = false;
            break;
        }
        // Control passes to the bumped player after the last payment.
        handoffs.push(sketch.steps.len() - 1);
    }

    let mut cleared = false;
    if actions > 0 && complete {
        actions -= 1;
        moves = 0;
        cleared = true;
        sketch.clear(route)?;
    }

    let length = if actions > 0 {
        if complete {
            PlanLength::Short
        } else {
            PlanLength::Uncompletable
        }
    } else if cleared {
        PlanLength::Full
    } else if complete {
        PlanLength::Almost
    } else {
        PlanLength::Long
    };
    fitness.length = Some(length);

    let steps = sketch.finish()?;
    let mut plan = Plan {
        route,
        goal: Goal::Points,
        length,
        actions: ctx.actions_left - actions,
        leftover_moves: moves,
        fitness: Fitness::Points(fitness),
        value: 0.0,
        description: String::new(),
        steps,
        handoffs,
    };
    score(&mut plan, w);
    Ok(plan)
}

/// Clear `route` and take its city award.
pub(super) fn award_plans(
    table: &mut Table,
    seat: usize,
    route: usize,
    ctx: &PlanContext,
    w: &Weights,
) -> Result<Vec<Plan>, InvariantViolation> {
    let award = route_award(table, route);
    if raw_award_weight(table, seat, award, ctx, w) < 0.0001 {
        return Ok(Vec::new());
    }

    let (shape, target, index) = if award == Award::Coellen {
        let target = coellen_target(table, seat);
        (Shape::Disc, target, target.map(coellen_index).unwrap_or(0))
    } else {
        let left = table.player_boards[seat].award_track_remaining(award);
        (Shape::None, None, left)
    };

    let mut plans = points_plans(table, seat, route, ctx, w, shape)?;
    plans.retain_mut(|plan| {
        plan.goal = Goal::Award;
        let clear = plan.fitness.clear().cloned().unwrap_or_default();
        plan.fitness = Fitness::Award {
            clear,
            award,
            index,
        };
        score(plan, w);
        match target {
            Some(dest) if cleared(plan) => retarget_clear(&mut plan.steps, route, Shape::Disc, dest),
            _ => true,
        }
    });
    Ok(plans)
}

/// Clear `route` into an office of either end city. Only the better city
/// survives.
pub(super) fn office_plans(
    table: &mut Table,
    seat: usize,
    route: usize,
    ctx: &PlanContext,
    w: &Weights,
) -> Result<Vec<Plan>, InvariantViolation> {
    let color = table.player_boards[seat].color;
    let r = &table.board.routes[route];
    let cities = [r.left_city, r.right_city];
    let mut best: Option<Plan> = None;

    for city in cities {
        let Some((office, shape)) = office_target(table, seat, city) else {
            continue;
        };
        if shape == Shape::Disc && !ctx.stock_disc && !ctx.supply_disc {
            continue;
        }

        let c = &table.board.cities[city];
        let first_office = c.is_empty();
        let award_office = c.award != Award::None;
        let non_control_office = {
            let mut after = c.clone();
            after.offices[office].piece = Piece::new(color, shape);
            after.control() != Some(color)
        };
        let network_delta = table
            .board
            .network_score_if_city(color, city)
            .saturating_sub(table.board.network_score(color))
            .min(NETWORK_CAP as usize) as u32;

        for mut plan in points_plans(table, seat, route, ctx, w, shape)? {
            if cleared(&plan) {
                if !retarget_clear(&mut plan.steps, route, shape, Location::office(city, office)) {
                    continue;
                }
                // Taking the office forfeits the track award.
                plan.steps.retain(|s| s.kind != StepKind::Award);
            }
            plan.goal = Goal::Office;
            let clear = plan.fitness.clear().cloned().unwrap_or_default();
            plan.fitness = Fitness::Office {
                clear,
                first_office,
                award_office,
                non_control_office,
                disc_office: shape == Shape::Disc,
                network_delta,
            };
            score(&mut plan, w);
            if best.as_ref().map_or(true, |b| plan.value > b.value) {
                best = Some(plan);
            }
        }
    }
    Ok(best.into_iter().collect())
}

/// Sit on a route only opponents use, hoping to be bumped.
pub(super) fn block_plans(
    table: &mut Table,
    seat: usize,
    route: usize,
    ctx: &PlanContext,
    w: &Weights,
) -> Result<Vec<Plan>, InvariantViolation> {
    let color = table.player_boards[seat].color;
    let r = &table.board.routes[route];
    if r.holds(color) {
        return Ok(Vec::new());
    }
    let opponents: BTreeSet<PlayerColor> = r
        .spots
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.color)
        .collect();
    let open: Vec<Location> = r.open_spots().map(|i| Location::spot(route, i)).collect();
    if opponents.is_empty() || open.is_empty() {
        return Ok(Vec::new());
    }

    let award = route_award(table, route);
    let opponent_desire = raw_award_weight(table, seat, award, ctx, w).max(w.office);
    let books = table.player_boards[seat].books();

    let mut sketch = Sketch::new(table, seat);
    let mut actions = ctx.actions_left;
    let mut complete = true;
    for dest in &open {
        if actions == 0 {
            complete = false;
            break;
        }
        let (used, done) = sketch.place(*dest, Shape::None, actions == 1)?;
        actions -= used;
        if !done {
            complete = false;
            break;
        }
    }
    let steps = sketch.finish()?;

    let length = if !complete {
        PlanLength::Long
    } else if actions > 0 {
        PlanLength::Short
    } else {
        PlanLength::Full
    };
    let mut plan = Plan {
        route,
        goal: Goal::Block,
        length,
        actions: ctx.actions_left - actions,
        leftover_moves: 0,
        fitness: Fitness::Block {
            length,
            books,
            stock_and_supply: capped_pieces(ctx),
            opponent_desire,
            double_piece: open.len() > 1,
            double_player: opponents.len() > 1,
        },
        value: 0.0,
        description: String::new(),
        steps,
        handoffs: Vec::new(),
    };
    score(&mut plan, w);
    Ok(vec![plan])
}
