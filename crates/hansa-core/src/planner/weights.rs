//! Tunable planner weights.
//!
//! Every fitness is `100 ×` a chain of the factors below. A factor missing
//! from its table is worth 0, which rules the plan out.

use std::collections::BTreeMap;

use hansa_protocol::Award;
use serde::{Deserialize, Serialize};

use super::context::GamePhase;
use super::plan::PlanLength;

/// Largest value differential the move table is consulted for.
pub const MAX_MOVE_DELTA: i32 = 200;
/// Smallest value differential the move table is consulted for.
pub const MIN_MOVE_DELTA: i32 = -100;
/// Stock+supply counts above this share the last column.
pub const PIECE_CAP: u32 = 10;
/// Network deltas above this share the last entry.
pub const NETWORK_CAP: u32 = 6;

/// One weight table per game phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    pub early: Weights,
    pub mid: Weights,
    pub late: Weights,
}

impl WeightSet {
    pub fn for_phase(&self, phase: GamePhase) -> &Weights {
        match phase {
            GamePhase::Early => &self.early,
            GamePhase::Mid => &self.mid,
            GamePhase::Late => &self.late,
        }
    }
}

impl Default for WeightSet {
    fn default() -> Self {
        let early = Weights::generic();

        let mut mid = Weights::generic();
        mid.length.insert(PlanLength::Short, 1.2);
        mid.awards = generic_awards([1.5, 1.5, 1.6, 1.5, 1.8, 1.2]);

        let mut late = mid.clone();
        late.my_points = 1.7;
        late.others_points = 0.5;
        late.office = 1.9;
        late.first_office = 1.2;
        late.award_office = 1.0;
        late.network = BTreeMap::from([
            (0, 0.8),
            (1, 1.15),
            (2, 1.8),
            (3, 2.0),
            (4, 2.5),
            (5, 4.0),
            (6, 4.0),
        ]);
        late.non_control_office = 0.7;
        late.disc_office = 1.0;

        Self { early, mid, late }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Preference by plan length.
    pub length: BTreeMap<PlanLength, f64>,
    /// Keyed by the value differential of a move. A differential is rounded
    /// up to the next key present.
    pub moves: BTreeMap<i32, f64>,
    /// Aversion to bumping, keyed by bags level then stock+supply after
    /// paying (capped at 10). Applied once per bump.
    pub bump: BTreeMap<u32, BTreeMap<u32, f64>>,
    /// Extra factor when the bumped piece is a disc.
    pub disc_bump: f64,
    /// Applied once per control point the clear earns me.
    pub my_points: f64,
    /// Applied once per control point the clear gives an opponent.
    pub others_points: f64,
    /// Indexed by cubes left on the award track. For Coellen, by the index
    /// of the spot I can take.
    pub awards: BTreeMap<Award, Vec<f64>>,
    pub office: f64,
    /// The city has no office taken yet.
    pub first_office: f64,
    /// The city carries an award.
    pub award_office: f64,
    /// Keyed by the gain in network size, capped at 6.
    pub network: BTreeMap<u32, f64>,
    /// The office would not give me control.
    pub non_control_office: f64,
    pub disc_office: f64,
    /// Taste for blocking, keyed by books level then stock+supply.
    pub block: BTreeMap<u32, BTreeMap<u32, f64>>,
    /// Blocking takes two or more pieces.
    pub double_piece_block: f64,
    /// Two or more opponents already sit on the route.
    pub double_player_block: f64,
}

fn generic_awards(last: [f64; 6]) -> BTreeMap<Award, Vec<f64>> {
    let [discs, priviledge, bags, coellen, actions, keys] = last;
    BTreeMap::from([
        (Award::Discs, vec![0.0, 1.5, 1.3, discs]),
        (Award::Priviledge, vec![0.0, 1.5, 1.3, priviledge]),
        (Award::Bags, vec![0.0, 1.5, 1.2, bags]),
        (Award::Coellen, vec![1.1, 1.2, 1.3, coellen]),
        (Award::Actions, vec![0.0, 2.5, 1.1, 1.5, 1.1, actions]),
        (Award::Keys, vec![0.0, 1.6, 1.0, 1.5, keys]),
    ])
}

/// The same row for every key.
fn flat_rows(keys: &[u32], row: &[f64]) -> BTreeMap<u32, BTreeMap<u32, f64>> {
    let row: BTreeMap<u32, f64> = row
        .iter()
        .enumerate()
        .map(|(i, w)| (i as u32, *w))
        .collect();
    keys.iter().map(|k| (*k, row.clone())).collect()
}

impl Weights {
    /// Early game tuning shared by every bot.
    pub fn generic() -> Self {
        Self {
            length: BTreeMap::from([
                (PlanLength::Short, 1.1),
                (PlanLength::Full, 1.1),
                (PlanLength::Almost, 1.1),
                (PlanLength::Long, 1.1),
                (PlanLength::Uncompletable, 0.3),
            ]),
            moves: BTreeMap::from([
                (-100, 0.5),
                (0, 0.7),
                (50, 0.9),
                (80, 1.0),
                (120, 1.2),
                (150, 1.5),
                (200, 1.8),
            ]),
            bump: flat_rows(
                &[3, 5, 7, 100],
                &[0.0, 0.0, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8],
            ),
            disc_bump: 0.6,
            my_points: 1.3,
            others_points: 0.7,
            awards: generic_awards([2.5, 2.5, 2.6, 2.5, 2.8, 2.2]),
            office: 1.5,
            first_office: 1.1,
            award_office: 1.1,
            network: BTreeMap::from([
                (0, 0.8),
                (1, 1.05),
                (2, 1.4),
                (3, 1.6),
                (4, 2.0),
                (5, 2.5),
                (6, 3.0),
            ]),
            non_control_office: 0.9,
            disc_office: 0.8,
            block: flat_rows(
                &[2, 3, 4, 5],
                &[0.0, 0.0, 0.0, 0.4, 0.6, 0.8, 1.0, 1.4, 1.4, 1.4, 1.8],
            ),
            double_piece_block: 0.5,
            double_player_block: 0.6,
        }
    }

    pub fn length(&self, length: PlanLength) -> f64 {
        self.length.get(&length).copied().unwrap_or(0.0)
    }

    pub fn move_weight(&self, delta: i32) -> f64 {
        let delta = delta.clamp(MIN_MOVE_DELTA, MAX_MOVE_DELTA);
        self.moves
            .range(delta..)
            .next()
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn bump(&self, bags: u32, stock_and_supply: u32) -> f64 {
        lookup2(&self.bump, bags, stock_and_supply.min(PIECE_CAP))
    }

    pub fn award(&self, award: Award, index: usize) -> f64 {
        self.awards
            .get(&award)
            .and_then(|row| row.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn network(&self, delta: u32) -> f64 {
        self.network
            .get(&delta.min(NETWORK_CAP))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn block(&self, books: u32, stock_and_supply: u32) -> f64 {
        lookup2(&self.block, books, stock_and_supply.min(PIECE_CAP))
    }
}

fn lookup2(table: &BTreeMap<u32, BTreeMap<u32, f64>>, a: u32, b: u32) -> f64 {
    table
        .get(&a)
        .and_then(|row| row.get(&b))
        .copied()
        .unwrap_or(0.0)
}
