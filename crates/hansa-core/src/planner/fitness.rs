//! Multiplicative fitness chains.

use hansa_protocol::Award;

use super::plan::PlanLength;
use super::weights::Weights;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BumpInfo {
    pub disc: bool,
    pub bags: u32,
    /// Stock+supply left after paying, capped at 10.
    pub stock_and_supply: u32,
}

/// Shared by every goal that clears.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClearFitness {
    pub length: Option<PlanLength>,
    pub bumps: Vec<BumpInfo>,
    /// Value differential of each move the plan makes.
    pub moves: Vec<i32>,
    pub my_points: u32,
    pub others_points: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Fitness {
    Points(ClearFitness),
    Award {
        clear: ClearFitness,
        award: Award,
        /// Cubes left on the track, or the Coellen spot index.
        index: usize,
    },
    Office {
        clear: ClearFitness,
        first_office: bool,
        award_office: bool,
        non_control_office: bool,
        disc_office: bool,
        network_delta: u32,
    },
    Block {
        length: PlanLength,
        books: u32,
        stock_and_supply: u32,
        opponent_desire: f64,
        double_piece: bool,
        double_player: bool,
    },
}

/// Running product plus a readable trail of its factors.
struct Chain {
    value: f64,
    description: String,
}

impl Chain {
    fn new() -> Self {
        Self {
            value: 100.0,
            description: "100".to_string(),
        }
    }

    fn times(&mut self, weight: f64, label: impl std::fmt::Display) {
        self.value *= weight;
        self.description
            .push_str(&format!(" * {weight:.2} ({label})"));
    }

    fn times_if(&mut self, cond: bool, weight: f64, label: &str) {
        if cond {
            self.times(weight, label);
        }
    }
}

impl Fitness {
    pub fn value(&self, w: &Weights) -> f64 {
        self.evaluate(w).0
    }

    /// The fitness and how it was reached.
    pub fn evaluate(&self, w: &Weights) -> (f64, String) {
        let mut chain = Chain::new();
        match self {
            Fitness::Points(clear) => {
                length(&mut chain, w, clear);
                clear_factors(&mut chain, w, clear);
            }
            Fitness::Award {
                clear,
                award,
                index,
            } => {
                length(&mut chain, w, clear);
                chain.times(w.award(*award, *index), format!("Awards[{award:?}][{index}]"));
                clear_factors(&mut chain, w, clear);
            }
            Fitness::Office {
                clear,
                first_office,
                award_office,
                non_control_office,
                disc_office,
                network_delta,
            } => {
                length(&mut chain, w, clear);
                chain.times(w.office, "Office");
                chain.times_if(*first_office, w.first_office, "FirstOffice");
                chain.times_if(*award_office, w.award_office, "AwardOffice");
                chain.times_if(*non_control_office, w.non_control_office, "NonControlOffice");
                chain.times_if(*disc_office, w.disc_office, "DiscOffice");
                chain.times(w.network(*network_delta), format!("Network[{network_delta}]"));
                clear_factors(&mut chain, w, clear);
            }
            Fitness::Block {
                length,
                books,
                stock_and_supply,
                opponent_desire,
                double_piece,
                double_player,
            } => {
                chain.times(w.length(*length), format!("Length[{}]", length.name()));
                chain.times(*opponent_desire, "OpponentDesire");
                chain.times_if(*double_piece, w.double_piece_block, "DoublePiece");
                chain.times_if(*double_player, w.double_player_block, "DoublePlayer");
                chain.times(
                    w.block(*books, *stock_and_supply),
                    format!("Block[{books}][{stock_and_supply}]"),
                );
            }
        }
        (chain.value, chain.description)
    }

    pub fn clear(&self) -> Option<&ClearFitness> {
        match self {
            Fitness::Points(clear) | Fitness::Award { clear, .. } | Fitness::Office { clear, .. } => {
                Some(clear)
            }
            Fitness::Block { .. } => None,
        }
    }
}

fn length(chain: &mut Chain, w: &Weights, clear: &ClearFitness) {
    let length = clear.length.unwrap_or(PlanLength::Uncompletable);
    chain.times(w.length(length), format!("Length[{}]", length.name()));
}

fn clear_factors(chain: &mut Chain, w: &Weights, clear: &ClearFitness) {
    for bump in &clear.bumps {
        chain.times_if(bump.disc, w.disc_bump, "DiscBump");
        chain.times(
            w.bump(bump.bags, bump.stock_and_supply),
            format!("Bump[{}][{}]", bump.bags, bump.stock_and_supply),
        );
    }
    for delta in &clear.moves {
        chain.times(w.move_weight(*delta), format!("Move[{delta}]"));
    }
    for _ in 0..clear.my_points {
        chain.times(w.my_points, "MyPoints");
    }
    for _ in 0..clear.others_points {
        chain.times(w.others_points, "OthersPoints");
    }
}
