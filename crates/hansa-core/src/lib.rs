//! Rules engine and bot planner for Hansa Teutonica.

mod board;
mod board_data;
mod city;
mod error;
mod game;
pub mod planner;
mod player_board;
mod table;

pub use crate::board::*;
pub use crate::board_data::*;
pub use crate::city::*;
pub use crate::error::*;
pub use crate::game::*;
pub use crate::planner::{Command, Goal, Plan, PlanContext, Planner, WeightSet, Weights};
pub use crate::player_board::*;
pub use crate::table::*;
