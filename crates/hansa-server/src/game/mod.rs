//! The game actor and the handle used to reach it.

mod actor;
mod handle;

pub use actor::GameActor;
pub use handle::{GameClosed, GameHandle};
