//! Shared vocabulary for the Hansa Teutonica server.
//!
//! Pieces, locations, subactions, identities and turn state are plain data
//! here; the rules engine lives in `hansa-core`.

pub mod identity;
pub mod location;
pub mod subaction;
pub mod turn_state;
pub mod types;
pub mod wire;

pub use identity::*;
pub use location::*;
pub use subaction::*;
pub use turn_state::*;
pub use types::*;
pub use wire::*;
