//! Hansa Teutonica multiplayer server
//!
//! One actor per game owns the table and linearizes every move; bots
//! play through the same client contract as people.

pub mod bot;
pub mod client;
pub mod config;
pub mod game;
pub mod lobby;
pub mod protocol;

pub use bot::{BotClient, BotManager, BOTS};
pub use client::{connection, Client, Connection, Inbound, MultiClient, Remote};
pub use config::{ConfigError, ServerConfig};
pub use game::{GameActor, GameClosed, GameHandle};
pub use lobby::{Database, DatabaseError, Lobby, LobbyError, LobbyHandle, MemoryDatabase};
pub use protocol::*;
