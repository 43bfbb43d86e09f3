//! Bot seats.
//!
//! A bot is a [`Connection`] whose far end is driven by a [`BotClient`]
//! task, so the game actor treats it exactly like a human tab.

mod client;

use tracing::info;

use hansa_core::WeightSet;
use hansa_protocol::Identity;

use crate::client::{connection, Connection};
use crate::config::ServerConfig;

pub use client::BotClient;

/// Known bots: id and display name.
pub const BOTS: [(&str, &str); 5] = [
    ("B1", "Derek (Bot)"),
    ("B2", "Canice (Bot)"),
    ("B3", "Jacob (Bot)"),
    ("B4", "BCripe (Bot)"),
    ("B5", "Cory (Bot)"),
];

/// Creates bot clients. Cheap to clone; every game gets its own copy.
#[derive(Clone, Debug)]
pub struct BotManager {
    weights: WeightSet,
    response_delay: std::time::Duration,
    capacity: usize,
}

impl BotManager {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            weights: config.weights(),
            response_delay: config.bot_response_delay(),
            capacity: config.bot_channel_capacity,
        }
    }

    pub fn identities() -> Vec<Identity> {
        BOTS.iter().map(|(id, name)| Identity::bot(*id, *name)).collect()
    }

    pub fn get_identity(&self, bot_id: &str) -> Option<Identity> {
        BOTS.iter()
            .find(|(id, _)| *id == bot_id)
            .map(|(id, name)| Identity::bot(*id, *name))
    }

    /// Start a bot playing as `identity` in `game_id` and return its
    /// server-side connection.
    pub fn new_bot(&self, identity: Identity, game_id: u64) -> Connection {
        let (conn, remote) = connection(identity.clone(), self.capacity);
        info!(bot = %identity.id, game = game_id, "bot created");
        let bot = BotClient::new(remote, game_id, self.weights.clone(), self.response_delay);
        tokio::spawn(bot.run());
        conn
    }
}
