//! Message contracts between clients and the server.
//!
//! Both directions are tagged enums; the wire form is MessagePack with
//! field names (or JSON for debugging).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hansa_core::Table;
use hansa_protocol::{
    from_json, from_msgpack, to_json, to_msgpack, GameStatus, Identity, NotificationType,
    ScoreType, Subaction, TurnState, WireError,
};

/// Client-to-server messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Register a new account
    RequestSignup {
        name: String,
        email: String,
        password: String,
    },
    /// Sign in to an existing account
    RequestSignin { email: String, password: String },
    UpdatePassword {
        email: String,
        old_password: String,
        new_password: String,
    },
    /// Open a new game with the sender as creator
    CreateGame,
    /// Take (or leave) a seat while the game is being created
    RequestSitdown { index: i32, sitdown: bool },
    /// Creator only: seat (or remove) a bot
    RequestSitdownBot {
        bot_id: String,
        index: i32,
        sitdown: bool,
    },
    /// Creator only
    StartGame,
    DoSubaction { subaction: Subaction },
    EndTurn,
    /// The bumped player is done replacing
    EndBump,
}

/// Server-to-client messages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Everything a new viewer needs, sent once on join
    NotifyFullGame {
        game_id: u64,
        status: GameStatus,
        creator: Identity,
        table: Table,
        turn_state: TurnState,
        elapsed_ms: Vec<i64>,
        scores: Vec<i32>,
        final_scores: Vec<BTreeMap<ScoreType, i32>>,
        game_end: bool,
    },
    NotifySitdown {
        identity: Identity,
        index: i32,
        sitdown: bool,
    },
    /// Seating is final; the table carries the shuffled seats and dealt pieces
    NotifyStartGame { table: Table },
    /// One accepted subaction and what it did
    NotifySubaction {
        player: usize,
        subaction: Subaction,
        score_deltas: Vec<i32>,
        turn_state: TurnState,
        game_end: bool,
    },
    NotifyNextTurn { turn_state: TurnState },
    /// Only the sender of the rejected subaction gets this
    NotifySubactionError { header: String, content: String },
    NotifyEndBump { turn_state: TurnState },
    NotifyScoringBegin,
    /// One endgame category, one value per seat
    NotifyEndgameScoring {
        score_type: ScoreType,
        scores: Vec<i32>,
    },
    NotifyComplete { scores: Vec<i32> },
    NotifyNotification {
        kind: NotificationType,
        header: String,
        content: String,
    },
    NotifySignedIn { identity: Identity },
    NotifyGameCreated { game_id: u64 },
    /// A rejected request other than a subaction
    ClientError { header: String, content: String },
}

impl ServerMessage {
    pub fn client_error(header: impl Into<String>, content: impl Into<String>) -> Self {
        ServerMessage::ClientError {
            header: header.into(),
            content: content.into(),
        }
    }

    pub fn notification(
        kind: NotificationType,
        header: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        ServerMessage::NotifyNotification {
            kind,
            header: header.into(),
            content: content.into(),
        }
    }

    /// The tag, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::NotifyFullGame { .. } => "NotifyFullGame",
            ServerMessage::NotifySitdown { .. } => "NotifySitdown",
            ServerMessage::NotifyStartGame { .. } => "NotifyStartGame",
            ServerMessage::NotifySubaction { .. } => "NotifySubaction",
            ServerMessage::NotifyNextTurn { .. } => "NotifyNextTurn",
            ServerMessage::NotifySubactionError { .. } => "NotifySubactionError",
            ServerMessage::NotifyEndBump { .. } => "NotifyEndBump",
            ServerMessage::NotifyScoringBegin => "NotifyScoringBegin",
            ServerMessage::NotifyEndgameScoring { .. } => "NotifyEndgameScoring",
            ServerMessage::NotifyComplete { .. } => "NotifyComplete",
            ServerMessage::NotifyNotification { .. } => "NotifyNotification",
            ServerMessage::NotifySignedIn { .. } => "NotifySignedIn",
            ServerMessage::NotifyGameCreated { .. } => "NotifyGameCreated",
            ServerMessage::ClientError { .. } => "ClientError",
        }
    }
}

/// Serialize a client message for the network
pub fn serialize_client_message(msg: &ClientMessage) -> Result<Vec<u8>, WireError> {
    to_msgpack(msg)
}

/// Deserialize a client message from network data
pub fn deserialize_client_message(data: &[u8]) -> Result<ClientMessage, WireError> {
    from_msgpack(data)
}

/// Serialize a server message for the network
pub fn serialize_server_message(msg: &ServerMessage) -> Result<Vec<u8>, WireError> {
    to_msgpack(msg)
}

/// Deserialize a server message from network data
pub fn deserialize_server_message(data: &[u8]) -> Result<ServerMessage, WireError> {
    from_msgpack(data)
}

/// JSON form of a server message, for logs and debugging clients
pub fn server_message_json(msg: &ServerMessage) -> Result<String, WireError> {
    to_json(msg)
}

pub fn client_message_from_json(text: &str) -> Result<ClientMessage, WireError> {
    from_json(text)
}
