use tokio::sync::mpsc;

use crate::client::Connection;
use crate::protocol::ServerMessage;

/// The actor's inbox was dropped: the game has been torn down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("game {0} is closed")]
pub struct GameClosed(pub u64);

/// Cheap, cloneable way to reach a running game actor.
#[derive(Clone, Debug)]
pub struct GameHandle {
    game_id: u64,
    joins: mpsc::Sender<Connection>,
    broadcasts: mpsc::Sender<ServerMessage>,
    timeouts: mpsc::Sender<()>,
}

impl GameHandle {
    pub(super) fn new(
        game_id: u64,
        joins: mpsc::Sender<Connection>,
        broadcasts: mpsc::Sender<ServerMessage>,
        timeouts: mpsc::Sender<()>,
    ) -> Self {
        Self {
            game_id,
            joins,
            broadcasts,
            timeouts,
        }
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    /// Hand a new connection to the game. It is sent the full game state
    /// and then joins its identity's seat or the observers.
    pub async fn join(&self, conn: Connection) -> Result<(), GameClosed> {
        self.joins
            .send(conn)
            .await
            .map_err(|_| GameClosed(self.game_id))
    }

    /// Send `msg` to everyone watching the game.
    pub async fn broadcast(&self, msg: ServerMessage) -> Result<(), GameClosed> {
        self.broadcasts
            .send(msg)
            .await
            .map_err(|_| GameClosed(self.game_id))
    }

    pub async fn timeout(&self) -> Result<(), GameClosed> {
        self.timeouts
            .send(())
            .await
            .map_err(|_| GameClosed(self.game_id))
    }

    pub fn is_closed(&self) -> bool {
        self.joins.is_closed()
    }
}
