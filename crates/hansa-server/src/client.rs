//! Client abstraction and per-identity session fan-in.
//!
//! A [`Connection`] is one physical link (a socket, a bot task, a test
//! harness); the far end holds the matching [`Remote`]. A [`MultiClient`]
//! merges every connection of one identity into a single inbound stream
//! and copies outbound messages to all of them. Its inbound stream ends
//! once the last connection is gone; adding a connection after that hands
//! out a fresh stream.

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use hansa_protocol::Identity;

use crate::protocol::{ClientMessage, ServerMessage};

/// Inbound client messages. Ends when the sender side is gone.
pub type Inbound = BoxStream<'static, ClientMessage>;

/// What the game actor needs from whoever sits on the other end.
pub trait Client: Send {
    fn identity(&self) -> &Identity;

    /// Queue a message without waiting. Only a closed peer loses it.
    fn send(&mut self, msg: &ServerMessage);

    /// Take the inbound stream. `None` once taken, or while nothing new is
    /// connected.
    fn read(&mut self) -> Option<Inbound>;

    /// No peer is listening any more.
    fn done(&self) -> bool;
}

/// Adapt a channel receiver into a stream.
pub fn receiver_stream<T: Send + 'static>(rx: mpsc::Receiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|msg| (msg, rx)) }).boxed()
}

/// Server side of one physical link.
pub struct Connection {
    identity: Identity,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    inbound: Option<mpsc::Receiver<ClientMessage>>,
}

/// Far side of one physical link.
pub struct Remote {
    pub identity: Identity,
    tx: mpsc::Sender<ClientMessage>,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

/// A linked connection pair. Client messages queue in `capacity` slots;
/// server messages are never dropped for a slow reader, so that queue is
/// unbounded.
pub fn connection(identity: Identity, capacity: usize) -> (Connection, Remote) {
    let (client_tx, client_rx) = mpsc::channel(capacity);
    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let conn = Connection {
        identity: identity.clone(),
        outbound: server_tx,
        inbound: Some(client_rx),
    };
    let remote = Remote {
        identity,
        tx: client_tx,
        rx: server_rx,
    };
    (conn, remote)
}

fn deliver(identity: &Identity, tx: &mpsc::UnboundedSender<ServerMessage>, msg: &ServerMessage) {
    if tx.send(msg.clone()).is_err() {
        debug!(identity = %identity.id, message = msg.name(), "client gone, dropping message");
    }
}

impl Client for Connection {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn send(&mut self, msg: &ServerMessage) {
        deliver(&self.identity, &self.outbound, msg);
    }

    fn read(&mut self) -> Option<Inbound> {
        self.inbound.take().map(receiver_stream)
    }

    fn done(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl Remote {
    /// Returns false once the server side is gone.
    pub async fn send(&self, msg: ClientMessage) -> bool {
        self.tx.send(msg).await.is_ok()
    }

    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.rx.try_recv().ok()
    }
}

/// Every connection of one identity, seen as one client.
pub struct MultiClient {
    identity: Identity,
    outbound: Vec<mpsc::UnboundedSender<ServerMessage>>,
    /// Feeds the live merged stream; dead once every forwarder has exited
    merged: Option<mpsc::WeakSender<ClientMessage>>,
    fresh: Option<Inbound>,
    capacity: usize,
}

impl MultiClient {
    /// A client with no connections.
    pub fn new(identity: Identity, capacity: usize) -> Self {
        Self {
            identity,
            outbound: Vec::new(),
            merged: None,
            fresh: None,
            capacity,
        }
    }

    /// Attach another physical connection. When no merged stream is live a
    /// new one is started and can be taken with [`Client::read`].
    pub fn add(&mut self, mut conn: Connection) {
        self.outbound.retain(|tx| !tx.is_closed());
        self.outbound.push(conn.outbound.clone());
        let Some(mut inbound) = conn.inbound.take() else {
            return;
        };

        let live = self.merged.as_ref().and_then(|weak| weak.upgrade());
        let tx = match live {
            Some(tx) => tx,
            None => {
                let (tx, rx) = mpsc::channel(self.capacity);
                self.merged = Some(tx.downgrade());
                self.fresh = Some(receiver_stream(rx));
                tx
            }
        };
        tokio::spawn(async move {
            while let Some(msg) = inbound.recv().await {
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Live physical connections.
    pub fn connections(&self) -> usize {
        self.outbound.iter().filter(|tx| !tx.is_closed()).count()
    }
}

impl Client for MultiClient {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn send(&mut self, msg: &ServerMessage) {
        self.outbound.retain(|tx| !tx.is_closed());
        for tx in &self.outbound {
            deliver(&self.identity, tx, msg);
        }
    }

    fn read(&mut self) -> Option<Inbound> {
        self.fresh.take()
    }

    fn done(&self) -> bool {
        self.connections() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Identity {
        Identity::new("P1", "Ada")
    }

    #[tokio::test]
    async fn connection_carries_both_directions() {
        let (mut conn, mut remote) = connection(ada(), 4);
        let mut inbound = conn.read().unwrap();
        assert!(conn.read().is_none());

        assert!(remote.send(ClientMessage::EndTurn).await);
        assert_eq!(inbound.next().await, Some(ClientMessage::EndTurn));

        conn.send(&ServerMessage::NotifyScoringBegin);
        assert_eq!(remote.recv().await, Some(ServerMessage::NotifyScoringBegin));

        drop(remote);
        assert_eq!(inbound.next().await, None);
        assert!(conn.done());
    }

    #[tokio::test]
    async fn multi_client_merges_and_copies() {
        let mut multi = MultiClient::new(ada(), 8);
        let (first, mut first_remote) = connection(ada(), 8);
        let (second, mut second_remote) = connection(ada(), 8);
        multi.add(first);
        let mut inbound = multi.read().unwrap();
        multi.add(second);
        assert!(multi.read().is_none(), "second tab joins the live stream");
        assert_eq!(multi.connections(), 2);

        first_remote.send(ClientMessage::EndTurn).await;
        second_remote.send(ClientMessage::EndBump).await;
        let mut got = vec![inbound.next().await.unwrap(), inbound.next().await.unwrap()];
        got.sort_by_key(|m| format!("{m:?}"));
        assert_eq!(got, vec![ClientMessage::EndBump, ClientMessage::EndTurn]);

        multi.send(&ServerMessage::NotifyScoringBegin);
        assert_eq!(first_remote.recv().await, Some(ServerMessage::NotifyScoringBegin));
        assert_eq!(second_remote.recv().await, Some(ServerMessage::NotifyScoringBegin));
    }

    #[tokio::test]
    async fn stream_ends_with_last_connection_and_restarts() {
        let mut multi = MultiClient::new(ada(), 8);
        assert!(multi.done());
        let (conn, remote) = connection(ada(), 8);
        multi.add(conn);
        let mut inbound = multi.read().unwrap();
        drop(remote);
        assert_eq!(inbound.next().await, None);
        assert!(multi.done());

        let (conn, remote) = connection(ada(), 8);
        multi.add(conn);
        let mut inbound = multi.read().expect("reconnect starts a new stream");
        remote.send(ClientMessage::StartGame).await;
        assert_eq!(inbound.next().await, Some(ClientMessage::StartGame));
        assert!(!multi.done());
    }

    #[tokio::test]
    async fn slow_reader_loses_nothing() {
        let (mut conn, mut remote) = connection(ada(), 2);
        for _ in 0..50 {
            conn.send(&ServerMessage::NotifyScoringBegin);
        }
        conn.send(&ServerMessage::NotifyComplete { scores: vec![3] });
        for _ in 0..50 {
            assert_eq!(remote.try_recv(), Some(ServerMessage::NotifyScoringBegin));
        }
        assert_eq!(
            remote.try_recv(),
            Some(ServerMessage::NotifyComplete { scores: vec![3] })
        );
    }
}
