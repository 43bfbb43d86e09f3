//! Lobby: game creation, join routing and accounts.
//!
//! The lobby runs as its own actor. It allocates game ids through the
//! [`Database`] collaborator, spawns a [`GameActor`] per game and forgets
//! the game once the actor reports teardown.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use hansa_core::{base45, BoardDataError, Game};
use hansa_protocol::Identity;

use crate::bot::BotManager;
use crate::client::Connection;
use crate::config::ServerConfig;
use crate::game::{GameActor, GameClosed, GameHandle};
use crate::protocol::{ClientMessage, ServerMessage};

/// Persistence collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    #[error("No game ids left")]
    GameIdsExhausted,
    #[error("An account already uses {0}")]
    EmailTaken(String),
    #[error("Email or password is incorrect")]
    BadCredentials,
    #[error("{0}")]
    Unavailable(String),
}

/// Id allocation and accounts.
#[async_trait]
pub trait Database: Send + Sync {
    async fn get_new_game_id(&self) -> Result<u64, DatabaseError>;

    async fn identity(&self, id: &str) -> Result<Option<Identity>, DatabaseError>;

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Identity, DatabaseError>;

    async fn signin(&self, email: &str, password: &str) -> Result<Identity, DatabaseError>;

    async fn update_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DatabaseError>;
}

struct Account {
    identity: Identity,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    next_game_id: u64,
    next_player_id: u64,
    /// Keyed by email
    accounts: BTreeMap<String, Account>,
}

/// In-process [`Database`] for tests and self-play. Nothing is persisted.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<MemoryState>,
    game_id_limit: Option<u64>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to hand out more than `limit` game ids.
    pub fn with_game_id_limit(limit: u64) -> Self {
        Self {
            game_id_limit: Some(limit),
            ..Self::default()
        }
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, DatabaseError> {
        self.state
            .lock()
            .map_err(|_| DatabaseError::Unavailable("memory database poisoned".to_string()))
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn get_new_game_id(&self) -> Result<u64, DatabaseError> {
        let mut state = self.state()?;
        if self.game_id_limit.is_some_and(|limit| state.next_game_id >= limit) {
            return Err(DatabaseError::GameIdsExhausted);
        }
        state.next_game_id += 1;
        Ok(state.next_game_id)
    }

    async fn identity(&self, id: &str) -> Result<Option<Identity>, DatabaseError> {
        let state = self.state()?;
        Ok(state
            .accounts
            .values()
            .find(|a| a.identity.id == id)
            .map(|a| a.identity.clone()))
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Identity, DatabaseError> {
        let mut state = self.state()?;
        if state.accounts.contains_key(email) {
            return Err(DatabaseError::EmailTaken(email.to_string()));
        }
        state.next_player_id += 1;
        let identity = Identity::new(format!("P{}", state.next_player_id), name);
        state.accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        Ok(identity)
    }

    async fn signin(&self, email: &str, password: &str) -> Result<Identity, DatabaseError> {
        let state = self.state()?;
        match state.accounts.get(email) {
            Some(account) if account.password == password => Ok(account.identity.clone()),
            _ => Err(DatabaseError::BadCredentials),
        }
    }

    async fn update_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state()?;
        match state.accounts.get_mut(email) {
            Some(account) if account.password == old_password => {
                account.password = new_password.to_string();
                Ok(())
            }
            _ => Err(DatabaseError::BadCredentials),
        }
    }
}

/// Lobby errors
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Board data is broken: {0}")]
    Board(#[from] BoardDataError),
    #[error("Game {0} does not exist")]
    NoSuchGame(u64),
    #[error(transparent)]
    GameClosed(#[from] GameClosed),
    #[error("Lobby has shut down")]
    Closed,
}

enum LobbyRequest {
    CreateGame {
        creator: Identity,
        respond: oneshot::Sender<Result<u64, LobbyError>>,
    },
    Join {
        game_id: u64,
        conn: Connection,
        respond: oneshot::Sender<Result<(), LobbyError>>,
    },
    Games {
        respond: oneshot::Sender<Vec<u64>>,
    },
}

/// Cloneable way to reach the lobby.
#[derive(Clone)]
pub struct LobbyHandle {
    requests: mpsc::Sender<LobbyRequest>,
    db: Arc<dyn Database>,
}

impl LobbyHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LobbyRequest,
    ) -> Result<T, LobbyError> {
        let (respond, response) = oneshot::channel();
        self.requests
            .send(make(respond))
            .await
            .map_err(|_| LobbyError::Closed)?;
        response.await.map_err(|_| LobbyError::Closed)
    }

    /// Allocate an id and start a game with `creator` as its creator.
    pub async fn create_game(&self, creator: Identity) -> Result<u64, LobbyError> {
        self.request(|respond| LobbyRequest::CreateGame { creator, respond })
            .await?
    }

    pub async fn join(&self, game_id: u64, conn: Connection) -> Result<(), LobbyError> {
        self.request(|respond| LobbyRequest::Join {
            game_id,
            conn,
            respond,
        })
        .await?
    }

    /// Ids of the live games.
    pub async fn games(&self) -> Result<Vec<u64>, LobbyError> {
        self.request(|respond| LobbyRequest::Games { respond }).await
    }

    /// Answer a session-level message (accounts, game creation) from `from`.
    pub async fn handle(&self, from: &Identity, msg: ClientMessage) -> ServerMessage {
        let result = match msg {
            ClientMessage::RequestSignup {
                name,
                email,
                password,
            } => self
                .db
                .signup(&name, &email, &password)
                .await
                .map(|identity| ServerMessage::NotifySignedIn { identity })
                .map_err(|e| ("Signup Error", e.to_string())),
            ClientMessage::RequestSignin { email, password } => self
                .db
                .signin(&email, &password)
                .await
                .map(|identity| ServerMessage::NotifySignedIn { identity })
                .map_err(|e| ("Signin Error", e.to_string())),
            ClientMessage::UpdatePassword {
                email,
                old_password,
                new_password,
            } => self
                .db
                .update_password(&email, &old_password, &new_password)
                .await
                .map(|()| {
                    ServerMessage::notification(
                        hansa_protocol::NotificationType::Success,
                        "Password",
                        "Password updated",
                    )
                })
                .map_err(|e| ("Password Error", e.to_string())),
            ClientMessage::CreateGame => self
                .create_game(from.clone())
                .await
                .map(|game_id| ServerMessage::NotifyGameCreated { game_id })
                .map_err(|e| ("CreateGame Error", e.to_string())),
            _ => Err(("Lobby Error", "Join a game first".to_string())),
        };
        result.unwrap_or_else(|(header, content)| {
            warn!(identity = %from.id, header, %content, "lobby request rejected");
            ServerMessage::client_error(header, content)
        })
    }
}

/// Lobby actor state
pub struct Lobby {
    db: Arc<dyn Database>,
    config: Arc<ServerConfig>,
    bots: BotManager,
    games: HashMap<u64, GameHandle>,
    requests: mpsc::Receiver<LobbyRequest>,
    teardown_tx: mpsc::Sender<u64>,
    teardown_rx: mpsc::Receiver<u64>,
}

impl Lobby {
    pub fn new(db: Arc<dyn Database>, config: ServerConfig) -> (Self, LobbyHandle) {
        let (tx, requests) = mpsc::channel(config.join_channel_capacity);
        let (teardown_tx, teardown_rx) = mpsc::channel(config.join_channel_capacity);
        let bots = BotManager::new(&config);
        let handle = LobbyHandle {
            requests: tx,
            db: db.clone(),
        };
        let lobby = Self {
            db,
            config: Arc::new(config),
            bots,
            games: HashMap::new(),
            requests,
            teardown_tx,
            teardown_rx,
        };
        (lobby, handle)
    }

    /// Create the lobby and run it on the runtime.
    pub fn spawn(db: Arc<dyn Database>, config: ServerConfig) -> LobbyHandle {
        let (lobby, handle) = Self::new(db, config);
        tokio::spawn(lobby.run());
        handle
    }

    pub async fn run(mut self) {
        let mut open = true;
        loop {
            tokio::select! {
                request = self.requests.recv(), if open => match request {
                    Some(request) => self.handle(request).await,
                    None => open = false,
                },
                Some(game_id) = self.teardown_rx.recv() => {
                    self.games.remove(&game_id);
                    info!(game = game_id, live = self.games.len(), "game removed");
                }
            }
            if !open && self.games.is_empty() {
                break;
            }
        }
        info!("lobby closed");
    }

    async fn handle(&mut self, request: LobbyRequest) {
        match request {
            LobbyRequest::CreateGame { creator, respond } => {
                if respond.send(self.create_game(creator).await).is_err() {
                    debug!("create_game caller went away");
                }
            }
            LobbyRequest::Join {
                game_id,
                conn,
                respond,
            } => {
                let result = match self.games.get(&game_id) {
                    Some(handle) => handle.join(conn).await.map_err(LobbyError::from),
                    None => Err(LobbyError::NoSuchGame(game_id)),
                };
                if respond.send(result).is_err() {
                    debug!(game = game_id, "join caller went away");
                }
            }
            LobbyRequest::Games { respond } => {
                let mut ids: Vec<u64> = self.games.keys().copied().collect();
                ids.sort_unstable();
                if respond.send(ids).is_err() {
                    debug!("games caller went away");
                }
            }
        }
    }

    async fn create_game(&mut self, creator: Identity) -> Result<u64, LobbyError> {
        let game_id = self.db.get_new_game_id().await?;
        let game = Game::new(game_id, creator.clone(), base45()?);
        let (actor, handle) = GameActor::new(
            game,
            self.config.clone(),
            self.bots.clone(),
            Some(self.teardown_tx.clone()),
        );
        actor.spawn();
        self.games.insert(game_id, handle);
        info!(game = game_id, creator = %creator.id, "game created");
        Ok(game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connection;

    #[tokio::test]
    async fn memory_database_accounts() {
        let db = MemoryDatabase::new();
        let ada = db.signup("Ada", "ada@example.com", "pw").await.unwrap();
        assert_eq!(ada.id, "P1");
        assert_eq!(
            db.signup("Ada", "ada@example.com", "pw").await,
            Err(DatabaseError::EmailTaken("ada@example.com".into()))
        );
        assert_eq!(db.signin("ada@example.com", "pw").await, Ok(ada.clone()));
        assert_eq!(
            db.signin("ada@example.com", "nope").await,
            Err(DatabaseError::BadCredentials)
        );
        db.update_password("ada@example.com", "pw", "pw2").await.unwrap();
        assert!(db.signin("ada@example.com", "pw2").await.is_ok());
        assert_eq!(db.identity("P1").await, Ok(Some(ada)));
    }

    #[tokio::test]
    async fn exhausted_ids_create_nothing() {
        let handle = Lobby::spawn(
            Arc::new(MemoryDatabase::with_game_id_limit(1)),
            ServerConfig::default(),
        );
        let ada = Identity::new("P1", "Ada");
        assert_eq!(handle.create_game(ada.clone()).await.unwrap(), 1);
        let err = handle.create_game(ada).await.unwrap_err();
        assert!(matches!(err, LobbyError::Database(DatabaseError::GameIdsExhausted)));
        assert_eq!(handle.games().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn join_routes_by_game_id() {
        let handle = Lobby::spawn(Arc::new(MemoryDatabase::new()), ServerConfig::default());
        let ada = Identity::new("P1", "Ada");
        let game_id = handle.create_game(ada.clone()).await.unwrap();

        let (conn, mut remote) = connection(ada.clone(), 8);
        handle.join(game_id, conn).await.unwrap();
        assert!(matches!(
            remote.recv().await,
            Some(ServerMessage::NotifyFullGame { game_id: 1, .. })
        ));

        let (conn, _remote) = connection(ada, 8);
        assert!(matches!(
            handle.join(99, conn).await,
            Err(LobbyError::NoSuchGame(99))
        ));
    }

    #[tokio::test]
    async fn session_messages() {
        let handle = Lobby::spawn(Arc::new(MemoryDatabase::new()), ServerConfig::default());
        let guest = Identity::guest("G1");
        let reply = handle
            .handle(
                &guest,
                ClientMessage::RequestSignup {
                    name: "Bo".into(),
                    email: "bo@example.com".into(),
                    password: "pw".into(),
                },
            )
            .await;
        let ServerMessage::NotifySignedIn { identity } = reply else {
            panic!("unexpected reply {reply:?}");
        };
        assert_eq!(identity.name, "Bo");

        let reply = handle.handle(&identity, ClientMessage::CreateGame).await;
        assert_eq!(reply, ServerMessage::NotifyGameCreated { game_id: 1 });

        let reply = handle.handle(&identity, ClientMessage::EndTurn).await;
        assert_eq!(
            reply,
            ServerMessage::client_error("Lobby Error", "Join a game first")
        );
    }
}
