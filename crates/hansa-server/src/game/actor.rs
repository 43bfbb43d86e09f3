use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, BoxStream, SelectAll, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use hansa_core::{endgame_scores, Game, GameError, InvariantViolation, TurnOutcome};
use hansa_protocol::{Identity, NotificationType, ScoreType, Subaction};

use super::handle::GameHandle;
use crate::bot::BotManager;
use crate::client::{Client, Connection, Inbound, MultiClient};
use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage};

/// One message from one member stream. `None` marks the end of the stream.
struct Envelope {
    from: String,
    generation: u64,
    message: Option<ClientMessage>,
}

/// Self-fed, paced endgame reveal.
#[derive(Debug)]
enum ScoringEvent {
    Category(ScoreType, Vec<i32>),
    Complete,
}

/// A seat holder or observer.
struct Member {
    client: MultiClient,
    /// Tags the live inbound stream; envelopes from older streams are stale
    generation: u64,
    connected: bool,
}

/// Owns one game. Every mutation happens inside [`GameActor::run`], one
/// message at a time.
pub struct GameActor {
    game: Game,
    config: Arc<ServerConfig>,
    bots: BotManager,
    rng: StdRng,
    /// Keyed by identity id
    members: HashMap<String, Member>,
    inbound: SelectAll<BoxStream<'static, Envelope>>,
    next_generation: u64,
    joins: mpsc::Receiver<Connection>,
    joins_open: bool,
    broadcasts: mpsc::Receiver<ServerMessage>,
    timeouts: mpsc::Receiver<()>,
    scoring_tx: mpsc::Sender<ScoringEvent>,
    scoring_rx: mpsc::Receiver<ScoringEvent>,
    /// Told the game id once the actor exits
    teardown: Option<mpsc::Sender<u64>>,
}

fn tag(from: String, generation: u64, inbound: Inbound) -> BoxStream<'static, Envelope> {
    let last = Envelope {
        from: from.clone(),
        generation,
        message: None,
    };
    inbound
        .map(move |msg| Envelope {
            from: from.clone(),
            generation,
            message: Some(msg),
        })
        .chain(stream::once(async move { last }))
        .boxed()
}

impl GameActor {
    pub fn new(
        game: Game,
        config: Arc<ServerConfig>,
        bots: BotManager,
        teardown: Option<mpsc::Sender<u64>>,
    ) -> (Self, GameHandle) {
        let (join_tx, joins) = mpsc::channel(config.join_channel_capacity);
        let (broadcast_tx, broadcasts) = mpsc::channel(config.join_channel_capacity);
        let (timeout_tx, timeouts) = mpsc::channel(1);
        let (scoring_tx, scoring_rx) = mpsc::channel(ScoreType::ENDGAME.len() + 1);
        let handle = GameHandle::new(game.id, join_tx, broadcast_tx, timeout_tx);
        let actor = Self {
            game,
            config,
            bots,
            rng: StdRng::from_entropy(),
            members: HashMap::new(),
            inbound: SelectAll::new(),
            next_generation: 0,
            joins,
            joins_open: true,
            broadcasts,
            timeouts,
            scoring_tx,
            scoring_rx,
            teardown,
        };
        (actor, handle)
    }

    /// Seeded seat shuffling, for reproducible games.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Start the actor on the runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let id = self.game.id;
        info!(game = id, creator = %self.game.creator.id, "game created");
        loop {
            tokio::select! {
                conn = self.joins.recv(), if self.joins_open => match conn {
                    Some(conn) => self.join(conn),
                    None => self.joins_open = false,
                },
                Some(envelope) = self.inbound.next() => self.dispatch(envelope),
                Some(event) = self.scoring_rx.recv() => self.scoring(event),
                Some(msg) = self.broadcasts.recv() => self.broadcast(&msg),
                Some(()) = self.timeouts.recv() => {
                    debug!(game = id, player = self.game.turn_state.player, "turn timeouts are not enforced");
                }
                else => break,
            }
            if self.finished() {
                break;
            }
        }
        info!(game = id, status = self.game.status.name(), "game torn down");
        if let Some(teardown) = self.teardown.take() {
            if teardown.send(id).await.is_err() {
                debug!(game = id, "lobby gone before teardown notice");
            }
        }
    }

    /// Terminal (or unreachable) with nobody connected.
    fn finished(&self) -> bool {
        let closing = self.game.status.is_terminal() || !self.joins_open;
        closing && !self.members.values().any(|m| m.connected)
    }

    fn full_game(&self) -> ServerMessage {
        let game = &self.game;
        ServerMessage::NotifyFullGame {
            game_id: game.id,
            status: game.status,
            creator: game.creator.clone(),
            table: game.table.clone(),
            turn_state: game.turn_state.clone(),
            elapsed_ms: game.elapsed_ms.clone(),
            scores: game.table.scores.clone(),
            final_scores: game.final_scores.clone(),
            game_end: game.game_end,
        }
    }

    fn join(&mut self, mut conn: Connection) {
        let identity = conn.identity().clone();
        conn.send(&self.full_game());
        let seated = self.game.seat_of(&identity);
        info!(game = self.game.id, identity = %identity.id, ?seated, "joined");
        self.attach(identity, conn);
    }

    /// Merge `conn` into its identity's member, registering a new inbound
    /// stream when the member had none.
    fn attach(&mut self, identity: Identity, conn: Connection) {
        let capacity = self.config.client_channel_capacity;
        let member = self
            .members
            .entry(identity.id.clone())
            .or_insert_with(|| Member {
                client: MultiClient::new(identity.clone(), capacity),
                generation: 0,
                connected: false,
            });
        member.client.add(conn);
        if let Some(inbound) = member.client.read() {
            self.next_generation += 1;
            member.generation = self.next_generation;
            member.connected = true;
            self.inbound
                .push(tag(identity.id, self.next_generation, inbound));
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let Some(member) = self.members.get_mut(&envelope.from) else {
            return;
        };
        if member.generation != envelope.generation {
            return;
        }
        match envelope.message {
            Some(msg) => {
                let identity = member.client.identity().clone();
                self.handle_message(&identity, msg);
            }
            None => self.disconnected(&envelope.from),
        }
    }

    /// Seats go idle; observers are dropped.
    fn disconnected(&mut self, id: &str) {
        let Some(member) = self.members.get_mut(id) else {
            return;
        };
        let seat = self.game.seat_of(member.client.identity());
        if seat.is_some() {
            member.connected = false;
            info!(game = self.game.id, identity = id, ?seat, "seat disconnected");
        } else {
            self.members.remove(id);
            debug!(game = self.game.id, identity = id, "observer left");
        }
    }

    fn handle_message(&mut self, from: &Identity, msg: ClientMessage) {
        match msg {
            ClientMessage::RequestSitdown { index, sitdown } => {
                match self.game.sitdown(from, index, sitdown) {
                    Ok(()) => self.broadcast(&ServerMessage::NotifySitdown {
                        identity: from.clone(),
                        index,
                        sitdown,
                    }),
                    Err(e) => self.reject(from, e, false),
                }
            }
            ClientMessage::RequestSitdownBot {
                bot_id,
                index,
                sitdown,
            } => {
                let Some(bot) = self.bots.get_identity(&bot_id) else {
                    self.send_to(
                        from,
                        &ServerMessage::client_error(
                            "Sitdown Error",
                            format!("Not a valid bot: {bot_id}"),
                        ),
                    );
                    return;
                };
                match self.game.sitdown_bot(from, &bot, index, sitdown) {
                    Ok(()) => self.broadcast(&ServerMessage::NotifySitdown {
                        identity: bot,
                        index,
                        sitdown,
                    }),
                    Err(e) => self.reject(from, e, false),
                }
            }
            ClientMessage::StartGame => self.start(from),
            ClientMessage::DoSubaction { subaction } => self.subaction(from, subaction),
            ClientMessage::EndTurn => self.end_turn(from),
            ClientMessage::EndBump => self.end_bump(from),
            ClientMessage::RequestSignup { .. }
            | ClientMessage::RequestSignin { .. }
            | ClientMessage::UpdatePassword { .. }
            | ClientMessage::CreateGame => {
                self.send_to(
                    from,
                    &ServerMessage::client_error("Game Error", "That request goes to the lobby"),
                );
            }
        }
    }

    fn start(&mut self, from: &Identity) {
        if let Err(e) = self.game.start(from, &mut self.rng, Utc::now()) {
            self.reject(from, e, false);
            return;
        }
        self.broadcast(&ServerMessage::NotifyStartGame {
            table: self.game.table.clone(),
        });
        self.broadcast(&ServerMessage::NotifyNextTurn {
            turn_state: self.game.turn_state.clone(),
        });

        // Observers already sitting are their seat's client; bots are created
        // now and every other seat waits, disconnected, for its player.
        let seated: Vec<Identity> = self.game.seated().map(|(_, i)| i.clone()).collect();
        for identity in seated {
            if self.members.contains_key(&identity.id) {
                continue;
            }
            if identity.is_bot() {
                let mut conn = self.bots.new_bot(identity.clone(), self.game.id);
                conn.send(&self.full_game());
                self.attach(identity, conn);
            } else {
                let client = MultiClient::new(identity.clone(), self.config.client_channel_capacity);
                self.members.insert(
                    identity.id.clone(),
                    Member {
                        client,
                        generation: 0,
                        connected: false,
                    },
                );
            }
        }
    }

    fn subaction(&mut self, from: &Identity, subaction: Subaction) {
        let Some(seat) = self.game.seat_of(from) else {
            self.send_to(
                from,
                &ServerMessage::NotifySubactionError {
                    header: "Subaction Error".to_string(),
                    content: "You are not sitting at this game".to_string(),
                },
            );
            return;
        };
        match self.game.do_subaction(seat, subaction, Utc::now()) {
            Ok(score_deltas) => {
                self.broadcast(&ServerMessage::NotifySubaction {
                    player: seat,
                    subaction,
                    score_deltas,
                    turn_state: self.game.turn_state.clone(),
                    game_end: self.game.game_end,
                });
            }
            Err(e) => self.reject(from, e, true),
        }
    }

    fn end_turn(&mut self, from: &Identity) {
        let Some(seat) = self.game.seat_of(from) else {
            return;
        };
        match self.game.end_turn(seat, Utc::now()) {
            Ok(TurnOutcome::NextTurn) => self.broadcast(&ServerMessage::NotifyNextTurn {
                turn_state: self.game.turn_state.clone(),
            }),
            Ok(TurnOutcome::Scoring) => self.begin_scoring(),
            Err(e) => self.reject(from, e, true),
        }
    }

    fn end_bump(&mut self, from: &Identity) {
        let Some(seat) = self.game.seat_of(from) else {
            return;
        };
        match self.game.end_bump(seat, Utc::now()) {
            Ok(()) => self.broadcast(&ServerMessage::NotifyEndBump {
                turn_state: self.game.turn_state.clone(),
            }),
            Err(e) => self.reject(from, e, true),
        }
    }

    /// Queue the paced reveal of every endgame category.
    fn begin_scoring(&mut self) {
        self.broadcast(&ServerMessage::NotifyScoringBegin);
        let categories = endgame_scores(&self.game.table);
        let tx = self.scoring_tx.clone();
        let config = self.config.clone();
        let game_id = self.game.id;
        tokio::spawn(async move {
            let start = Instant::now();
            let count = categories.len();
            for (i, (kind, scores)) in categories.into_iter().enumerate() {
                sleep_until(start + config.scoring_delay(i)).await;
                if tx.send(ScoringEvent::Category(kind, scores)).await.is_err() {
                    return;
                }
            }
            sleep_until(start + config.scoring_delay(count)).await;
            if tx.send(ScoringEvent::Complete).await.is_err() {
                debug!(game = game_id, "game gone before scoring completed");
            }
        });
    }

    fn scoring(&mut self, event: ScoringEvent) {
        match event {
            ScoringEvent::Category(score_type, scores) => {
                self.game.record_endgame_score(score_type, &scores);
                self.broadcast(&ServerMessage::NotifyEndgameScoring { score_type, scores });
            }
            ScoringEvent::Complete => {
                self.game.complete();
                self.broadcast(&ServerMessage::NotifyComplete {
                    scores: self.game.table.scores.clone(),
                });
            }
        }
    }

    /// Tell the sender why; abandon the game on a broken invariant.
    fn reject(&mut self, from: &Identity, error: GameError, subaction: bool) {
        match error {
            GameError::Rule { header, content } => {
                warn!(game = self.game.id, identity = %from.id, %header, %content, "rejected");
                let msg = if subaction {
                    ServerMessage::NotifySubactionError { header, content }
                } else {
                    ServerMessage::ClientError { header, content }
                };
                self.send_to(from, &msg);
            }
            GameError::Invariant(violation) => self.fail(violation),
        }
    }

    fn fail(&mut self, violation: InvariantViolation) {
        error!(game = self.game.id, %violation, "invariant violated, abandoning game");
        self.game.abandon();
        self.broadcast(&ServerMessage::notification(
            NotificationType::InternalError,
            "Internal Error",
            "The game hit an internal error and was abandoned",
        ));
    }

    fn send_to(&mut self, identity: &Identity, msg: &ServerMessage) {
        if let Some(member) = self.members.get_mut(&identity.id) {
            member.client.send(msg);
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        for member in self.members.values_mut() {
            member.client.send(msg);
        }
    }
}
