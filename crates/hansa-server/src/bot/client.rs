use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use hansa_core::{Command, InvariantViolation, Planner, Table, WeightSet};
use hansa_protocol::{GameStatus, Identity, NotificationType, TurnState, TurnStateType};

use crate::client::Remote;
use crate::protocol::{ClientMessage, ServerMessage};

/// Errors in a row after which the bot stops answering until the turn
/// moves on.
const MAX_ERRORS: u32 = 3;

/// What to do after observing a server message.
#[derive(Debug, PartialEq)]
enum Reaction {
    Idle,
    /// Replace the queue with these commands, after the response delay
    Respond(Vec<ClientMessage>),
    /// Our last command was accepted; send the next queued one
    Continue,
    Leave,
}

impl From<Command> for ClientMessage {
    fn from(command: Command) -> Self {
        match command {
            Command::Subaction(subaction) => ClientMessage::DoSubaction { subaction },
            Command::EndBump => ClientMessage::EndBump,
            Command::EndTurn => ClientMessage::EndTurn,
        }
    }
}

/// Plays one seat. Keeps a mirror of the table, updated from every
/// `NotifySubaction`, and answers through the same messages a human sends.
/// Commands go out one at a time; each waits for the server to accept the
/// previous one.
pub struct BotClient {
    remote: Remote,
    game_id: u64,
    weights: WeightSet,
    delay: Duration,
    table: Option<Table>,
    planner: Option<Planner>,
    turn_state: TurnState,
    running: bool,
    queue: VecDeque<ClientMessage>,
    /// Already answering the current bump
    answering_bump: bool,
    errors: u32,
}

impl BotClient {
    pub fn new(remote: Remote, game_id: u64, weights: WeightSet, delay: Duration) -> Self {
        Self {
            remote,
            game_id,
            weights,
            delay,
            table: None,
            planner: None,
            turn_state: TurnState::default(),
            running: false,
            queue: VecDeque::new(),
            answering_bump: false,
            errors: 0,
        }
    }

    fn identity(&self) -> &Identity {
        &self.remote.identity
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.remote.recv().await {
            let reaction = match self.observe(msg) {
                Ok(reaction) => reaction,
                Err(violation) => {
                    error!(bot = %self.identity().id, game = self.game_id, %violation, "bot lost track of the table");
                    break;
                }
            };
            match reaction {
                Reaction::Idle => {}
                Reaction::Respond(commands) => {
                    self.queue = commands.into();
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    if !self.send_next().await {
                        break;
                    }
                }
                Reaction::Continue => {
                    if !self.send_next().await {
                        break;
                    }
                }
                Reaction::Leave => break,
            }
        }
        info!(bot = %self.identity().id, game = self.game_id, "bot left");
    }

    async fn send_next(&mut self) -> bool {
        match self.queue.pop_front() {
            Some(command) => self.remote.send(command).await,
            None => true,
        }
    }

    fn seat(&self) -> Option<usize> {
        self.planner.as_ref().map(|p| p.seat)
    }

    fn mirror(&mut self, table: Table) {
        let me = self.identity().clone();
        self.planner = table
            .player_boards
            .iter()
            .position(|b| b.identity == me)
            .map(|seat| Planner::new(seat, self.weights.clone()));
        self.table = Some(table);
    }

    fn observe(&mut self, msg: ServerMessage) -> Result<Reaction, InvariantViolation> {
        match msg {
            ServerMessage::NotifyFullGame {
                status,
                table,
                turn_state,
                ..
            } => {
                self.mirror(table);
                self.turn_state = turn_state;
                self.running = status == GameStatus::Running;
                self.queue.clear();
                self.react()
            }
            ServerMessage::NotifyStartGame { table } => {
                self.mirror(table);
                self.running = true;
                Ok(Reaction::Idle)
            }
            ServerMessage::NotifySubaction {
                player,
                subaction,
                score_deltas,
                turn_state,
                ..
            } => {
                if let Some(table) = self.table.as_mut() {
                    table.apply_subaction(&subaction)?;
                    for (score, delta) in table.scores.iter_mut().zip(&score_deltas) {
                        *score += delta;
                    }
                }
                self.turn_state = turn_state;
                let me = self.seat();
                if me == Some(player) && !self.queue.is_empty() {
                    self.errors = 0;
                    return Ok(Reaction::Continue);
                }
                let ts = &self.turn_state;
                if ts.kind == TurnStateType::Bumping
                    && Some(ts.bumping_player) == me
                    && !self.answering_bump
                {
                    return self.react();
                }
                Ok(Reaction::Idle)
            }
            ServerMessage::NotifyNextTurn { turn_state } | ServerMessage::NotifyEndBump { turn_state } => {
                self.turn_state = turn_state;
                self.answering_bump = false;
                self.errors = 0;
                self.queue.clear();
                self.react()
            }
            ServerMessage::NotifySubactionError { header, content } => {
                self.errors += 1;
                warn!(bot = %self.identity().id, game = self.game_id, %header, %content, errors = self.errors, "bot command rejected");
                self.queue.clear();
                self.answering_bump = false;
                match self.errors {
                    1 => self.react(),
                    n if n < MAX_ERRORS => Ok(self.give_up()),
                    _ => Ok(Reaction::Idle),
                }
            }
            ServerMessage::NotifyComplete { .. } => Ok(Reaction::Leave),
            ServerMessage::NotifyNotification {
                kind: NotificationType::InternalError,
                ..
            } => Ok(Reaction::Leave),
            ServerMessage::NotifyScoringBegin => {
                self.running = false;
                Ok(Reaction::Idle)
            }
            _ => Ok(Reaction::Idle),
        }
    }

    /// Plan whatever the current turn state asks of this seat.
    fn react(&mut self) -> Result<Reaction, InvariantViolation> {
        let (Some(planner), Some(table)) = (self.planner.as_ref(), self.table.as_mut()) else {
            return Ok(Reaction::Idle);
        };
        if !self.running {
            return Ok(Reaction::Idle);
        }
        let ts = &self.turn_state;
        let commands = if ts.kind == TurnStateType::Bumping {
            if ts.bumping_player != planner.seat {
                return Ok(Reaction::Idle);
            }
            self.answering_bump = true;
            planner.respond_to_bump(table, ts)?
        } else if ts.player == planner.seat {
            let scores = table.scores.clone();
            planner.choose_turn(table, &scores, ts.actions_left)?
        } else {
            return Ok(Reaction::Idle);
        };
        debug!(bot = %self.remote.identity.id, game = self.game_id, commands = commands.len(), "bot responding");
        Ok(Reaction::Respond(
            commands.into_iter().map(ClientMessage::from).collect(),
        ))
    }

    /// Close out whatever is stuck.
    fn give_up(&self) -> Reaction {
        match self.seat() {
            Some(seat) if self.turn_state.kind == TurnStateType::Bumping => {
                if self.turn_state.bumping_player == seat {
                    Reaction::Respond(vec![ClientMessage::EndBump])
                } else {
                    Reaction::Idle
                }
            }
            Some(seat) if self.turn_state.player == seat => {
                Reaction::Respond(vec![ClientMessage::EndTurn])
            }
            _ => Reaction::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::client::{connection, Client};
    use hansa_core::{base45, Game};
    use hansa_protocol::{Identity, Location, Piece, PlayerSection, Shape, Subaction};

    fn started() -> Game {
        let creator = Identity::new("P1", "Ada");
        let mut game = Game::new(3, creator.clone(), base45().unwrap());
        for (i, (id, name)) in crate::bot::BOTS.iter().take(4).enumerate() {
            game.sitdown_bot(&creator, &Identity::bot(*id, *name), i as i32, true)
                .unwrap();
        }
        let mut rng = StdRng::seed_from_u64(5);
        game.start(&creator, &mut rng, chrono::Utc::now()).unwrap();
        game
    }

    fn bot_for(game: &Game, seat: usize) -> BotClient {
        let identity = game.identity_at(seat).unwrap().clone();
        let (_conn, remote) = connection(identity, 4);
        BotClient::new(remote, game.id, WeightSet::default(), Duration::ZERO)
    }

    fn full_game(game: &Game) -> ServerMessage {
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

    #[test]
    fn plans_its_own_turn_only() {
        let game = started();
        let mut first = bot_for(&game, 0);
        let Reaction::Respond(commands) = first.observe(full_game(&game)).unwrap() else {
            panic!("seat 0 should move");
        };
        assert!(matches!(commands.first(), Some(ClientMessage::DoSubaction { .. })));
        assert_eq!(commands.last(), Some(&ClientMessage::EndTurn));
        assert_eq!(first.table.as_ref(), Some(&game.table), "planning leaves the mirror alone");

        let mut second = bot_for(&game, 1);
        assert_eq!(second.observe(full_game(&game)).unwrap(), Reaction::Idle);
    }

    #[test]
    fn accepted_commands_advance_the_queue() {
        let mut game = started();
        let mut bot = bot_for(&game, 0);
        let Reaction::Respond(commands) = bot.observe(full_game(&game)).unwrap() else {
            panic!("seat 0 should move");
        };
        bot.queue = commands.into();
        let Some(ClientMessage::DoSubaction { subaction }) = bot.queue.pop_front() else {
            panic!("expected a subaction first");
        };
        let deltas = game.do_subaction(0, subaction, chrono::Utc::now()).unwrap();
        let reaction = bot
            .observe(ServerMessage::NotifySubaction {
                player: 0,
                subaction,
                score_deltas: deltas,
                turn_state: game.turn_state.clone(),
                game_end: false,
            })
            .unwrap();
        assert_eq!(reaction, Reaction::Continue);
        assert_eq!(bot.table.as_ref(), Some(&game.table));
    }

    #[test]
    fn repeated_errors_end_the_turn_then_go_quiet() {
        let game = started();
        let mut bot = bot_for(&game, 0);
        bot.observe(full_game(&game)).unwrap();
        let error = || ServerMessage::NotifySubactionError {
            header: "Subaction Error".into(),
            content: "nope".into(),
        };
        assert!(matches!(bot.observe(error()).unwrap(), Reaction::Respond(_)));
        assert_eq!(
            bot.observe(error()).unwrap(),
            Reaction::Respond(vec![ClientMessage::EndTurn])
        );
        assert_eq!(bot.observe(error()).unwrap(), Reaction::Idle);
    }

    #[tokio::test]
    async fn burst_of_events_keeps_the_mirror_in_step() {
        let mut game = started();
        let identity = game.identity_at(3).unwrap().clone();
        let (mut conn, remote) = connection(identity, 2);
        let mut bot = BotClient::new(remote, game.id, WeightSet::default(), Duration::ZERO);

        // Far more than the connection's capacity, queued before the bot reads.
        conn.send(&full_game(&game));
        let mut route = 0;
        for seat in 0..3 {
            for _ in 0..2 {
                let board = &game.table.player_boards[seat];
                let i = board.find(PlayerSection::Supply, Shape::Cube).unwrap();
                let subaction = Subaction::piece(
                    Location::supply(seat, i),
                    Location::spot(route, 0),
                    Piece::cube(board.color),
                );
                route += 1;
                let score_deltas = game.do_subaction(seat, subaction, chrono::Utc::now()).unwrap();
                conn.send(&ServerMessage::NotifySubaction {
                    player: seat,
                    subaction,
                    score_deltas,
                    turn_state: game.turn_state.clone(),
                    game_end: game.game_end,
                });
            }
            game.end_turn(seat, chrono::Utc::now()).unwrap();
            conn.send(&ServerMessage::NotifyNextTurn {
                turn_state: game.turn_state.clone(),
            });
        }

        let mut seen = 0;
        while let Some(msg) = bot.remote.try_recv() {
            bot.observe(msg).unwrap();
            seen += 1;
        }
        assert_eq!(seen, 10);
        assert_eq!(bot.table.as_ref(), Some(&game.table));
        assert_eq!(bot.turn_state.player, 3);
    }

    #[tokio::test]
    async fn leaves_when_the_game_completes() {
        let identity = Identity::bot("B1", "Derek (Bot)");
        let (mut conn, remote) = connection(identity, 4);
        let bot = BotClient::new(remote, 1, WeightSet::default(), Duration::ZERO);
        let task = tokio::spawn(bot.run());
        conn.send(&ServerMessage::NotifyComplete { scores: vec![1, 2, 3, 4] });
        task.await.unwrap();
        assert!(conn.read().unwrap().next().await.is_none());
    }
}
