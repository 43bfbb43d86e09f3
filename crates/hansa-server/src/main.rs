//! Hansa Teutonica server binary.
//!
//! Runs a self-play game: an observer creates the game, seats bots, starts
//! it and logs every notification until scoring completes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hansa_protocol::{Identity, NotificationType};
use hansa_server::{
    connection, BotManager, ClientMessage, Lobby, MemoryDatabase, ServerConfig, ServerMessage,
};

/// Run a bot self-play game
#[derive(Parser, Debug)]
#[command(name = "hansa-server")]
#[command(about = "Hansa Teutonica game server (self-play)", long_about = None)]
struct Args {
    /// YAML server configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bots to seat (4 or 5)
    #[arg(long, default_value_t = 5)]
    bots: usize,

    /// Override the bot response delay
    #[arg(long)]
    bot_delay_ms: Option<u64>,

    /// Override the spacing between scoring reveals
    #[arg(long)]
    scoring_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(delay) = args.bot_delay_ms {
        config.bot_response_delay_ms = delay;
    }
    if let Some(delay) = args.scoring_delay_ms {
        config.scoring_delay_ms = delay;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !(4..=5).contains(&args.bots) {
        bail!("self-play needs 4 or 5 bots, not {}", args.bots);
    }

    info!("Hansa server v{}", env!("CARGO_PKG_VERSION"));
    let capacity = config.client_channel_capacity;
    let lobby = Lobby::spawn(Arc::new(MemoryDatabase::new()), config);

    let host = Identity::guest("G1");
    let game_id = lobby.create_game(host.clone()).await?;
    let (conn, mut remote) = connection(host, capacity);
    lobby.join(game_id, conn).await?;

    for (index, bot) in BotManager::identities().into_iter().take(args.bots).enumerate() {
        remote
            .send(ClientMessage::RequestSitdownBot {
                bot_id: bot.id,
                index: index as i32,
                sitdown: true,
            })
            .await;
    }
    remote.send(ClientMessage::StartGame).await;

    let mut names = Vec::new();
    while let Some(msg) = remote.recv().await {
        match msg {
            ServerMessage::NotifyStartGame { ref table } => {
                names = table
                    .player_boards
                    .iter()
                    .map(|b| format!("{} ({})", b.identity.name, b.color.name()))
                    .collect();
                info!(game = game_id, players = ?names, "started");
            }
            ServerMessage::NotifySubaction {
                player,
                subaction,
                ref score_deltas,
                ..
            } => {
                info!(game = game_id, player, ?subaction, ?score_deltas, "subaction");
            }
            ServerMessage::NotifyEndgameScoring { score_type, ref scores } => {
                info!(game = game_id, ?score_type, ?scores, "endgame scoring");
            }
            ServerMessage::NotifyComplete { scores } => {
                for (name, score) in names.iter().zip(&scores) {
                    info!(game = game_id, player = %name, score, "final");
                }
                return Ok(());
            }
            ServerMessage::NotifyNotification {
                kind: NotificationType::InternalError,
                content,
                ..
            } => bail!("game {game_id} failed: {content}"),
            ServerMessage::ClientError { header, content }
            | ServerMessage::NotifySubactionError { header, content } => {
                warn!(game = game_id, %header, %content, "rejected");
            }
            other => info!(game = game_id, message = other.name(), "notification"),
        }
    }
    bail!("game {game_id} closed before completing")
}
