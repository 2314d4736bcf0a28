//! offlinechatbot - Twitch chat bot.

use offlinechatbot::bots::{self, Core};
use offlinechatbot::config::Config;
use offlinechatbot::db::Database;
use offlinechatbot::runtime::BotBuilder;
use offlinechatbot::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    telemetry::init(config.logging.format);
    info!(
        path = %config_path,
        username = %config.identity.username,
        server = %config.connection.address,
        "Starting offlinechatbot"
    );

    // Initialize database
    let db = Database::new(&config.database.path).await.map_err(|e| {
        error!(path = %config.database.path, error = %e, "Failed to open database");
        e
    })?;

    let bot = bots::register_all(BotBuilder::new(Core::new(config, db))).resolve()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, shutting down");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for ctrl-c"),
        }
    });

    bot.run(shutdown).await
}
