//! Integration test common infrastructure.
//!
//! Provides a scripted fake chat server and helpers for launching a fully
//! resolved bot against it with an in-memory database.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use offlinechatbot::bots::{self, Core};
use offlinechatbot::config::Config;
use offlinechatbot::db::Database;
use offlinechatbot::runtime::{Bot, BotBuilder};
use tmi_proto::LineCodec;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

pub const BOT: &str = "testbot";
pub const CHANNEL: &str = "sheppsu";
pub const ROOM_ID: i64 = 156_710_598;

/// How long a test waits for any single line.
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Config pointing at `address`, control listener off.
pub fn config(address: &str) -> Config {
    let raw = format!(
        r#"
        [identity]
        username = "{BOT}"
        oauth = "oauth:secret"

        [connection]
        address = "{address}"
        tick_interval_ms = 3600000
        backoff_base_secs = 0
        backoff_max_secs = 1

        [control]
        enabled = false
        "#
    );
    let config: Config = toml::from_str(&raw).expect("test config parses");
    config.validate().expect("test config valid");
    config
}

/// Fresh in-memory database with the test channel registered.
pub async fn database() -> Database {
    let db = Database::new(":memory:").await.expect("in-memory database");
    db.channels()
        .add(ROOM_ID, CHANNEL, false)
        .await
        .expect("channel added");
    db
}

/// Every shipped component, resolved around `config` and `db`.
pub fn resolve(config: Config, db: Database) -> Bot {
    bots::register_all(BotBuilder::new(Core::new(config, db)))
        .resolve()
        .expect("components resolve")
}

/// A chat server that accepts the bot and plays a script.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").await.expect("bind"),
        }
    }

    pub fn address(&self) -> String {
        self.listener.local_addr().expect("local addr").to_string()
    }

    pub async fn accept(&self) -> ServerConn {
        let (stream, _) = tokio::time::timeout(LINE_TIMEOUT, self.listener.accept())
            .await
            .expect("bot connected in time")
            .expect("accept");
        ServerConn {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }
}

/// Server side of one bot connection.
pub struct ServerConn {
    framed: Framed<TcpStream, LineCodec>,
}

impl ServerConn {
    pub async fn send(&mut self, line: &str) {
        self.framed.send(line.to_owned()).await.expect("server write");
    }

    /// Next line from the bot, `None` on EOF.
    pub async fn next_line(&mut self) -> Option<String> {
        match tokio::time::timeout(LINE_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(line))) => Some(line.trim_end().to_owned()),
            Ok(Some(Err(e))) => panic!("bad line from bot: {e}"),
            Ok(None) => None,
            Err(_) => panic!("bot sent nothing within {LINE_TIMEOUT:?}"),
        }
    }

    /// Skip lines until one starts with `prefix`.
    pub async fn expect(&mut self, prefix: &str) -> String {
        loop {
            match self.next_line().await {
                Some(line) if line.starts_with(prefix) => return line,
                Some(_) => continue,
                None => panic!("connection closed while waiting for {prefix:?}"),
            }
        }
    }

    /// Wait for the bot to hang up.
    pub async fn expect_closed(&mut self) {
        while self.next_line().await.is_some() {}
    }

    /// Run the login script up to the channel join.
    pub async fn login(&mut self) {
        assert_eq!(self.next_line().await.as_deref(), Some("PASS oauth:secret"));
        assert_eq!(
            self.next_line().await.as_deref(),
            Some(format!("NICK {BOT}").as_str())
        );
        self.send(&format!(":tmi.twitch.tv 376 {BOT} :>")).await;
        self.expect("CAP REQ").await;
        self.expect(&format!("JOIN #{CHANNEL}")).await;
        self.send(&format!(
            ":{BOT}!{BOT}@{BOT}.tmi.twitch.tv JOIN #{CHANNEL}"
        ))
        .await;
    }

    /// A chat message from `login` in the test channel.
    pub async fn chat(&mut self, user_id: i64, login: &str, display: &str, text: &str) {
        self.send(&format!(
            "@badges=;color=;display-name={display};id=m{user_id};mod=0;room-id={ROOM_ID};\
             user-id={user_id} :{login}!{login}@{login}.tmi.twitch.tv PRIVMSG #{CHANNEL} :{text}"
        ))
        .await;
    }
}

/// A bot running in the background.
pub struct RunningBot {
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningBot {
    pub fn spawn(bot: Bot) -> Self {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(bot.run(shutdown.clone()));
        Self { shutdown, handle }
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(LINE_TIMEOUT, self.handle)
            .await
            .expect("bot stopped in time")
            .expect("bot task")
            .expect("bot run");
    }
}

/// Launch the full bot against `server` and complete the login script.
pub async fn connected_bot(server: &FakeServer, db: Database) -> (RunningBot, ServerConn) {
    connected_bot_with(server, db, config(&server.address())).await
}

/// [`connected_bot`] with a config the test has adjusted.
pub async fn connected_bot_with(
    server: &FakeServer,
    db: Database,
    config: Config,
) -> (RunningBot, ServerConn) {
    let bot = RunningBot::spawn(resolve(config, db));
    let mut conn = server.accept().await;
    conn.login().await;
    // give the JOIN a moment to open the send lane
    tokio::time::sleep(Duration::from_millis(100)).await;
    (bot, conn)
}
