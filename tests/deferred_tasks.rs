//! Work that happens later: reminder delivery, round timeouts and AFK
//! bookkeeping.
//!
//! These run on the real clock with short configured delays. The in-memory
//! store works on its own thread, so a paused clock would auto-advance past
//! the pool's acquire timeout while a query is in flight.

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{
    BOT, CHANNEL, FakeServer, LINE_TIMEOUT, ROOM_ID, config, connected_bot, connected_bot_with,
    database, resolve,
};
use offlinechatbot::db::Database;
use offlinechatbot::runtime::Bot;
use tmi_proto::{Context, parse_line};
use tokio::sync::mpsc;

async fn membership(bot: &Bot, login: &str) {
    let raw = format!(":{login}!{login}@{login}.tmi.twitch.tv JOIN #{CHANNEL}");
    let Some(ctx @ Context::Join(_)) = parse_line(&raw) else {
        panic!("expected a join");
    };
    for task in bot.dispatch_table().dispatch(ctx) {
        task.await.unwrap();
    }
}

/// Poll until `db` holds no reminders.
async fn reminders_drained(db: &Database) {
    let deadline = tokio::time::Instant::now() + LINE_TIMEOUT;
    while !db.reminders().list().await.unwrap().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "reminder never finished");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_stored_reminder_waits_for_own_join() {
    let db = database().await;
    db.reminders()
        .create(42, "alice", ROOM_ID, Utc::now().timestamp() - 5, "buy milk")
        .await
        .unwrap();

    let mut cfg = config("127.0.0.1:1");
    cfg.rate_limit.default_delay_ms = 10;
    let bot = resolve(cfg, db.clone());
    let (tx, mut rx) = mpsc::channel(16);
    bot.core().outbound().attach(tx);
    bot.dispatch_table().run_setup().await;

    // a viewer joining is not the bot arriving
    membership(&bot, "viewer").await;
    assert!(
        tokio::time::timeout(Duration::from_millis(300), rx.recv())
            .await
            .is_err()
    );
    assert_eq!(db.reminders().list().await.unwrap().len(), 1);

    membership(&bot, BOT).await;
    let line = tokio::time::timeout(LINE_TIMEOUT, rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        line,
        format!("PRIVMSG #{CHANNEL} :/me @alice DinkDonk Reminder! buy milk")
    );
    reminders_drained(&db).await;
}

#[tokio::test]
async fn test_pending_reminder_fires_after_login() {
    let server = FakeServer::bind().await;
    let db = database().await;
    db.reminders()
        .create(7, "bob", ROOM_ID, Utc::now().timestamp() + 1, "stretch")
        .await
        .unwrap();
    let mut cfg = config(&server.address());
    cfg.rate_limit.default_delay_ms = 10;
    let (bot, mut conn) = connected_bot_with(&server, db.clone(), cfg).await;

    let line = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    assert_eq!(
        line,
        format!("PRIVMSG #{CHANNEL} :/me @bob DinkDonk Reminder! stretch")
    );
    reminders_drained(&db).await;

    bot.stop().await;
}

#[tokio::test]
async fn test_scramble_round_times_out() {
    let server = FakeServer::bind().await;
    let mut cfg = config(&server.address());
    cfg.scramble.round_timeout_secs = 1;
    cfg.rate_limit.default_delay_ms = 10;
    let (bot, mut conn) = connected_bot_with(&server, database().await, cfg).await;

    conn.chat(42, "alice", "Alice", "!scramble").await;
    let start = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    let scrambled = start
        .rsplit_once("Unscramble this word: ")
        .map(|(_, word)| word.to_owned())
        .unwrap();

    let timeout = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    let answer = timeout
        .rsplit_once("Time is up! The word was ")
        .map(|(_, word)| word.to_lowercase())
        .unwrap();
    let mut expected: Vec<char> = answer.chars().collect();
    let mut actual: Vec<char> = scrambled.chars().collect();
    expected.sort_unstable();
    actual.sort_unstable();
    assert_eq!(actual, expected);

    // the round is over, so the answer no longer pays
    conn.chat(42, "alice", "Alice", &answer).await;
    conn.chat(42, "alice", "Alice", "!hint").await;
    assert!(
        tokio::time::timeout(Duration::from_millis(500), conn.next_line())
            .await
            .is_err()
    );

    bot.stop().await;
}

#[tokio::test]
async fn test_afk_mention_and_auto_remove() {
    let server = FakeServer::bind().await;
    let db = database().await;
    db.afk()
        .set(42, "alice", "lunch", Utc::now().timestamp() - 120)
        .await
        .unwrap();
    let mut cfg = config(&server.address());
    cfg.rate_limit.default_delay_ms = 10;
    let (bot, mut conn) = connected_bot_with(&server, db.clone(), cfg).await;

    conn.chat(7, "bob", "Bob", "anyone seen @Alice, today?").await;
    let notice = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    assert!(
        notice.starts_with(&format!("PRIVMSG #{CHANNEL} :/me @Bob alice is afk (2 minutes")),
        "{notice}"
    );
    assert!(notice.ends_with("ago): lunch"), "{notice}");

    conn.chat(42, "alice", "Alice", "back").await;
    let removed = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    assert!(
        removed.contains("@Alice Your afk has been removed. (Afk for 2 minutes"),
        "{removed}"
    );
    assert!(db.afk().list().await.unwrap().is_empty());

    bot.stop().await;
}

#[tokio::test]
async fn test_fresh_afk_survives_own_message() {
    let server = FakeServer::bind().await;
    let db = database().await;
    db.afk()
        .set(42, "alice", "brb", Utc::now().timestamp())
        .await
        .unwrap();
    let (bot, mut conn) = connected_bot(&server, db.clone()).await;

    conn.chat(42, "alice", "Alice", "one more thing").await;
    assert!(
        tokio::time::timeout(Duration::from_millis(500), conn.next_line())
            .await
            .is_err()
    );
    assert_eq!(db.afk().list().await.unwrap().len(), 1);

    bot.stop().await;
}
