//! Bomb party played over a live connection.

mod common;

use std::time::Duration;

use common::{CHANNEL, FakeServer, ServerConn, config, connected_bot_with, database};
use offlinechatbot::config::Config;

const WORDS: [&str; 4] = ["water", "winter", "later", "tree"];

/// Login, user id and display name of the two players.
const ALICE: (&str, i64, &str) = ("alice", 42, "Alice");
const BOB: (&str, i64, &str) = ("bob", 7, "Bob");

fn player(login: &str) -> (&'static str, i64, &'static str) {
    if login == ALICE.0 { ALICE } else { BOB }
}

fn game_config(server: &FakeServer, dir: &tempfile::TempDir) -> Config {
    let path = dir.path().join("words.json");
    std::fs::write(&path, serde_json::to_string(&WORDS).unwrap()).unwrap();
    let mut cfg = config(&server.address());
    cfg.rate_limit.default_delay_ms = 10;
    cfg.bomb_party.word_list = Some(path.to_string_lossy().into_owned());
    cfg
}

async fn say(conn: &mut ServerConn, who: (&str, i64, &str), text: &str) {
    conn.chat(who.1, who.0, who.2, text).await;
}

async fn next_chat(conn: &mut ServerConn) -> String {
    let line = conn.expect(&format!("PRIVMSG #{CHANNEL}")).await;
    line.split_once(" :/me ")
        .map(|(_, text)| text.to_owned())
        .unwrap_or(line)
}

/// Open a lobby as alice, seat bob and start; returns who holds the bomb
/// and their letters.
async fn start_game(conn: &mut ServerConn, settings: &[&str]) -> (String, String) {
    say(conn, ALICE, "!bombparty").await;
    assert!(next_chat(conn).await.starts_with("alice has started a Bomb Party game!"));

    say(conn, BOB, "!join").await;
    assert_eq!(next_chat(conn).await, "@Bob You have joined the game of bomb party!");
    say(conn, ALICE, "!join").await;
    assert_eq!(next_chat(conn).await, "@Alice You have already joined the game");

    for setting in settings {
        say(conn, ALICE, &format!("!settings {setting}")).await;
        assert!(next_chat(conn).await.contains("setting has been changed to"));
    }

    say(conn, ALICE, "!start").await;
    let first = next_chat(conn).await;
    let (holder, letters) = first
        .strip_prefix('@')
        .and_then(|rest| rest.split_once(" You're up first! Your string of letters is "))
        .unwrap();
    (holder.to_owned(), letters.to_owned())
}

#[tokio::test]
async fn test_answer_passes_bomb_and_forfeit_pays_winner() {
    let server = FakeServer::bind().await;
    let dir = tempfile::tempdir().unwrap();
    let db = database().await;
    let (bot, mut conn) = connected_bot_with(&server, db.clone(), game_config(&server, &dir)).await;

    let (holder, letters) = start_game(&mut conn, &[]).await;
    let other = if holder == ALICE.0 { BOB } else { ALICE };

    say(&mut conn, BOB, "!players").await;
    let players = next_chat(&mut conn).await;
    assert!(players.starts_with("@Bob Current players playing bomb party: "), "{players}");
    assert!(players.contains("alice (♥♥♥)") && players.contains("bob (♥♥♥)"));

    // words outside the dictionary are ignored
    say(&mut conn, player(&holder), "xyzzy").await;
    let answer = WORDS
        .iter()
        .find(|w| w.contains(letters.as_str()) && **w != letters)
        .unwrap();
    say(&mut conn, player(&holder), answer).await;
    let passed = next_chat(&mut conn).await;
    assert!(
        passed.starts_with(&format!("@{} Your string of letters is ", other.0)),
        "{passed}"
    );
    assert!(passed.ends_with(" - You have 35 seconds."), "{passed}");

    say(&mut conn, other, answer).await;
    assert_eq!(
        next_chat(&mut conn).await,
        format!("@{} That word has already been used.", other.0)
    );

    say(&mut conn, other, "!leave").await;
    assert_eq!(
        next_chat(&mut conn).await,
        format!("@{} You have left the game of bomb party.", other.2)
    );
    assert_eq!(
        next_chat(&mut conn).await,
        format!("@{holder} Congratulations on winning the bomb party game! You've won 100 Becky Bucks!")
    );
    let winner = db.users().get(player(&holder).1).await.unwrap().unwrap();
    assert_eq!(winner.money, 100);

    bot.stop().await;
}

#[tokio::test]
async fn test_fuse_explodes_last_life() {
    let server = FakeServer::bind().await;
    let dir = tempfile::tempdir().unwrap();
    let (bot, mut conn) =
        connected_bot_with(&server, database().await, game_config(&server, &dir)).await;

    let (holder, _) = start_game(&mut conn, &["timer 5", "minimum_time 0", "lives 1"]).await;
    let other = if holder == ALICE.0 { BOB.0 } else { ALICE.0 };

    // the fuse is five seconds, one line timeout
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(
        next_chat(&mut conn).await,
        format!("@{holder} You ran out of time and lost all your lives! YouDied")
    );
    assert_eq!(
        next_chat(&mut conn).await,
        format!("@{other} Congratulations on winning the bomb party game! You've won 100 Becky Bucks!")
    );

    bot.stop().await;
}

#[tokio::test]
async fn test_lonely_lobby_closes() {
    let server = FakeServer::bind().await;
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = game_config(&server, &dir);
    cfg.bomb_party.lobby_timeout_secs = 1;
    let (bot, mut conn) = connected_bot_with(&server, database().await, cfg).await;

    say(&mut conn, ALICE, "!bombparty").await;
    assert!(next_chat(&mut conn).await.ends_with("after 1 seconds."));
    say(&mut conn, ALICE, "!start").await;
    assert_eq!(
        next_chat(&mut conn).await,
        "@Alice You need at least 2 players to start the bomb party game."
    );
    assert_eq!(
        next_chat(&mut conn).await,
        "The bomb party game has closed since there is only one player in the party."
    );

    // a closed lobby takes no players
    say(&mut conn, BOB, "!join").await;
    assert!(
        tokio::time::timeout(Duration::from_millis(500), conn.next_line())
            .await
            .is_err()
    );

    bot.stop().await;
}
