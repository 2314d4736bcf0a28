//! Bomb party, one game per channel.
//!
//! Players take turns naming a dictionary word that contains the letters
//! they were handed. The fuse shrinks with every answer and resets when it
//! goes off; whoever still has lives at the end wins the pot.
//!
//! The lobby timer and every fuse carry the generation they were armed
//! with. Any transition that re-arms advances the generation, so a timer that
//! lost the race to an answer or a leave finds itself stale and does nothing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand::seq::SliceRandom;
use tmi_proto::{ContextType, MessageContext};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::core::Core;
use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies, Generation, TaskHandle};
use crate::util::format_time_length;

const PRIZE_PER_OPPONENT: i64 = 100;

const BUILTIN_WORDS: &[&str] = &[
    "apple", "banana", "orange", "grape", "lemon", "melon", "cherry", "peach", "pear", "plum",
    "table", "chair", "window", "door", "house", "garden", "kitchen", "bedroom", "bottle",
    "paper", "pencil", "marker", "letter", "number", "answer", "question", "station", "nation",
    "motion", "action", "fraction", "mention", "planet", "rocket", "pocket", "socket", "ticket",
    "jacket", "basket", "market", "master", "monster", "sister", "winter", "summer", "water",
    "butter", "better", "bitter", "litter", "river", "silver", "mirror", "terror", "error",
    "player", "layer", "prayer", "stream", "dream", "cream", "scream", "green", "queen",
    "screen", "between", "thirteen", "listen", "kitten", "mitten", "written", "rotten",
    "button", "cotton", "bottom", "random", "freedom", "kingdom", "seldom", "wisdom", "reason",
    "season", "lesson", "person", "prison", "poison", "chicken", "thicken", "quicken",
    "strong", "string", "spring", "bring", "thing", "nothing", "something", "morning",
    "evening", "keyboard", "monitor", "rhythm", "circle", "slider", "spinner", "bucket",
    "channel", "message", "reminder", "timezone", "scramble", "balance", "pineapple",
    "umbrella", "volcano", "penguin", "galaxy", "lantern", "whisper", "trumpet", "blanket",
    "compass", "meadow", "harvest", "another", "brother", "mother", "father", "weather",
    "feather", "leather", "together", "whether", "gather", "rather", "other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Nightmare,
    Impossible,
}

impl Difficulty {
    const ALL: [Difficulty; 5] = [
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Nightmare,
        Self::Impossible,
    ];

    fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(value))
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Nightmare => "nightmare",
            Self::Impossible => "impossible",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Why a `!settings` change was refused. Displayed verbatim in chat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingError {
    #[error("That's not a valid setting. Valid settings: {}", Settings::NAMES.join(", "))]
    UnknownSetting,
    #[error("That's not a valid value for this setting.")]
    OutOfRange,
    #[error("There was a problem processing the value you gave for the specific setting.")]
    Unparsable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Starting fuse in seconds, before the grace period.
    pub timer: u64,
    /// Grace seconds per turn that do not burn the fuse.
    pub minimum_time: u64,
    pub lives: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            timer: 30,
            minimum_time: 5,
            lives: 3,
        }
    }
}

impl Settings {
    const NAMES: [&'static str; 4] = ["difficulty", "timer", "minimum_time", "lives"];

    /// Apply one setting; returns the canonical form of the new value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<String, SettingError> {
        fn ranged<T: std::str::FromStr + PartialOrd>(
            value: &str,
            range: std::ops::RangeInclusive<T>,
        ) -> Result<T, SettingError> {
            let parsed: T = value.parse().map_err(|_| SettingError::Unparsable)?;
            if range.contains(&parsed) {
                Ok(parsed)
            } else {
                Err(SettingError::OutOfRange)
            }
        }

        match name.to_ascii_lowercase().as_str() {
            "difficulty" => {
                self.difficulty = Difficulty::parse(value).ok_or(SettingError::OutOfRange)?;
                Ok(self.difficulty.as_str().to_owned())
            }
            "timer" => {
                self.timer = ranged(value, 5..=60)?;
                Ok(self.timer.to_string())
            }
            "minimum_time" => {
                self.minimum_time = ranged(value, 0..=10)?;
                Ok(self.minimum_time.to_string())
            }
            "lives" => {
                self.lives = ranged(value, 1..=5)?;
                Ok(self.lives.to_string())
            }
            _ => Err(SettingError::UnknownSetting),
        }
    }
}

/// Why an answer was turned down. Displayed verbatim in chat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordError {
    #[error("That word has already been used.")]
    Used,
    #[error("That word does not contain your string of letters: {0}")]
    Missing(String),
    #[error("You cannot answer with the string of letters itself.")]
    Itself,
}

/// Letter strings bucketed by how many words contain them.
#[derive(Debug, Default)]
pub struct Letters {
    buckets: Vec<Vec<String>>,
}

impl Letters {
    /// Count every two and three letter run across `words`, most common
    /// first, and cut the ranking into one bucket per difficulty.
    pub fn build<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in words {
            let chars: Vec<char> = word.chars().collect();
            let mut seen = HashSet::new();
            for len in [2, 3] {
                for window in chars.windows(len) {
                    if window.iter().all(|c| c.is_ascii_alphabetic()) {
                        seen.insert(window.iter().collect::<String>());
                    }
                }
            }
            for run in seen {
                *counts.entry(run).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let per_bucket = ranked.len().div_ceil(Difficulty::ALL.len()).max(1);
        let mut buckets: Vec<Vec<String>> = ranked
            .chunks(per_bucket)
            .map(|chunk| chunk.iter().map(|(run, _)| run.clone()).collect())
            .collect();
        buckets.resize(Difficulty::ALL.len(), Vec::new());
        Self { buckets }
    }

    /// A random string for `difficulty`, falling back to easier buckets
    /// when a small dictionary leaves the hard ones empty.
    pub fn pick<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> Option<String> {
        self.buckets
            .get(..=difficulty.index())?
            .iter()
            .rev()
            .find(|bucket| !bucket.is_empty())?
            .choose(rng)
            .cloned()
    }

    pub fn bucket(&self, difficulty: Difficulty) -> &[String] {
        self.buckets
            .get(difficulty.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Loaded words plus their letter buckets.
#[derive(Debug, Default)]
pub struct Dictionary {
    words: HashSet<String>,
    letters: Letters,
}

impl Dictionary {
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        let letters = Letters::build(words.iter().map(String::as_str));
        Self { words, letters }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Player {
    user_id: i64,
    username: String,
    lives: u8,
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, "♥".repeat(self.lives.into()))
    }
}

/// What the fuse did.
#[derive(Debug, PartialEq, Eq)]
pub struct Explosion {
    pub username: String,
    pub lives: u8,
}

impl Explosion {
    fn announcement(&self) -> String {
        if self.lives == 0 {
            format!(
                "@{} You ran out of time and lost all your lives! YouDied",
                self.username
            )
        } else {
            format!(
                "@{} You ran out of time and now have {} {} heart(s) left",
                self.username,
                self.lives,
                "♥".repeat(self.lives.into())
            )
        }
    }
}

/// One channel's game, from lobby to winner.
#[derive(Debug)]
pub struct Game {
    settings: Settings,
    /// Join order while in the lobby, turn order once started.
    players: Vec<Player>,
    started: bool,
    /// Party size at the start; the prize does not shrink when players leave.
    entrants: usize,
    turn: usize,
    letters: String,
    used: HashSet<String>,
    /// Remaining fuse in seconds, not counting the grace period.
    timer: f64,
    turn_started: Instant,
    handle: Option<TaskHandle>,
}

impl Game {
    pub fn open(host_id: i64, host: &str) -> Self {
        let settings = Settings::default();
        Self {
            players: vec![Player {
                user_id: host_id,
                username: host.to_owned(),
                lives: settings.lives,
            }],
            settings,
            started: false,
            entrants: 0,
            turn: 0,
            letters: String::new(),
            used: HashSet::new(),
            timer: settings.timer as f64,
            turn_started: Instant::now(),
            handle: None,
        }
    }

    /// The earliest remaining joiner.
    pub fn host(&self) -> Option<&str> {
        self.players.first().map(|p| p.username.as_str())
    }

    fn is_host(&self, username: &str) -> bool {
        !self.started && self.host().is_some_and(|h| h.eq_ignore_ascii_case(username))
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.username.eq_ignore_ascii_case(username))
    }

    /// `false` when already in the party.
    pub fn join(&mut self, user_id: i64, username: &str) -> bool {
        if self.position(username).is_some() {
            return false;
        }
        self.players.push(Player {
            user_id,
            username: username.to_owned(),
            lives: self.settings.lives,
        });
        true
    }

    /// Remove `username`. Returns whether they held the bomb.
    ///
    /// When the holder leaves, the turn moves back one seat so the next
    /// [`Game::next_turn`] lands on whoever sat after them.
    pub fn leave(&mut self, username: &str) -> Option<bool> {
        let idx = self.position(username)?;
        self.players.remove(idx);
        if !self.started {
            return Some(false);
        }
        let had_turn = idx == self.turn;
        if idx < self.turn {
            self.turn -= 1;
        } else if had_turn {
            self.turn = idx
                .checked_sub(1)
                .unwrap_or(self.players.len().saturating_sub(1));
        }
        Some(had_turn)
    }

    pub fn change_setting(&mut self, name: &str, value: &str) -> Result<String, SettingError> {
        let shown = self.settings.set(name, value)?;
        for player in &mut self.players {
            player.lives = self.settings.lives;
        }
        Ok(shown)
    }

    pub fn can_start(&self) -> bool {
        self.players.len() >= 2
    }

    pub fn start<R: Rng + ?Sized>(&mut self, letters: String, rng: &mut R) {
        self.players.shuffle(rng);
        self.started = true;
        self.entrants = self.players.len();
        self.turn = 0;
        self.timer = self.settings.timer as f64;
        self.letters = letters;
        self.turn_started = Instant::now();
    }

    pub fn current(&self) -> Option<&str> {
        if !self.started {
            return None;
        }
        self.players.get(self.turn).map(|p| p.username.as_str())
    }

    pub fn letters(&self) -> &str {
        &self.letters
    }

    pub fn difficulty(&self) -> Difficulty {
        self.settings.difficulty
    }

    /// Fuse length for the current turn.
    pub fn seconds_left(&self) -> f64 {
        self.timer.max(0.0) + self.settings.minimum_time as f64
    }

    pub fn check_word(&self, word: &str) -> Result<(), WordError> {
        if self.used.contains(word) {
            return Err(WordError::Used);
        }
        if !word.contains(self.letters.as_str()) {
            return Err(WordError::Missing(self.letters.clone()));
        }
        if word == self.letters {
            return Err(WordError::Itself);
        }
        Ok(())
    }

    /// Accept `word`, burning the time taken beyond the grace period.
    pub fn use_word(&mut self, word: &str, now: Instant) {
        let elapsed = now.saturating_duration_since(self.turn_started).as_secs_f64();
        self.timer -= (elapsed - self.settings.minimum_time as f64).max(0.0);
        self.timer = self.timer.max(0.0);
        self.used.insert(word.to_owned());
    }

    /// The fuse went off on the current player.
    pub fn explode(&mut self) -> Option<Explosion> {
        self.timer = self.settings.timer as f64;
        let player = self.players.get_mut(self.turn)?;
        player.lives = player.lives.saturating_sub(1);
        Some(Explosion {
            username: player.username.clone(),
            lives: player.lives,
        })
    }

    /// Hand the bomb to the next living player with fresh letters.
    pub fn next_turn(&mut self, letters: String, now: Instant) {
        let count = self.players.len();
        let current = self.players.get(self.turn).map(|p| p.username.clone());
        for step in 1..=count {
            let idx = (self.turn + step) % count;
            let player = &self.players[idx];
            if player.lives > 0 && Some(&player.username) != current.as_ref() {
                self.turn = idx;
                break;
            }
        }
        self.letters = letters;
        self.turn_started = now;
    }

    pub fn living(&self) -> usize {
        self.players.iter().filter(|p| p.lives > 0).count()
    }

    /// The last player standing, once only one is left.
    pub fn winner(&self) -> Option<(i64, &str)> {
        if !self.started {
            return None;
        }
        let mut living = self.players.iter().filter(|p| p.lives > 0);
        match (living.next(), living.next()) {
            (Some(p), None) => Some((p.user_id, p.username.as_str())),
            _ => None,
        }
    }

    pub fn prize(&self) -> i64 {
        (self.entrants as i64 - 1).max(0) * PRIZE_PER_OPPONENT
    }

    pub fn player_list(&self) -> String {
        self.players
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// A finished game's payout.
struct Payout {
    user_id: i64,
    username: String,
    money: i64,
}

/// Shared by the command handlers and the timers.
struct Games {
    core: Arc<Core>,
    active: Mutex<HashMap<String, Game>>,
    generation: Generation,
    dictionary: RwLock<Arc<Dictionary>>,
}

impl Games {
    fn pick_letters(&self, difficulty: Difficulty) -> String {
        self.dictionary
            .read()
            .letters
            .pick(difficulty, &mut rand::thread_rng())
            .unwrap_or_else(|| "a".to_owned())
    }

    fn arm_lobby(self: &Arc<Self>, channel: &str, game: &mut Game) {
        game.disarm();
        let generation = self.generation.advance(channel);
        let delay = self.core.config().bomb_party.lobby_timeout();
        let task = Arc::clone(self).lobby_timeout(channel.to_owned(), generation);
        game.handle = Some(self.core.scheduler().call_later(delay, task));
    }

    fn arm_fuse(self: &Arc<Self>, channel: &str, game: &mut Game) {
        game.disarm();
        let generation = self.generation.advance(channel);
        let delay = Duration::from_secs_f64(game.seconds_left());
        let task = Arc::clone(self).fuse(channel.to_owned(), generation);
        game.handle = Some(self.core.scheduler().call_later(delay, task));
    }

    /// Start `game` and arm its first fuse; returns the announcement.
    fn begin(self: &Arc<Self>, channel: &str, game: &mut Game) -> String {
        let letters = self.pick_letters(game.difficulty());
        game.start(letters, &mut rand::thread_rng());
        self.arm_fuse(channel, game);
        info!(channel = %channel, players = game.players.len(), "Bomb party started");
        format!(
            "@{} You're up first! Your string of letters is {}",
            game.current().unwrap_or_default(),
            game.letters()
        )
    }

    /// Pass the bomb and re-arm; returns the announcement.
    fn pass(self: &Arc<Self>, channel: &str, game: &mut Game) -> String {
        let letters = self.pick_letters(game.difficulty());
        game.next_turn(letters, Instant::now());
        self.arm_fuse(channel, game);
        format!(
            "@{} Your string of letters is {} - You have {} seconds.",
            game.current().unwrap_or_default(),
            game.letters(),
            game.seconds_left().round()
        )
    }

    /// Close the game if it has a winner.
    fn settle(&self, channel: &str, active: &mut HashMap<String, Game>) -> Option<Payout> {
        let game = active.get(channel)?;
        let (user_id, username) = game.winner()?;
        let payout = Payout {
            user_id,
            username: username.to_owned(),
            money: game.prize(),
        };
        self.close(channel, active);
        Some(payout)
    }

    fn close(&self, channel: &str, active: &mut HashMap<String, Game>) {
        self.generation.advance(channel);
        if let Some(mut game) = active.remove(channel) {
            game.disarm();
        }
        debug!(channel = %channel, "Bomb party closed");
    }

    async fn announce(&self, channel: &str, lines: Vec<String>) {
        for line in lines {
            if let Err(e) = self.core.send(channel, &line).await {
                warn!(channel = %channel, error = %e, "Bomb party message not sent");
            }
        }
    }

    async fn pay(&self, channel: &str, payout: Payout) {
        if let Err(e) = self
            .core
            .db()
            .users()
            .add_money(payout.user_id, &payout.username, payout.money)
            .await
        {
            warn!(user = %payout.username, error = %e, "Bomb party prize not paid");
        }
        info!(channel = %channel, winner = %payout.username, money = payout.money, "Bomb party won");
        let text = format!(
            "Congratulations on winning the bomb party game! You've won {} Becky Bucks!",
            payout.money
        );
        if let Err(e) = self.core.reply(channel, &payout.username, &text).await {
            warn!(channel = %channel, error = %e, "Bomb party winner not announced");
        }
    }

    fn lobby_timeout(self: Arc<Self>, channel: String, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            let line = {
                let mut active = self.active.lock();
                if !self.generation.is_current(&channel, generation) {
                    return;
                }
                let Some(game) = active.get_mut(&channel) else {
                    return;
                };
                if game.can_start() {
                    self.begin(&channel, game)
                } else {
                    self.close(&channel, &mut active);
                    "The bomb party game has closed since there is only one player in the party."
                        .to_owned()
                }
            };
            self.announce(&channel, vec![line]).await;
        }
        .boxed()
    }

    fn fuse(self: Arc<Self>, channel: String, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            let (lines, payout) = {
                let mut active = self.active.lock();
                if !self.generation.is_current(&channel, generation) {
                    return;
                }
                let Some(explosion) = active.get_mut(&channel).and_then(Game::explode) else {
                    return;
                };
                let mut lines = vec![explosion.announcement()];
                let payout = self.settle(&channel, &mut active);
                if payout.is_none()
                    && let Some(game) = active.get_mut(&channel)
                {
                    lines.push(self.pass(&channel, game));
                }
                (lines, payout)
            };
            self.announce(&channel, lines).await;
            if let Some(payout) = payout {
                self.pay(&channel, payout).await;
            }
        }
        .boxed()
    }
}

pub struct BombPartyBot {
    router: Arc<CommandRouter>,
    games: Arc<Games>,
}

impl BombPartyBot {
    async fn load_words(&self) {
        let config = &self.router.core().config().bomb_party;
        let words = match &config.word_list {
            Some(path) => match read_word_list(path).await {
                Ok(words) if !words.is_empty() => words,
                Ok(_) => {
                    warn!(path = %path, "Word list empty, using built-in words");
                    builtin_words()
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Word list unreadable, using built-in words");
                    builtin_words()
                }
            },
            None => builtin_words(),
        };
        let dictionary = Dictionary::new(words);
        info!(words = dictionary.len(), "Bomb party dictionary loaded");
        *self.games.dictionary.write() = Arc::new(dictionary);
    }

    async fn open(&self, inv: &Invocation) -> HandlerResult {
        let channel = inv.channel();
        {
            let mut active = self.games.active.lock();
            if active.contains_key(channel) {
                return Ok(());
            }
            let mut game = Game::open(inv.user_id(), inv.username());
            self.games.arm_lobby(channel, &mut game);
            active.insert(channel.to_owned(), game);
        }
        info!(channel = %channel, host = %inv.username(), "Bomb party lobby opened");

        let wait = format_time_length(self.router.core().config().bomb_party.lobby_timeout_secs);
        let text = format!(
            "{} has started a Bomb Party game! Anyone else who wants to play should type !join. \
             When enough players have joined, the host should type !start to start the game, \
             otherwise the game will automatically start or close after {wait}.",
            inv.username()
        );
        self.router.core().send(channel, &text).await?;
        Ok(())
    }

    async fn start(&self, inv: &Invocation) -> HandlerResult {
        let channel = inv.channel();
        let line = {
            let mut active = self.games.active.lock();
            let Some(game) = active.get_mut(channel) else {
                return Ok(());
            };
            if !game.is_host(inv.username()) {
                return Ok(());
            }
            if !game.can_start() {
                return Err(HandlerError::usage(
                    "You need at least 2 players to start the bomb party game.",
                ));
            }
            self.games.begin(channel, game)
        };
        self.games.announce(channel, vec![line]).await;
        Ok(())
    }

    async fn join(&self, inv: &Invocation) -> HandlerResult {
        let joined = {
            let mut active = self.games.active.lock();
            match active.get_mut(inv.channel()) {
                Some(game) if !game.started => game.join(inv.user_id(), inv.username()),
                _ => return Ok(()),
            }
        };
        let text = if joined {
            "You have joined the game of bomb party!"
        } else {
            "You have already joined the game"
        };
        self.router
            .core()
            .reply(inv.channel(), inv.display_name(), text)
            .await?;
        Ok(())
    }

    async fn leave(&self, inv: &Invocation) -> HandlerResult {
        let channel = inv.channel();
        let (lines, payout) = {
            let mut active = self.games.active.lock();
            let Some(game) = active.get_mut(channel) else {
                return Ok(());
            };
            let Some(had_turn) = game.leave(inv.username()) else {
                return Ok(());
            };
            let mut lines = Vec::new();
            let mut payout = None;
            if game.started {
                if game.living() == 0 {
                    self.games.close(channel, &mut active);
                    lines.push("The game of bomb party has closed.".to_owned());
                } else {
                    payout = self.games.settle(channel, &mut active);
                    if payout.is_none()
                        && had_turn
                        && let Some(game) = active.get_mut(channel)
                    {
                        lines.push(self.games.pass(channel, game));
                    }
                }
            } else if game.players.is_empty() {
                self.games.close(channel, &mut active);
                lines.push("The game of bomb party has closed.".to_owned());
            }
            (lines, payout)
        };

        self.router
            .core()
            .reply(channel, inv.display_name(), "You have left the game of bomb party.")
            .await?;
        self.games.announce(channel, lines).await;
        if let Some(payout) = payout {
            self.games.pay(channel, payout).await;
        }
        Ok(())
    }

    async fn settings(&self, inv: &Invocation) -> HandlerResult {
        let mut args = inv.args();
        let result = {
            let mut active = self.games.active.lock();
            let Some(game) = active.get_mut(inv.channel()) else {
                return Ok(());
            };
            if !game.is_host(inv.username()) {
                return Ok(());
            }
            let (Some(name), Some(value)) = (args.next(), args.next()) else {
                return Err(HandlerError::usage(format!(
                    "You must provide a setting name and the value: !settings <setting> <value>. \
                     Valid settings: {}",
                    Settings::NAMES.join(", ")
                )));
            };
            game.change_setting(&name, &value)
                .map(|shown| format!("The {} setting has been changed to {shown}", name.to_lowercase()))
        };
        let text = result.unwrap_or_else(|e| e.to_string());
        self.router
            .core()
            .reply(inv.channel(), inv.display_name(), &text)
            .await?;
        Ok(())
    }

    async fn players(&self, inv: &Invocation) -> HandlerResult {
        let list = {
            let active = self.games.active.lock();
            let Some(game) = active.get(inv.channel()) else {
                return Ok(());
            };
            game.player_list()
        };
        let text = format!("Current players playing bomb party: {list}");
        self.router
            .core()
            .reply(inv.channel(), inv.display_name(), &text)
            .await?;
        Ok(())
    }
}

async fn read_word_list(path: &str) -> anyhow::Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

fn builtin_words() -> Vec<String> {
    BUILTIN_WORDS.iter().map(|w| (*w).to_owned()).collect()
}

#[async_trait]
impl Component for BombPartyBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[ContextType::Setup, ContextType::Message]
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(
                CommandSpec::new(
                    "bombparty",
                    "Start a bomb party game. Players take turns saying a word containing their \
                     string of letters before the bomb explodes. Run out of lives and you're out.",
                )
                .aliases(&["bomb_party"]),
            )
            .with(CommandSpec::new(
                "start",
                "Start the bomb party game. Needs at least 2 players.",
            ))
            .with(CommandSpec::new("join", "Join the open bomb party game.").cooldown(0, 3))
            .with(CommandSpec::new("leave", "Leave the bomb party game.").cooldown(0, 3))
            .with(
                CommandSpec::new("settings", "Change the settings of a bomb party game.")
                    .arg(CommandArg::required(
                        "setting",
                        "difficulty, timer, minimum_time, or lives",
                    ))
                    .arg(CommandArg::required(
                        "value",
                        "easy/medium/hard/nightmare/impossible, timer 5-60, minimum_time 0-10, lives 1-5",
                    ))
                    .cooldown(0, 0),
            )
            .with(CommandSpec::new("players", "List the players currently in bomb party."))
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "bombparty" => self.open(inv).await,
            "start" => self.start(inv).await,
            "join" => self.join(inv).await,
            "leave" => self.leave(inv).await,
            "settings" => self.settings(inv).await,
            "players" => self.players(inv).await,
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }

    async fn on_setup(&self) -> HandlerResult {
        self.load_words().await;
        Ok(())
    }

    async fn on_message(&self, ctx: &Arc<MessageContext>) -> HandlerResult {
        let core = self.router.core();
        if core.is_self(&ctx.sending_user) {
            return Ok(());
        }
        let word = ctx.message.trim().to_lowercase();
        let dictionary = Arc::clone(&*self.games.dictionary.read());

        let line = {
            let mut active = self.games.active.lock();
            let Some(game) = active.get_mut(&ctx.channel) else {
                return Ok(());
            };
            let Some(current) = game.current() else {
                return Ok(());
            };
            if !current.eq_ignore_ascii_case(&ctx.sending_user) || !dictionary.contains(&word) {
                return Ok(());
            }
            match game.check_word(&word) {
                Err(e) => format!("@{current} {e}"),
                Ok(()) => {
                    game.use_word(&word, Instant::now());
                    debug!(channel = %ctx.channel, word = %word, "Bomb party word accepted");
                    self.games.pass(&ctx.channel, game)
                }
            }
        };
        self.games.announce(&ctx.channel, vec![line]).await;
        Ok(())
    }
}

impl Declare for BombPartyBot {
    const NAME: &'static str = "BombPartyBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        let router = deps.get::<CommandRouter>()?;
        let games = Arc::new(Games {
            core: Arc::clone(router.core()),
            active: Mutex::new(HashMap::new()),
            generation: Generation::new(),
            dictionary: RwLock::new(Arc::new(Dictionary::new(builtin_words()))),
        });
        Ok(Self { router, games })
    }
}
