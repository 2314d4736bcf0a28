//! Word scramble rounds, one per channel.
//!
//! A round ends exactly once: a correct answer, or the timeout. Both paths
//! remove the round under the lock, and the timeout additionally checks the
//! generation it was scheduled with so a stale timer never ends a newer
//! round.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand::seq::SliceRandom;
use tmi_proto::{ContextType, MessageContext};
use tracing::{debug, info, warn};

use super::core::Core;
use super::router::CommandRouter;
use crate::commands::{CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies, Generation, TaskHandle};

const BUILTIN_WORDS: &[&str] = &[
    "keyboard", "monitor", "rhythm", "circle", "slider", "spinner", "bucket", "channel",
    "message", "reminder", "timezone", "scramble", "balance", "leaderboard", "pineapple",
    "umbrella", "volcano", "penguin", "galaxy", "lantern", "whisper", "trumpet", "blanket",
    "compass", "meadow", "harvest",
];

const HIDDEN: char = '?';

/// One channel's round.
#[derive(Debug)]
struct Round {
    answer: String,
    hint: Vec<char>,
    generation: u64,
    timer: Option<TaskHandle>,
}

impl Round {
    fn new(answer: String, generation: u64) -> Self {
        let hint = vec![HIDDEN; answer.chars().count()];
        Self {
            answer,
            hint,
            generation,
            timer: None,
        }
    }

    fn unrevealed(&self) -> usize {
        self.hint.iter().filter(|c| **c == HIDDEN).count()
    }

    /// Reveal the next hidden letter. `None` once everything is shown.
    fn reveal(&mut self) -> Option<String> {
        let pos = self.hint.iter().position(|c| *c == HIDDEN)?;
        self.hint[pos] = self.answer.chars().nth(pos)?;
        Some(self.hint.iter().collect())
    }

    fn matches(&self, guess: &str) -> bool {
        guess.trim().eq_ignore_ascii_case(self.answer.trim())
    }
}

/// Shuffle the letters of `answer`, keeping spaces where they were.
pub fn scramble_word<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let mut letters: Vec<char> = answer.chars().filter(|c| *c != ' ').collect();
    letters.shuffle(rng);
    let mut letters = letters.into_iter();
    answer
        .chars()
        .map(|c| if c == ' ' { ' ' } else { letters.next().unwrap_or(c) })
        .collect()
}

/// Money for a correct answer with `unrevealed` letters still hidden.
pub fn payout<R: Rng + ?Sized>(unrevealed: usize, rng: &mut R) -> i64 {
    rng.gen_range(5..=10) * unrevealed as i64
}

#[derive(Default)]
struct Rounds {
    active: Mutex<HashMap<String, Round>>,
    generation: Generation,
}

impl Rounds {
    /// End the round if it is still the one scheduled as `generation`.
    fn expire(&self, channel: &str, generation: u64) -> Option<String> {
        let mut active = self.active.lock();
        if !self.generation.is_current(channel, generation) {
            return None;
        }
        match active.get(channel) {
            Some(round) if round.generation == generation => {}
            _ => return None,
        }
        self.generation.advance(channel);
        active.remove(channel).map(|round| round.answer)
    }
}

pub struct ScrambleBot {
    router: Arc<CommandRouter>,
    words: RwLock<Vec<String>>,
    rounds: Arc<Rounds>,
}

impl ScrambleBot {
    async fn load_words(&self) {
        let config = &self.router.core().config().scramble;
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
        info!(words = words.len(), "Scramble words loaded");
        *self.words.write() = words;
    }

    fn pick_word(&self) -> Option<String> {
        self.words.read().choose(&mut rand::thread_rng()).cloned()
    }

    async fn start(&self, inv: &Invocation) -> HandlerResult {
        let core = Arc::clone(self.router.core());
        let channel = inv.channel().to_owned();
        let Some(answer) = self.pick_word() else {
            return Err(HandlerError::Internal("no scramble words loaded".into()));
        };

        let scrambled = {
            let mut active = self.rounds.active.lock();
            if active.contains_key(&channel) {
                return Ok(());
            }
            let generation = self.rounds.generation.advance(&channel);
            let mut round = Round::new(answer, generation);
            let scrambled = scramble_word(&round.answer, &mut rand::thread_rng());

            let timeout = core.config().scramble.round_timeout();
            round.timer = Some(core.scheduler().call_later(
                timeout,
                round_timeout(Arc::clone(&core), Arc::clone(&self.rounds), channel.clone(), generation),
            ));
            active.insert(channel.clone(), round);
            scrambled
        };

        debug!(channel = %channel, "Scramble started");
        core.send(&channel, &format!("Unscramble this word: {}", scrambled.to_lowercase()))
            .await?;
        Ok(())
    }

    async fn hint(&self, inv: &Invocation) -> HandlerResult {
        let hint = {
            let mut active = self.rounds.active.lock();
            let Some(round) = active.get_mut(inv.channel()) else {
                return Ok(());
            };
            round.reveal()
        };
        let hint = hint.ok_or_else(|| HandlerError::usage("There are no hints left bruh"))?;
        self.router
            .core()
            .send(inv.channel(), &format!("Here's a hint (word): {}", hint.to_lowercase()))
            .await?;
        Ok(())
    }

    /// Take the channel's round if `guess` solves it.
    fn solve(&self, channel: &str, guess: &str) -> Option<Round> {
        let mut active = self.rounds.active.lock();
        if !active.get(channel)?.matches(guess) {
            return None;
        }
        self.rounds.generation.advance(channel);
        let round = active.remove(channel)?;
        if let Some(timer) = &round.timer {
            timer.cancel();
        }
        Some(round)
    }
}

async fn round_timeout(core: Arc<Core>, rounds: Arc<Rounds>, channel: String, generation: u64) {
    let Some(answer) = rounds.expire(&channel, generation) else {
        return;
    };
    if let Err(e) = core
        .send(&channel, &format!("Time is up! The word was {answer}"))
        .await
    {
        warn!(channel = %channel, error = %e, "Scramble timeout not announced");
    }
}

async fn read_word_list(path: &str) -> anyhow::Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let words: Vec<String> = serde_json::from_str(&raw)?;
    Ok(words
        .into_iter()
        .map(|w| w.trim().to_owned())
        .filter(|w| !w.is_empty())
        .collect())
}

fn builtin_words() -> Vec<String> {
    BUILTIN_WORDS.iter().map(|w| (*w).to_owned()).collect()
}

#[async_trait]
impl Component for ScrambleBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[ContextType::Setup, ContextType::Message]
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(CommandSpec::new("scramble", "Unscramble the word"))
            .with(CommandSpec::new("hint", "Reveal the next letter of the scramble word"))
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "scramble" => self.start(inv).await,
            "hint" => self.hint(inv).await,
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
        let Some(round) = self.solve(&ctx.channel, &ctx.message) else {
            return Ok(());
        };

        let money = payout(round.unrevealed(), &mut rand::thread_rng());
        core.db()
            .users()
            .add_money(ctx.user_id, &ctx.sending_user, money)
            .await?;
        info!(channel = %ctx.channel, user = %ctx.sending_user, money, "Scramble solved");

        let name = if ctx.user.display_name.is_empty() {
            &ctx.sending_user
        } else {
            &ctx.user.display_name
        };
        let text = format!(
            "You got it right! {} was the word. Drake You've won {money} Becky Bucks!",
            round.answer
        );
        core.reply(&ctx.channel, name, &text).await?;
        Ok(())
    }
}

impl Declare for ScrambleBot {
    const NAME: &'static str = "ScrambleBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            words: RwLock::new(builtin_words()),
            rounds: Arc::new(Rounds::default()),
        })
    }
}
