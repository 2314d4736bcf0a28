//! Number guessing, one secret per channel.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

const MAX_NUMBER: u32 = 1000;

pub struct GuessBot {
    router: Arc<CommandRouter>,
    secrets: DashMap<String, u32>,
}

impl GuessBot {
    fn new_secret() -> u32 {
        rand::thread_rng().gen_range(1..=MAX_NUMBER)
    }

    /// Compare `guess` with the channel's secret, rolling a new one on a hit.
    pub fn check(&self, channel: &str, guess: u32) -> Ordering {
        let mut secret = self
            .secrets
            .entry(channel.to_owned())
            .or_insert_with(Self::new_secret);
        let order = guess.cmp(&secret);
        if order == Ordering::Equal {
            *secret = Self::new_secret();
        }
        order
    }
}

#[async_trait]
impl Component for GuessBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new().with(
            CommandSpec::new(
                "guess",
                "Guess a number between 1 and 1000; you'll hear higher or lower until you get it",
            )
            .arg(CommandArg::required("number", "number between 1 and 1000"))
            .cooldown(2, 3),
        )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        let arg = inv
            .args()
            .next()
            .ok_or_else(|| HandlerError::usage("You must provide a number 1-1000 to guess with"))?;
        let guess: u32 = arg
            .parse()
            .map_err(|_| HandlerError::usage("That's not a valid number OuttaPocket Tssk"))?;

        let text = match self.check(inv.channel(), guess) {
            Ordering::Equal => "You got it PogYou".to_owned(),
            Ordering::Less => format!("It's not {guess}. Try guessing higher. veryPog"),
            Ordering::Greater => format!("It's not {guess}. Try guessing lower. veryPog"),
        };
        self.router
            .core()
            .reply(inv.channel(), inv.display_name(), &text)
            .await?;
        Ok(())
    }
}

impl Declare for GuessBot {
    const NAME: &'static str = "GuessBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            secrets: DashMap::new(),
        })
    }
}
