//! Simulated gacha pulls with persistent pity.
//!
//! Every pull advances both counters. Ten pulls without a 4 star guarantee
//! one, ninety without a 5 star guarantee that, and from pull 76 on the 5
//! star odds ramp up.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use rand::seq::SliceRandom;
use tmi_proto::ContextType;
use tracing::{debug, info, warn};

use super::router::CommandRouter;
use crate::commands::{CommandSet, CommandSpec, Invocation};
use crate::db::Pity;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

const FOUR_STAR_PITY: i64 = 10;
const FIVE_STAR_PITY: i64 = 90;
const SOFT_PITY: i64 = 76;

const BUILTIN_THREE: &[&str] = &["Slingshot", "Raven Bow", "Magic Guide", "Debate Club", "Cool Steel"];
const BUILTIN_FOUR: &[&str] = &["Amber", "Kaeya", "Lisa", "Xiangling", "Bennett", "The Flute", "Rust"];
const BUILTIN_FIVE: &[&str] = &["Yae Miko", "Zhongli", "Venti", "Skyward Harp", "Staff of Homa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rarity {
    Three,
    Four,
    Five,
}

impl Rarity {
    fn key(self) -> &'static str {
        match self {
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
        }
    }

    fn flourish(self) -> &'static str {
        match self {
            Self::Three => ". 😔⭐⭐⭐",
            Self::Four => "! Pog🌟🌟🌟🌟",
            Self::Five => "! PogYou🌟🌟🌟🌟🌟",
        }
    }
}

/// Out of 1000, the chance of a 5 star at `five` pulls since the last one.
fn five_star_odds(five: i64) -> i64 {
    if five >= SOFT_PITY {
        300 - 20 * (five - SOFT_PITY)
    } else {
        6
    }
}

/// One pull.
///
/// Returns the rarity and the counters as they stood at the pull, which is
/// what the chat message reports. Use [`reset`] for the stored values.
pub fn roll<R: Rng + ?Sized>(pity: Pity, rng: &mut R) -> (Rarity, Pity) {
    let counted = Pity {
        four: pity.four + 1,
        five: pity.five + 1,
    };
    let rarity = if counted.five >= FIVE_STAR_PITY {
        Rarity::Five
    } else if counted.four >= FOUR_STAR_PITY {
        Rarity::Four
    } else {
        let num = rng.gen_range(1..=1000);
        if num <= five_star_odds(counted.five) {
            Rarity::Five
        } else if num <= 57 {
            Rarity::Four
        } else {
            Rarity::Three
        }
    };
    (rarity, counted)
}

/// Counters to store after pulling `rarity`.
pub fn reset(rarity: Rarity, counted: Pity) -> Pity {
    match rarity {
        Rarity::Five => Pity::default(),
        Rarity::Four => Pity {
            four: 0,
            five: counted.five,
        },
        Rarity::Three => counted,
    }
}

type Pool = HashMap<String, Vec<String>>;

fn builtin_pool() -> Pool {
    [
        (Rarity::Three, BUILTIN_THREE),
        (Rarity::Four, BUILTIN_FOUR),
        (Rarity::Five, BUILTIN_FIVE),
    ]
    .into_iter()
    .map(|(rarity, items)| {
        (
            rarity.key().to_owned(),
            items.iter().map(|i| (*i).to_owned()).collect(),
        )
    })
    .collect()
}

async fn read_pool(path: &str) -> anyhow::Result<Pool> {
    let raw = tokio::fs::read_to_string(path).await?;
    let pool: Pool = serde_json::from_str(&raw)?;
    for rarity in [Rarity::Three, Rarity::Four, Rarity::Five] {
        if pool.get(rarity.key()).is_none_or(Vec::is_empty) {
            anyhow::bail!("no {} star items", rarity.key());
        }
    }
    Ok(pool)
}

pub struct PullBot {
    router: Arc<CommandRouter>,
    pool: RwLock<Pool>,
}

impl PullBot {
    async fn load_pool(&self) {
        let Some(path) = &self.router.core().config().pull.options else {
            return;
        };
        match read_pool(path).await {
            Ok(pool) => {
                info!(path = %path, "Pull options loaded");
                *self.pool.write() = pool;
            }
            Err(e) => warn!(path = %path, error = %e, "Pull options unreadable, using built-in pool"),
        }
    }

    fn pick(&self, rarity: Rarity) -> String {
        self.pool
            .read()
            .get(rarity.key())
            .and_then(|items| items.choose(&mut rand::thread_rng()).cloned())
            .unwrap_or_else(|| "nothing".to_owned())
    }

    async fn pull(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let pity = core.db().pity().get(inv.user_id(), inv.username()).await?;
        let (rarity, counted) = roll(pity, &mut rand::thread_rng());
        let rolls = match rarity {
            Rarity::Four => counted.four,
            Rarity::Three | Rarity::Five => counted.five,
        };
        debug!(user = %inv.username(), ?rarity, rolls, "Pulled");

        let text = format!(
            "You pulled {} {} Rolls in: {rolls}",
            self.pick(rarity),
            rarity.flourish()
        );
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        core.db()
            .pity()
            .set(inv.user_id(), reset(rarity, counted))
            .await?;
        Ok(())
    }

    async fn pity(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let pity = core.db().pity().get(inv.user_id(), inv.username()).await?;
        let text = format!(
            "4* pity in {} rolls; 5* pity in {} rolls.",
            FOUR_STAR_PITY - pity.four,
            FIVE_STAR_PITY - pity.five
        );
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

#[async_trait]
impl Component for PullBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[ContextType::Setup]
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(
                CommandSpec::new("pull", "Simulate a genshin pull. Check your pity with !pity.")
                    .cooldown(1, 2),
            )
            .with(CommandSpec::new("pity", "Check your pity for !pull."))
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "pull" => self.pull(inv).await,
            "pity" => self.pity(inv).await,
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }

    async fn on_setup(&self) -> HandlerResult {
        self.load_pool().await;
        Ok(())
    }
}

impl Declare for PullBot {
    const NAME: &'static str = "PullBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            pool: RwLock::new(builtin_pool()),
        })
    }
}
