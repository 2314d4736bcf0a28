//! Rock paper scissors for money.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

const STAKE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Accepts the full word or its first letter.
    pub fn parse(arg: &str) -> Option<Self> {
        match arg.chars().next()?.to_ascii_lowercase() {
            'r' => Some(Self::Rock),
            'p' => Some(Self::Paper),
            's' => Some(Self::Scissors),
            _ => None,
        }
    }

    fn beats(self) -> Move {
        match self {
            Self::Rock => Self::Scissors,
            Self::Paper => Self::Rock,
            Self::Scissors => Self::Paper,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Paper => "paper",
            Self::Scissors => "scissors",
        }
    }

    /// `Greater` when `self` wins against `other`.
    pub fn play(self, other: Move) -> Ordering {
        if self == other {
            Ordering::Equal
        } else if self.beats() == other {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

pub struct RpsBot {
    router: Arc<CommandRouter>,
}

#[async_trait]
impl Component for RpsBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new().with(
            CommandSpec::new("rps", "Play rock paper scissors and win or lose money")
                .arg(CommandArg::required(
                    "play",
                    "rock, paper, or scissors (or the first letter)",
                ))
                .cooldown(2, 4),
        )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        const HINT: &str =
            "You must say either rock, paper, or scissors. (You can also use the first letter for short)";

        let arg = inv
            .args()
            .next()
            .ok_or_else(|| HandlerError::usage(HINT))?;
        let player = Move::parse(&arg)
            .ok_or_else(|| HandlerError::usage(format!("That's not a valid move. {HINT}")))?;
        let bot = Move::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(Move::Rock);

        let core = self.router.core();
        let users = core.db().users();
        let text = match player.play(bot) {
            Ordering::Equal => format!("I also chose {}! bruh", bot.as_str()),
            Ordering::Less => {
                users.add_money(inv.user_id(), inv.username(), -STAKE).await?;
                format!(
                    "LETSGO I won, {} beats {}. You lose {STAKE} Becky Bucks!",
                    bot.as_str(),
                    player.as_str()
                )
            }
            Ordering::Greater => {
                users.add_money(inv.user_id(), inv.username(), STAKE).await?;
                format!(
                    "IMDONEMAN I lost, {} beats {}. You win {STAKE} Becky Bucks!",
                    player.as_str(),
                    bot.as_str()
                )
            }
        };
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

impl Declare for RpsBot {
    const NAME: &'static str = "RpsBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move() {
        assert_eq!(Move::parse("Rock"), Some(Move::Rock));
        assert_eq!(Move::parse("s"), Some(Move::Scissors));
        assert_eq!(Move::parse("lizard"), None);
        assert_eq!(Move::parse(""), None);
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(Move::Rock.play(Move::Scissors), Ordering::Greater);
        assert_eq!(Move::Rock.play(Move::Paper), Ordering::Less);
        assert_eq!(Move::Paper.play(Move::Paper), Ordering::Equal);
    }
}
