//! Balances, the leaderboard and transfers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::db::DbError;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};
use crate::util::normalize_username;

const CURRENCY: &str = "Becky Bucks";
const DEFAULT_TOP: i64 = 5;
const MAX_TOP: i64 = 10;

pub struct UserDataBot {
    router: Arc<CommandRouter>,
}

impl UserDataBot {
    async fn balance(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let users = core.db().users();
        let user = match inv.args().next() {
            Some(name) => {
                let name = normalize_username(&name);
                users
                    .find_by_username(&name)
                    .await?
                    .ok_or_else(|| HandlerError::usage(format!("{name} is not in the database")))?
            }
            None => users.ensure(inv.user_id(), inv.username()).await?,
        };

        let text = format!("{} currently has {} {CURRENCY}.", user.username, user.money);
        core.send(inv.channel(), &text).await?;
        Ok(())
    }

    async fn leaderboard(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let limit = match inv.args().take_value("n") {
            Some(n) => n
                .parse::<i64>()
                .map_err(|_| HandlerError::usage("That's not a valid number."))?
                .clamp(1, MAX_TOP),
            None => DEFAULT_TOP,
        };

        let top = core.db().users().top(limit).await?;
        let entries: Vec<String> = top
            .iter()
            .enumerate()
            .map(|(i, user)| format!("{}. {}_${}", i + 1, user.username, user.money))
            .collect();
        let text = format!("Top {} richest users: {}", top.len(), entries.join(" "));
        core.send(inv.channel(), &text).await?;
        Ok(())
    }

    async fn ranking(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let users = core.db().users();
        users.ensure(inv.user_id(), inv.username()).await?;
        let rank = users
            .ranking(inv.user_id())
            .await?
            .ok_or_else(|| HandlerError::Internal("ranked user vanished".into()))?;

        let text = format!("You are currently rank {rank} in terms of {CURRENCY}!");
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }

    async fn give(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let users = core.db().users();
        let mut args = inv.args();
        let (Some(target), Some(amount)) = (args.next(), args.next()) else {
            return Err(HandlerError::usage(
                "Must say the user and amount of money to give",
            ));
        };

        let target = users
            .find_by_username(&normalize_username(&target))
            .await?
            .ok_or_else(|| HandlerError::usage("That user does not exist in the database"))?;
        if !target.can_receive_money {
            return Err(HandlerError::usage(
                "This user has their receive setting turned off and therefore cannot accept money.",
            ));
        }
        let amount: i64 = amount
            .parse()
            .map_err(|_| HandlerError::usage("That's not a valid number."))?;
        if amount < 0 {
            return Err(HandlerError::usage(
                "You can't give someone a negative amount OuttaPocket Tssk",
            ));
        }

        users.ensure(inv.user_id(), inv.username()).await?;
        match users.transfer(inv.user_id(), target.id, amount).await {
            Ok(()) => {}
            Err(DbError::InsufficientFunds { .. }) => {
                return Err(HandlerError::usage("You too broke for that bruh"));
            }
            Err(e) => return Err(e.into()),
        }
        info!(from = %inv.username(), to = %target.username, amount, "Money given");

        let text = format!("You have given {} {amount} {CURRENCY}!", target.username);
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

#[async_trait]
impl Component for UserDataBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(
                CommandSpec::new("bal", "Check the balance of yourself or a user")
                    .arg(CommandArg::optional("user", "user to check, empty for yourself"))
                    .aliases(&["balance"]),
            )
            .with(
                CommandSpec::new("leaderboard", "Richest users")
                    .arg(CommandArg::flag("count", "n", "how many users to show"))
                    .aliases(&["lb"]),
            )
            .with(CommandSpec::new(
                "ranking",
                "Your position on the leaderboard",
            ))
            .with(
                CommandSpec::new(
                    "give",
                    "Give money to a user who has can_receive_money turned on",
                )
                .arg(CommandArg::required("user", "who to give to"))
                .arg(CommandArg::required("amount", "how much to give")),
            )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "bal" => self.balance(inv).await,
            "leaderboard" => self.leaderboard(inv).await,
            "ranking" => self.ranking(inv).await,
            "give" => self.give(inv).await,
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }
}

impl Declare for UserDataBot {
    const NAME: &'static str = "UserDataBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
        })
    }
}
