//! AFK statuses.
//!
//! Statuses are cached in memory and written through to the store. The cache
//! lock is held across the store write so a concurrent message cannot see a
//! half-applied change.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tmi_proto::{ContextType, ControlCommand, ControlRequest, MessageContext};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::db::AfkRecord;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};
use crate::util::format_since;

/// Seconds an AFK must age before a message from its owner clears it.
const AUTO_REMOVE_AFTER: i64 = 60;

pub struct AfkBot {
    router: Arc<CommandRouter>,
    afks: Mutex<HashMap<i64, AfkRecord>>,
}

impl AfkBot {
    async fn reload(&self) -> HandlerResult {
        let records = self.router.core().db().afk().list().await?;
        let mut afks = self.afks.lock().await;
        *afks = records.into_iter().map(|r| (r.user_id, r)).collect();
        info!(afks = afks.len(), "AFK cache loaded");
        Ok(())
    }

    pub async fn is_afk(&self, user_id: i64) -> bool {
        self.afks.lock().await.contains_key(&user_id)
    }

    async fn set_afk(&self, inv: &Invocation) -> HandlerResult {
        let message = inv.args().rest();
        {
            let mut afks = self.afks.lock().await;
            let record = self
                .router
                .core()
                .db()
                .afk()
                .set(inv.user_id(), inv.username(), &message, Utc::now().timestamp())
                .await?;
            afks.insert(record.user_id, record);
        }
        self.router
            .core()
            .reply(inv.channel(), inv.display_name(), "Your afk has been set.")
            .await?;
        Ok(())
    }

    /// Remove `user_id`'s status, returning it if there was one.
    async fn remove_afk(&self, user_id: i64) -> Result<Option<AfkRecord>, HandlerError> {
        let mut afks = self.afks.lock().await;
        let Some(record) = afks.remove(&user_id) else {
            return Ok(None);
        };
        self.router.core().db().afk().remove(user_id).await?;
        Ok(Some(record))
    }

    async fn announce_removed(&self, channel: &str, name: &str, record: &AfkRecord) -> HandlerResult {
        let text = format!(
            "Your afk has been removed. (Afk for {})",
            format_since(record.set_at)
        );
        self.router.core().reply(channel, name, &text).await?;
        Ok(())
    }

    async fn notify_mentions(&self, ctx: &MessageContext) -> HandlerResult {
        let pinged: Vec<AfkRecord> = {
            let afks = self.afks.lock().await;
            let names = ctx.mentions();
            afks.values()
                .filter(|afk| names.contains(&afk.username.to_lowercase()))
                .cloned()
                .collect()
        };

        let name = display_name(ctx);
        for afk in pinged {
            let text = format!(
                "{} is afk ({} ago): {}",
                afk.username,
                format_since(afk.set_at),
                afk.message
            );
            self.router.core().reply(&ctx.channel, name, &text).await?;
        }
        Ok(())
    }

    async fn auto_remove(&self, ctx: &MessageContext) -> HandlerResult {
        let set_at = match self.afks.lock().await.get(&ctx.user_id) {
            Some(afk) => afk.set_at,
            None => return Ok(()),
        };
        if Utc::now().timestamp() - set_at <= AUTO_REMOVE_AFTER {
            return Ok(());
        }

        let user = self
            .router
            .core()
            .db()
            .users()
            .ensure(ctx.user_id, &ctx.sending_user)
            .await?;
        if !user.auto_remove_afk {
            return Ok(());
        }

        if let Some(record) = self.remove_afk(ctx.user_id).await? {
            debug!(user = %ctx.sending_user, "AFK auto-removed");
            self.announce_removed(&ctx.channel, display_name(ctx), &record)
                .await?;
        }
        Ok(())
    }
}

fn display_name(ctx: &MessageContext) -> &str {
    if ctx.user.display_name.is_empty() {
        &ctx.sending_user
    } else {
        &ctx.user.display_name
    }
}

#[async_trait]
impl Component for AfkBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[
            ContextType::Setup,
            ContextType::Message,
            ContextType::ServerControl,
        ]
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(
                CommandSpec::new(
                    "afk",
                    "Set an AFK status. Pinging you makes the bot say you're AFK. \
                     Your next message after a minute clears it unless auto_remove_afk is off.",
                )
                .arg(CommandArg::optional("message", "shown to people who ping you")),
            )
            .with(
                CommandSpec::new("removeafk", "Manually remove your AFK status")
                    .aliases(&["rafk", "afkremove", "afkr", "unafk"]),
            )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "afk" => self.set_afk(inv).await,
            "removeafk" => match self.remove_afk(inv.user_id()).await? {
                Some(record) => {
                    self.announce_removed(inv.channel(), inv.display_name(), &record)
                        .await
                }
                None => Err(HandlerError::usage("You are not afk")),
            },
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }

    async fn on_setup(&self) -> HandlerResult {
        self.reload().await
    }

    async fn on_message(&self, ctx: &Arc<MessageContext>) -> HandlerResult {
        let core = self.router.core();
        if core.is_self(&ctx.sending_user) || self.router.channel(ctx.room_id).is_none() {
            return Ok(());
        }
        self.notify_mentions(ctx).await?;
        self.auto_remove(ctx).await
    }

    async fn on_server_msg(&self, req: &ControlRequest) -> HandlerResult {
        match req.command {
            ControlCommand::RefreshData => self.reload().await,
            _ => Ok(()),
        }
    }
}

impl Declare for AfkBot {
    const NAME: &'static str = "AfkBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            afks: Mutex::new(HashMap::new()),
        })
    }
}
