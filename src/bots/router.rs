//! Chat command routing and the channel directory.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tmi_proto::{ContextType, MessageContext};
use tracing::{Instrument, debug, error, info, trace, warn};

use super::core::Core;
use crate::commands::{CallableCommand, Invocation};
use crate::db::ChannelRecord;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};
use crate::telemetry::spans;

/// What a channel config refresh changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelChange {
    /// Newly enabled or added: join it.
    Join(String),
    /// Disabled or deleted: leave it.
    Part(String),
    /// Still enabled under a new broadcaster name: leave the old, join the new.
    Renamed { old: String, new: String },
    /// Still enabled; cached config replaced.
    Updated(String),
    /// Disabled before and after.
    Unchanged,
}

pub struct CommandRouter {
    core: Arc<Core>,
    /// Enabled channels keyed by broadcaster id (`room-id`).
    channels: DashMap<i64, ChannelRecord>,
}

impl CommandRouter {
    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// Cached config for the channel with this room id.
    pub fn channel(&self, room_id: i64) -> Option<ChannelRecord> {
        self.channels.get(&room_id).map(|c| c.clone())
    }

    /// Enabled channel names, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|c| c.username.clone()).collect();
        names.sort();
        names
    }

    fn wanted(&self, channel: &ChannelRecord) -> bool {
        channel.is_enabled
            && self
                .core
                .config()
                .commands
                .debug_room_id
                .is_none_or(|room| room == channel.user_id)
    }

    /// Replace the directory with what the store says.
    pub async fn reload_channels(&self) -> HandlerResult {
        let records = self.core.db().channels().list().await?;
        self.channels.clear();
        for record in records.into_iter().filter(|c| self.wanted(c)) {
            self.channels.insert(record.user_id, record);
        }
        info!(channels = self.channels.len(), "Channel directory loaded");
        Ok(())
    }

    /// Apply a fresh record for channel row `id` (`None` when deleted).
    pub fn apply_channel(&self, id: i64, record: Option<ChannelRecord>) -> ChannelChange {
        let previous = self
            .channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| (c.user_id, c.username.clone()));

        match (previous, record.filter(|r| self.wanted(r))) {
            (Some((room, name)), None) => {
                self.channels.remove(&room);
                ChannelChange::Part(name)
            }
            (None, Some(record)) => {
                let name = record.username.clone();
                self.channels.insert(record.user_id, record);
                ChannelChange::Join(name)
            }
            (Some((room, old)), Some(record)) => {
                let name = record.username.clone();
                self.channels.remove(&room);
                self.channels.insert(record.user_id, record);
                if old.eq_ignore_ascii_case(&name) {
                    ChannelChange::Updated(name)
                } else {
                    ChannelChange::Renamed { old, new: name }
                }
            }
            (None, None) => ChannelChange::Unchanged,
        }
    }

    /// Normalize a chat message into command text: drop the leading reply
    /// mention, keep ASCII only, trim.
    pub fn command_text(ctx: &MessageContext) -> String {
        let body = if ctx.reply.is_some() {
            ctx.message
                .split_whitespace()
                .skip(1)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            ctx.message.clone()
        };
        body.chars()
            .filter(char::is_ascii)
            .collect::<String>()
            .trim()
            .to_owned()
    }

    /// Resolve `text` to a command, if it carries the prefix.
    pub fn route(&self, text: &str) -> Option<Arc<CallableCommand>> {
        let prefix = &self.core.config().commands.prefix;
        let token = text.split_whitespace().next()?.strip_prefix(prefix.as_str())?;
        if token.is_empty() {
            return None;
        }
        self.core.commands().lookup(token)
    }

    fn spawn_invocation(&self, owner: Arc<dyn Component>, inv: Invocation) {
        let core = Arc::clone(&self.core);
        let span = spans::command(inv.command.name(), inv.channel(), inv.username());
        tokio::spawn(
            async move {
                match owner.invoke(&inv).await {
                    Ok(()) => {}
                    Err(HandlerError::Usage(msg)) => {
                        if let Err(e) = core.reply(inv.channel(), inv.display_name(), &msg).await {
                            warn!(error = %e, "Usage reply failed");
                        }
                    }
                    Err(e) => error!(
                        owner = owner.name(),
                        code = e.error_code(),
                        error = %e,
                        "Command failed"
                    ),
                }
            }
            .instrument(span),
        );
    }
}

#[async_trait]
impl Component for CommandRouter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[
            ContextType::Setup,
            ContextType::Connected,
            ContextType::Message,
        ]
    }

    async fn on_setup(&self) -> HandlerResult {
        let report = self
            .core
            .db()
            .commands()
            .sync(&self.core.commands().metadata())
            .await?;
        info!(
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            "Command metadata synced"
        );
        self.reload_channels().await
    }

    async fn on_connected(&self) -> HandlerResult {
        info!("Logged in");
        self.core.request_capabilities().await?;
        for name in self.channel_names() {
            self.core.join(&name).await?;
        }
        Ok(())
    }

    async fn on_message(&self, ctx: &Arc<MessageContext>) -> HandlerResult {
        if self.core.is_self(&ctx.sending_user) {
            return Ok(());
        }
        let Some(channel) = self.channel(ctx.room_id) else {
            trace!(channel = %ctx.channel, "Message from unknown channel");
            return Ok(());
        };

        let text = Self::command_text(ctx);
        let Some(command) = self.route(&text) else {
            return Ok(());
        };

        if !command.can_use(ctx.room_id, ctx.user_id) {
            debug!(command = command.name(), user = %ctx.sending_user, "On cooldown");
            return Ok(());
        }
        if !channel.is_command_enabled(command.name()) {
            debug!(command = command.name(), channel = %ctx.channel, "Disabled in channel");
            return Ok(());
        }
        let Some(owner) = command.owner() else {
            warn!(command = command.name(), "Command owner dropped");
            return Ok(());
        };

        command.mark_used(ctx.room_id, ctx.user_id);
        self.spawn_invocation(owner, Invocation::new(command, Arc::clone(ctx), text));
        Ok(())
    }
}

impl Declare for CommandRouter {
    const NAME: &'static str = "CommandRouter";

    fn dependencies() -> Vec<ComponentId> {
        Vec::new()
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            core: deps.get::<Core>()?,
            channels: DashMap::new(),
        })
    }
}
