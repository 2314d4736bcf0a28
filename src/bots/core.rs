//! Root component.
//!
//! Owns every shared service: configuration, database, the outbound writer
//! slot, the paced sender, the command table, the scheduler and the runtime
//! state. It is instantiated first and is reachable from every component.

use std::sync::Arc;

use async_trait::async_trait;
use tmi_proto::{ContextType, MembershipContext, UserStateContext, outbound};
use tracing::{debug, info};

use crate::commands::CommandTable;
use crate::config::Config;
use crate::db::Database;
use crate::error::{HandlerResult, SendError};
use crate::runtime::{Component, RuntimeState, Scheduler, StateHandle};
use crate::sender::{MessageSender, Outbound};

pub struct Core {
    config: Arc<Config>,
    db: Database,
    outbound: Outbound,
    sender: MessageSender,
    commands: Arc<CommandTable>,
    scheduler: Scheduler,
    state: StateHandle,
}

impl Core {
    pub const NAME: &'static str = "Core";

    pub fn new(config: Config, db: Database) -> Self {
        let outbound = Outbound::new();
        let sender = MessageSender::new(
            outbound.clone(),
            &config.identity.username,
            config.rate_limit.clone(),
        );
        Self {
            config: Arc::new(config),
            db,
            outbound,
            sender,
            commands: Arc::new(CommandTable::new()),
            scheduler: Scheduler::new(),
            state: StateHandle::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn sender(&self) -> &MessageSender {
        &self.sender
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// The bot's own login.
    pub fn username(&self) -> &str {
        &self.config.identity.username
    }

    pub fn is_self(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(self.username())
    }

    /// Paced chat send; returns the chunks written.
    pub async fn send(&self, channel: &str, text: &str) -> Result<Vec<String>, SendError> {
        self.sender.send(channel, text).await
    }

    /// Send `@<name> <text>`.
    pub async fn reply(&self, channel: &str, name: &str, text: &str) -> Result<(), SendError> {
        self.sender.send(channel, &format!("@{name} {text}")).await?;
        Ok(())
    }

    pub async fn join(&self, channel: &str) -> Result<(), SendError> {
        info!(channel = %channel, "Joining");
        self.outbound.send_line(outbound::join(channel)).await
    }

    pub async fn part(&self, channel: &str) -> Result<(), SendError> {
        info!(channel = %channel, "Parting");
        self.outbound.send_line(outbound::part(channel)).await
    }

    pub async fn request_capabilities(&self) -> Result<(), SendError> {
        let caps = &self.config.connection.capabilities;
        if caps.is_empty() {
            return Ok(());
        }
        self.outbound.send_line(outbound::cap_req(caps)).await
    }

    /// A membership event about the bot itself. Without the membership
    /// capability Twitch only reports our own JOIN/PART.
    fn is_own_membership(&self, ctx: &MembershipContext) -> bool {
        ctx.user.as_deref().is_none_or(|user| self.is_self(user))
    }
}

#[async_trait]
impl Component for Core {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[
            ContextType::Setup,
            ContextType::Join,
            ContextType::Part,
            ContextType::UserState,
            ContextType::Reconnect,
        ]
    }

    async fn on_setup(&self) -> HandlerResult {
        info!(
            username = %self.username(),
            commands = self.commands.len(),
            "Bot setup"
        );
        Ok(())
    }

    async fn on_join(&self, ctx: &MembershipContext) -> HandlerResult {
        if self.is_own_membership(ctx) {
            self.sender.open(&ctx.channel);
        }
        Ok(())
    }

    async fn on_part(&self, ctx: &MembershipContext) -> HandlerResult {
        if self.is_own_membership(ctx) {
            self.sender.close(&ctx.channel);
        }
        Ok(())
    }

    async fn on_user_state(&self, ctx: &UserStateContext) -> HandlerResult {
        // USERSTATE always describes the bot; the flag can go stale until the
        // next USERSTATE for the channel
        let privileged = ctx.is_privileged();
        debug!(channel = %ctx.channel, privileged, "Own user state");
        self.sender.open(&ctx.channel);
        self.sender.set_privileged(&ctx.channel, privileged);
        Ok(())
    }

    async fn on_reconnect(&self) -> HandlerResult {
        self.state.set(RuntimeState::Reconnect);
        Ok(())
    }
}
