//! Control channel commands that touch channel membership.

use std::sync::Arc;

use async_trait::async_trait;
use tmi_proto::{ContextType, ControlCommand, ControlRequest};
use tracing::{info, warn};

use super::router::{ChannelChange, CommandRouter};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

pub struct ControlBot {
    router: Arc<CommandRouter>,
}

impl ControlBot {
    /// Reload channel row `id` and join or part as needed.
    pub async fn refresh_channel(&self, id: i64) -> Result<ChannelChange, HandlerError> {
        let core = self.router.core();
        let record = core.db().channels().get(id).await?;
        let change = self.router.apply_channel(id, record);

        match &change {
            ChannelChange::Join(name) => core.join(name).await?,
            ChannelChange::Part(name) => core.part(name).await?,
            ChannelChange::Renamed { old, new } => {
                core.part(old).await?;
                core.join(new).await?;
            }
            ChannelChange::Updated(name) => info!(channel = %name, "Channel config updated"),
            ChannelChange::Unchanged => {}
        }
        Ok(change)
    }
}

#[async_trait]
impl Component for ControlBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[ContextType::ServerControl]
    }

    async fn on_server_msg(&self, req: &ControlRequest) -> HandlerResult {
        if req.command != ControlCommand::RefreshChannel {
            return Ok(());
        }
        let Some(id) = req.int_param("channel_id") else {
            warn!(client = %req.client_id, "REFRESH_CHANNEL without channel_id");
            return Err(HandlerError::Internal("missing channel_id".into()));
        };
        let change = self.refresh_channel(id).await?;
        info!(client = %req.client_id, channel_id = id, change = ?change, "Channel refreshed");
        Ok(())
    }
}

impl Declare for ControlBot {
    const NAME: &'static str = "ControlBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
        })
    }
}
