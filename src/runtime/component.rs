//! Component contract.
//!
//! A component is a unit of bot functionality. It overrides the hooks it
//! cares about and lists them in [`Component::handles`]; only listed hooks
//! enter the dispatch table, so default no-op hooks are never scheduled.

use std::any::TypeId;
use std::sync::Arc;

use async_trait::async_trait;
use tmi_proto::{
    ContextType, ControlRequest, MembershipContext, MessageContext, RoomStateContext,
    UserStateContext,
};

use super::resolver::Dependencies;
use crate::commands::{CommandSet, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};

/// Dispatch participant.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Stable name used in logs and resolution errors.
    fn name(&self) -> &'static str;

    /// Context types this component overrides a hook for.
    fn handles(&self) -> &'static [ContextType] {
        &[]
    }

    /// Commands this component answers through [`Component::invoke`].
    fn commands(&self) -> CommandSet {
        CommandSet::default()
    }

    /// Run a routed command owned by this component.
    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        Err(HandlerError::UnknownCommand(inv.command.name().to_owned()))
    }

    async fn on_setup(&self) -> HandlerResult {
        Ok(())
    }

    async fn on_update(&self) -> HandlerResult {
        Ok(())
    }

    async fn on_connected(&self) -> HandlerResult {
        Ok(())
    }

    async fn on_join(&self, _ctx: &MembershipContext) -> HandlerResult {
        Ok(())
    }

    async fn on_part(&self, _ctx: &MembershipContext) -> HandlerResult {
        Ok(())
    }

    async fn on_message(&self, _ctx: &Arc<MessageContext>) -> HandlerResult {
        Ok(())
    }

    async fn on_user_state(&self, _ctx: &UserStateContext) -> HandlerResult {
        Ok(())
    }

    async fn on_room_state(&self, _ctx: &RoomStateContext) -> HandlerResult {
        Ok(())
    }

    async fn on_reconnect(&self) -> HandlerResult {
        Ok(())
    }

    async fn on_server_msg(&self, _req: &ControlRequest) -> HandlerResult {
        Ok(())
    }
}

/// Type identity of a component, with its name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    pub(crate) type_id: TypeId,
    pub name: &'static str,
}

impl ComponentId {
    pub fn of<T: Declare>() -> Self {
        Self::new::<T>(T::NAME)
    }

    pub(crate) fn new<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }
}

/// Static declaration used by the resolver.
///
/// Dependencies are built before `build` runs and handed over through
/// [`Dependencies`]; only declared dependencies (and theirs) are reachable.
pub trait Declare: Component + Sized {
    const NAME: &'static str;

    fn dependencies() -> Vec<ComponentId> {
        Vec::new()
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError>;
}

#[cfg(test)]
pub(crate) struct NoopComponent;

#[cfg(test)]
impl Component for NoopComponent {
    fn name(&self) -> &'static str {
        "Noop"
    }
}
