//! Event-type to handler fan-out.
//!
//! SETUP is awaited handler by handler in instantiation order. Every other
//! context is fire-and-forget: each handler runs in its own task, so one
//! failing or panicking handler never affects its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use tmi_proto::{Context, ContextType};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, trace, warn};

use super::component::Component;
use crate::error::HandlerResult;
use crate::telemetry::spans;

/// Ordered handler lists per context type.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<ContextType, Vec<Arc<dyn Component>>>,
}

impl DispatchTable {
    /// Scan components in instantiation order, keeping each one only for the
    /// types it declares in [`Component::handles`].
    pub fn build(components: &[Arc<dyn Component>]) -> Self {
        let mut handlers: HashMap<ContextType, Vec<Arc<dyn Component>>> = HashMap::new();
        for component in components {
            let mut kinds = component.handles().to_vec();
            kinds.sort();
            kinds.dedup();
            for kind in kinds {
                handlers.entry(kind).or_default().push(Arc::clone(component));
            }
        }

        for kind in ContextType::ALL {
            let count = handlers.get(&kind).map_or(0, Vec::len);
            debug!(kind = %kind, handlers = count, "Dispatch table entry");
        }

        Self { handlers }
    }

    pub fn handlers(&self, kind: ContextType) -> &[Arc<dyn Component>] {
        self.handlers.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn handler_names(&self, kind: ContextType) -> Vec<&'static str> {
        self.handlers(kind).iter().map(|c| c.name()).collect()
    }

    /// Run every SETUP handler to completion, in order.
    ///
    /// A failing handler is logged and the rest still run.
    pub async fn run_setup(&self) {
        let ctx = Context::Setup;
        for component in self.handlers(ContextType::Setup) {
            let span = spans::dispatch(ContextType::Setup.as_str(), component.name());
            let result = invoke_hook(component.as_ref(), &ctx)
                .instrument(span)
                .await;
            log_failure(component.name(), ContextType::Setup, result);
        }
    }

    /// Schedule one task per handler and return without waiting for them.
    pub fn dispatch(&self, ctx: Context) -> Vec<JoinHandle<()>> {
        let kind = ctx.kind();
        if kind == ContextType::Setup {
            warn!("SETUP contexts run through run_setup, ignoring");
            return Vec::new();
        }

        let handlers = self.handlers(kind);
        if handlers.is_empty() {
            trace!(kind = %kind, "No handlers");
            return Vec::new();
        }

        handlers
            .iter()
            .map(|component| {
                let component = Arc::clone(component);
                let ctx = ctx.clone();
                let span = spans::dispatch(kind.as_str(), component.name());
                tokio::spawn(
                    async move {
                        let result = invoke_hook(component.as_ref(), &ctx).await;
                        log_failure(component.name(), kind, result);
                    }
                    .instrument(span),
                )
            })
            .collect()
    }
}

/// Call the hook matching `ctx` on `component`.
pub async fn invoke_hook(component: &dyn Component, ctx: &Context) -> HandlerResult {
    match ctx {
        Context::Message(msg) => component.on_message(msg).await,
        Context::Join(membership) => component.on_join(membership).await,
        Context::Part(membership) => component.on_part(membership).await,
        Context::UserState(state) => component.on_user_state(state).await,
        Context::RoomState(state) => component.on_room_state(state).await,
        Context::Connected => component.on_connected().await,
        Context::Reconnect => component.on_reconnect().await,
        Context::Setup => component.on_setup().await,
        Context::Update => component.on_update().await,
        Context::ServerControl(req) => component.on_server_msg(req).await,
        Context::Unknown(unknown) => {
            trace!(kind = %unknown.kind, "Unknown context has no hook");
            Ok(())
        }
    }
}

fn log_failure(component: &'static str, kind: ContextType, result: HandlerResult) {
    if let Err(e) = result {
        error!(
            component,
            kind = %kind,
            code = e.error_code(),
            error = %e,
            "Handler failed"
        );
    }
}
