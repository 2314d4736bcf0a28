//! Bot assembly and top-level run loop.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tmi_proto::{Context, ContextType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::component::{Component, ComponentId, Declare};
use super::dispatch::DispatchTable;
use super::resolver::{Built, Registration, resolve_graph};
use super::state::RuntimeState;
use crate::bots::Core;
use crate::error::ResolveError;
use crate::network::{ConnectionManager, ControlListener};

/// Collects component types before resolution.
pub struct BotBuilder {
    core: Arc<Core>,
    registrations: Vec<Registration>,
}

impl BotBuilder {
    pub fn new(core: Core) -> Self {
        Self {
            core: Arc::new(core),
            registrations: Vec::new(),
        }
    }

    /// Add a component type. Order only matters between components that do
    /// not depend on each other.
    pub fn register<T: Declare>(mut self) -> Self {
        self.registrations.push(Registration::of::<T>());
        self
    }

    /// Build every component, merge their commands and derive the dispatch
    /// table. Fails fast on a missing dependency or a cycle.
    pub fn resolve(self) -> Result<Bot, ResolveError> {
        let names: Vec<&'static str> = self.registrations.iter().map(|r| r.id().name).collect();
        debug!(components = ?names, "Resolving components");

        let root = Built::new(
            ComponentId::new::<Core>(Core::NAME),
            Vec::new(),
            Arc::clone(&self.core),
        );
        let resolved = resolve_graph(root, self.registrations, self.core.commands())?;

        let order: Vec<&'static str> = resolved.components.iter().map(|c| c.name()).collect();
        info!(
            order = ?order,
            commands = self.core.commands().len(),
            "Components resolved"
        );

        Ok(Bot {
            core: self.core,
            components: resolved.components,
            typed: resolved.typed,
            dispatch: Arc::new(resolved.dispatch),
        })
    }
}

/// A resolved bot, ready to run.
pub struct Bot {
    core: Arc<Core>,
    components: Vec<Arc<dyn Component>>,
    typed: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    dispatch: Arc<DispatchTable>,
}

impl Bot {
    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// Component names in instantiation order, root first.
    pub fn instantiation_order(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Typed handle to a resolved component.
    pub fn component<T: Component>(&self) -> Option<Arc<T>> {
        let typed = self.typed.get(&TypeId::of::<T>())?;
        Arc::clone(typed).downcast::<T>().ok()
    }

    pub fn handler_names(&self, kind: ContextType) -> Vec<&'static str> {
        self.dispatch.handler_names(kind)
    }

    pub fn dispatch_table(&self) -> &Arc<DispatchTable> {
        &self.dispatch
    }

    /// Run SETUP, then connect and dispatch until `shutdown` fires.
    ///
    /// SETUP handlers complete before the first connection attempt, so no
    /// tick or chat context is dispatched before hydration.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let config = self.core.config();
        let (queue_tx, mut queue_rx) = mpsc::channel::<Context>(config.connection.queue_capacity.max(1));

        if config.control.enabled {
            let listener = ControlListener::bind(&config.control.listen, queue_tx.clone()).await?;
            tokio::spawn(listener.run(shutdown.child_token()));
        }

        info!("Running setup");
        self.dispatch.run_setup().await;

        let dispatch = Arc::clone(&self.dispatch);
        let consumer = tokio::spawn(async move {
            while let Some(ctx) = queue_rx.recv().await {
                dispatch.dispatch(ctx);
            }
        });

        ConnectionManager::new(Arc::clone(&self.core), queue_tx)
            .run(shutdown.clone())
            .await;

        shutdown.cancel();
        self.core.scheduler().shutdown();
        self.core.state().set(RuntimeState::Stopped);
        consumer.abort();
        info!("Bot stopped");
        Ok(())
    }
}
