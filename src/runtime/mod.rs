//! Component runtime: contract, resolution, dispatch and scheduling.

mod bot;
mod component;
mod dispatch;
mod resolver;
mod scheduler;
mod state;

pub use bot::{Bot, BotBuilder};
#[cfg(test)]
pub(crate) use component::NoopComponent;
pub use component::{Component, ComponentId, Declare};
pub use dispatch::{DispatchTable, invoke_hook};
pub use resolver::Dependencies;
pub use scheduler::{Generation, Scheduler, TaskHandle};
pub use state::{RuntimeState, StateHandle};
