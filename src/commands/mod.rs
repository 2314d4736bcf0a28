//! Chat command registry, cooldowns and argument handling.

mod invocation;
mod table;

pub use invocation::{Args, Invocation};
pub use table::{CallableCommand, CommandArg, CommandSet, CommandSpec, CommandTable, Cooldown};
