//! Command registry with two-tier cooldowns.
//!
//! Every component contributes a [`CommandSet`]; the resolver merges them into
//! the one [`CommandTable`] owned by the root component. Usage maps live on
//! each [`CallableCommand`] and are only touched through
//! [`CallableCommand::mark_used`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::db::{ArgMetadata, CommandMetadata};
use crate::error::ResolveError;
use crate::runtime::Component;

/// Command-wide and per-user cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub command: Duration,
    pub user: Duration,
}

impl Cooldown {
    /// Cooldown in whole seconds.
    pub const fn new(command_secs: u64, user_secs: u64) -> Self {
        Self {
            command: Duration::from_secs(command_secs),
            user: Duration::from_secs(user_secs),
        }
    }

    /// No throttling at all.
    pub const NONE: Cooldown = Cooldown::new(0, 0);
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(3, 5)
    }
}

/// One documented argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    pub optional: bool,
    /// Switch name for `-flag value` style arguments.
    pub flag: Option<String>,
}

impl CommandArg {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            optional: false,
            flag: None,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            optional: true,
            ..Self::required(name, description)
        }
    }

    /// Optional `-flag <value>` argument.
    pub fn flag(name: &str, flag: &str, description: &str) -> Self {
        Self {
            flag: Some(flag.to_owned()),
            ..Self::optional(name, description)
        }
    }

    fn usage(&self) -> String {
        let body = match &self.flag {
            Some(flag) => format!("-{flag} <{}>", self.name),
            None => self.name.clone(),
        };
        if self.optional {
            format!("[{body}]")
        } else {
            format!("<{body}>")
        }
    }
}

/// Declarative description of a command, built with chained setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub args: Vec<CommandArg>,
    pub aliases: Vec<String>,
    pub cooldown: Cooldown,
}

impl CommandSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            description: description.to_owned(),
            args: Vec::new(),
            aliases: Vec::new(),
            cooldown: Cooldown::default(),
        }
    }

    pub fn arg(mut self, arg: CommandArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases
            .extend(aliases.iter().map(|alias| alias.to_lowercase()));
        self
    }

    pub fn cooldown(mut self, command_secs: u64, user_secs: u64) -> Self {
        self.cooldown = Cooldown::new(command_secs, user_secs);
        self
    }

    /// `name <required> [optional] [-flag <value>]`
    pub fn usage(&self) -> String {
        std::iter::once(self.name.clone())
            .chain(self.args.iter().map(CommandArg::usage))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Row mirrored to the `commands` table.
    pub fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            aliases: self.aliases.clone(),
            args: self
                .args
                .iter()
                .map(|arg| ArgMetadata {
                    name: arg.name.clone(),
                    description: arg.description.clone(),
                    optional: arg.optional,
                    flag: arg.flag.clone(),
                })
                .collect(),
        }
    }
}

/// Commands contributed by one component.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    specs: Vec<CommandSpec>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spec: CommandSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn into_specs(self) -> Vec<CommandSpec> {
        self.specs
    }
}

#[derive(Debug, Default)]
struct Usage {
    /// Last use in a channel, keyed by room id.
    by_room: HashMap<i64, Instant>,
    /// Last use by a user in a channel.
    by_user: HashMap<(i64, i64), Instant>,
}

impl Usage {
    /// Forget entries whose window has elapsed.
    fn prune(&mut self, cooldown: Cooldown, now: Instant) {
        self.by_room
            .retain(|_, used| now.duration_since(*used) < cooldown.command);
        self.by_user
            .retain(|_, used| now.duration_since(*used) < cooldown.user);
    }
}

/// A registered command bound to its owning component.
pub struct CallableCommand {
    spec: CommandSpec,
    owner: Weak<dyn Component>,
    owner_name: &'static str,
    usage: Mutex<Usage>,
}

impl CallableCommand {
    pub fn new(spec: CommandSpec, owner: Weak<dyn Component>, owner_name: &'static str) -> Self {
        Self {
            spec,
            owner,
            owner_name,
            usage: Mutex::new(Usage::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn cooldown(&self) -> Cooldown {
        self.spec.cooldown
    }

    /// Component that handles invocations, unless it has been dropped.
    pub fn owner(&self) -> Option<Arc<dyn Component>> {
        self.owner.upgrade()
    }

    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Whether both the channel and the user windows have elapsed.
    pub fn can_use(&self, room_id: i64, user_id: i64) -> bool {
        self.can_use_at(room_id, user_id, Instant::now())
    }

    pub fn can_use_at(&self, room_id: i64, user_id: i64, now: Instant) -> bool {
        let cooldown = self.spec.cooldown;
        let mut usage = self.usage.lock();
        usage.prune(cooldown, now);
        !usage.by_room.contains_key(&room_id) && !usage.by_user.contains_key(&(room_id, user_id))
    }

    /// Start both windows.
    pub fn mark_used(&self, room_id: i64, user_id: i64) {
        self.mark_used_at(room_id, user_id, Instant::now());
    }

    pub fn mark_used_at(&self, room_id: i64, user_id: i64, now: Instant) {
        let mut usage = self.usage.lock();
        usage.by_room.insert(room_id, now);
        usage.by_user.insert((room_id, user_id), now);
    }

    /// Live usage entries, channel plus user.
    pub fn tracked(&self) -> usize {
        let usage = self.usage.lock();
        usage.by_room.len() + usage.by_user.len()
    }
}

impl std::fmt::Debug for CallableCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableCommand")
            .field("name", &self.spec.name)
            .field("owner", &self.owner_name)
            .field("cooldown", &self.spec.cooldown)
            .finish()
    }
}

#[derive(Default)]
struct TableInner {
    /// Registration order, for help listings and metadata sync.
    commands: Vec<Arc<CallableCommand>>,
    /// Lowercased name or alias to command.
    index: HashMap<String, Arc<CallableCommand>>,
}

/// All commands known to the bot.
#[derive(Default)]
pub struct CommandTable {
    inner: RwLock<TableInner>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one command. Names and aliases share one namespace.
    pub fn register(&self, command: CallableCommand) -> Result<Arc<CallableCommand>, ResolveError> {
        let mut inner = self.inner.write();
        let keys: Vec<String> = std::iter::once(command.spec.name.clone())
            .chain(command.spec.aliases.iter().cloned())
            .collect();

        for key in &keys {
            if let Some(existing) = inner.index.get(key) {
                return Err(ResolveError::CommandConflict {
                    name: key.clone(),
                    first: existing.owner_name,
                    second: command.owner_name,
                });
            }
        }

        let command = Arc::new(command);
        for key in keys {
            inner.index.insert(key, Arc::clone(&command));
        }
        inner.commands.push(Arc::clone(&command));
        debug!(command = %command.spec.name, owner = command.owner_name, "Registered command");
        Ok(command)
    }

    /// Register every command of one component.
    pub fn merge(
        &self,
        set: CommandSet,
        owner: Weak<dyn Component>,
        owner_name: &'static str,
    ) -> Result<(), ResolveError> {
        for spec in set.into_specs() {
            self.register(CallableCommand::new(spec, owner.clone(), owner_name))?;
        }
        Ok(())
    }

    /// Case-insensitive lookup by name or alias.
    pub fn lookup(&self, token: &str) -> Option<Arc<CallableCommand>> {
        self.inner.read().index.get(&token.to_lowercase()).cloned()
    }

    /// Commands in registration order.
    pub fn commands(&self) -> Vec<Arc<CallableCommand>> {
        self.inner.read().commands.clone()
    }

    pub fn metadata(&self) -> Vec<CommandMetadata> {
        self.inner
            .read()
            .commands
            .iter()
            .map(|command| command.spec.metadata())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orphan(spec: CommandSpec, owner_name: &'static str) -> CallableCommand {
        let owner: Weak<dyn Component> = Weak::<crate::runtime::NoopComponent>::new();
        CallableCommand::new(spec, owner, owner_name)
    }

    #[test]
    fn test_default_cooldown() {
        assert_eq!(Cooldown::default(), Cooldown::new(3, 5));
        let spec = CommandSpec::new("remind", "Set a reminder");
        assert_eq!(spec.cooldown, Cooldown::new(3, 5));
    }

    #[test]
    fn test_usage_string() {
        let spec = CommandSpec::new("remind", "Set a reminder")
            .arg(CommandArg::required("when", "time"))
            .arg(CommandArg::optional("message", "text"));
        assert_eq!(spec.usage(), "remind <when> [message]");

        let spec = CommandSpec::new("leaderboard", "Top users")
            .arg(CommandArg::flag("count", "n", "rows"));
        assert_eq!(spec.usage(), "leaderboard [-n <count>]");
    }

    #[test]
    fn test_lookup_by_alias_any_case() {
        let table = CommandTable::new();
        table
            .register(orphan(
                CommandSpec::new("remind", "").aliases(&["reminder", "RemindMe"]),
                "ReminderBot",
            ))
            .unwrap();

        assert_eq!(table.lookup("REMIND").unwrap().name(), "remind");
        assert_eq!(table.lookup("remindme").unwrap().name(), "remind");
        assert!(table.lookup("rem").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_alias_conflict() {
        let table = CommandTable::new();
        table
            .register(orphan(CommandSpec::new("lb", ""), "A"))
            .unwrap();
        let err = table
            .register(orphan(
                CommandSpec::new("leaderboard", "").aliases(&["lb"]),
                "B",
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::CommandConflict { ref name, first: "A", second: "B" } if name == "lb"
        ));
        assert!(table.lookup("leaderboard").is_none());
    }

    #[test]
    fn test_cooldown_windows() {
        let command = orphan(CommandSpec::new("rps", "").cooldown(2, 4), "RpsBot");
        let t0 = Instant::now();

        assert!(command.can_use_at(19, 42, t0));
        command.mark_used_at(19, 42, t0);

        // channel window blocks everyone
        assert!(!command.can_use_at(19, 7, t0 + Duration::from_millis(1999)));
        assert!(command.can_use_at(19, 7, t0 + Duration::from_secs(2)));
        // user window is longer
        assert!(!command.can_use_at(19, 42, t0 + Duration::from_secs(3)));
        assert!(command.can_use_at(19, 42, t0 + Duration::from_secs(4)));
        // other channels are independent
        assert!(command.can_use_at(20, 42, t0));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let command = orphan(CommandSpec::new("x", "").cooldown(0, 0), "X");
        let t0 = Instant::now();
        command.mark_used_at(1, 1, t0);
        assert!(command.can_use_at(1, 1, t0));
    }

    #[test]
    fn test_elapsed_entries_pruned() {
        let command = orphan(CommandSpec::new("x", "").cooldown(1, 1), "X");
        let t0 = Instant::now();
        for user in 0..10 {
            command.mark_used_at(1, user, t0);
        }
        assert_eq!(command.tracked(), 11);
        assert!(command.can_use_at(1, 0, t0 + Duration::from_secs(1)));
        assert_eq!(command.tracked(), 0);
    }

    #[test]
    fn test_metadata() {
        let spec = CommandSpec::new("give", "Give money")
            .arg(CommandArg::required("user", "recipient"))
            .arg(CommandArg::required("amount", "how much"));
        let meta = spec.metadata();
        assert_eq!(meta.name, "give");
        assert_eq!(meta.args.len(), 2);
        assert!(!meta.args[0].optional);
    }
}
