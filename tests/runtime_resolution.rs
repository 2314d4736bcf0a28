//! Resolving the shipped component set and custom additions.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{config, database};
use offlinechatbot::bots::{self, CommandRouter, Core, HelpBot, ScrambleBot};
use offlinechatbot::commands::{CommandSet, CommandSpec, Invocation};
use offlinechatbot::error::{HandlerResult, ResolveError};
use offlinechatbot::runtime::{BotBuilder, Component, ComponentId, Declare, Dependencies};
use tmi_proto::ContextType;

async fn core() -> Core {
    Core::new(config("127.0.0.1:1"), database().await)
}

#[tokio::test]
async fn test_shipped_components_resolve() {
    let bot = bots::register_all(BotBuilder::new(core().await))
        .resolve()
        .unwrap();

    let order = bot.instantiation_order();
    assert_eq!(order[0], "Core");
    assert_eq!(order[1], "CommandRouter");
    assert_eq!(order.len(), 14);

    let commands = bot.core().commands();
    for token in [
        "remind", "remindme", "rafk", "lb", "balance", "utime", "usertime", "hint", "pull", "pity",
        "bombparty", "bomb_party", "join", "settings",
    ] {
        assert!(commands.lookup(token).is_some(), "{token} not routed");
    }
    assert_eq!(commands.lookup("RAFK").unwrap().name(), "removeafk");
    assert_eq!(
        commands.lookup("rps").unwrap().cooldown().user,
        std::time::Duration::from_secs(4)
    );
}

#[tokio::test]
async fn test_handlers_only_for_overridden_hooks() {
    let bot = bots::register_all(BotBuilder::new(core().await))
        .resolve()
        .unwrap();

    assert_eq!(bot.handler_names(ContextType::Connected), ["CommandRouter"]);
    assert_eq!(bot.handler_names(ContextType::Reconnect), ["Core"]);
    let control = bot.handler_names(ContextType::ServerControl);
    assert!(control.contains(&"ControlBot"));
    assert!(control.contains(&"AfkBot"));
    assert!(bot.handler_names(ContextType::RoomState).is_empty());
    assert!(!bot.handler_names(ContextType::Message).contains(&"HelpBot"));
}

#[tokio::test]
async fn test_registration_order_irrelevant() {
    let bot = BotBuilder::new(core().await)
        .register::<ScrambleBot>()
        .register::<HelpBot>()
        .register::<CommandRouter>()
        .resolve()
        .unwrap();
    assert_eq!(
        bot.instantiation_order(),
        ["Core", "CommandRouter", "ScrambleBot", "HelpBot"]
    );
}

#[tokio::test]
async fn test_missing_dependency_fails_fast() {
    let err = BotBuilder::new(core().await)
        .register::<HelpBot>()
        .resolve()
        .err()
        .expect("resolution fails");
    match err {
        ResolveError::MissingDependency {
            component,
            dependency,
        } => {
            assert_eq!(component, "HelpBot");
            assert_eq!(dependency, "CommandRouter");
        }
        other => panic!("unexpected error {other}"),
    }
}

/// A third-party component claiming a command name already taken.
struct Impostor;

#[async_trait]
impl Component for Impostor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new().with(CommandSpec::new("bank", "not a balance").aliases(&["bal"]))
    }

    async fn invoke(&self, _inv: &Invocation) -> HandlerResult {
        Ok(())
    }
}

impl Declare for Impostor {
    const NAME: &'static str = "Impostor";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        let _router: Arc<CommandRouter> = deps.get()?;
        Ok(Self)
    }
}

#[tokio::test]
async fn test_command_conflict_rejected() {
    let err = bots::register_all(BotBuilder::new(core().await))
        .register::<Impostor>()
        .resolve()
        .err()
        .expect("resolution fails");
    assert!(
        matches!(err, ResolveError::CommandConflict { ref name, .. } if name == "bal"),
        "unexpected error {err}"
    );
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let err = BotBuilder::new(core().await)
        .register::<CommandRouter>()
        .register::<CommandRouter>()
        .resolve()
        .err()
        .expect("resolution fails");
    assert!(matches!(err, ResolveError::Duplicate("CommandRouter")));
}
