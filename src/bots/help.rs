//! `help` and `sourcecode`.

use std::sync::Arc;

use async_trait::async_trait;

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

const SOURCE_URL: &str = "https://github.com/Sheppsu/offlinechatbot";

pub struct HelpBot {
    router: Arc<CommandRouter>,
}

impl HelpBot {
    /// Reply text for `help [command]`.
    pub fn help_text(&self, query: Option<&str>) -> Result<String, HandlerError> {
        let core = self.router.core();
        let prefix = &core.config().commands.prefix;

        let Some(query) = query else {
            let mut names: Vec<String> = core
                .commands()
                .commands()
                .iter()
                .map(|c| c.name().to_owned())
                .collect();
            names.sort();
            names.dedup();
            return Ok(format!(
                "Commands: {}. Use {prefix}help <command> for details.",
                names.join(", ")
            ));
        };

        let token = query.trim_start_matches(prefix.as_str());
        let command = core
            .commands()
            .lookup(token)
            .ok_or_else(|| HandlerError::usage(format!("No command named {token}")))?;
        let spec = command.spec();

        let mut text = format!("{prefix}{}: {}", spec.usage(), spec.description);
        if !spec.aliases.is_empty() {
            text.push_str(&format!(" (aliases: {})", spec.aliases.join(", ")));
        }
        Ok(text)
    }
}

#[async_trait]
impl Component for HelpBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(
                CommandSpec::new("help", "List commands or describe one")
                    .arg(CommandArg::optional("command", "command to describe"))
                    .aliases(&["commands"]),
            )
            .with(
                CommandSpec::new("sourcecode", "Link to the bot's source code")
                    .aliases(&["github", "source"]),
            )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let text = match inv.command.name() {
            "help" => self.help_text(inv.args().next().as_deref())?,
            "sourcecode" => SOURCE_URL.to_owned(),
            other => return Err(HandlerError::UnknownCommand(other.to_owned())),
        };
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

impl Declare for HelpBot {
    const NAME: &'static str = "HelpBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
        })
    }
}
