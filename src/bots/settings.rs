//! Per-user boolean settings.

use std::sync::Arc;

use async_trait::async_trait;

use super::router::CommandRouter;
use crate::commands::{Args, CommandArg, CommandSet, CommandSpec, Invocation};
use crate::db::UserSetting;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};

pub struct SettingsBot {
    router: Arc<CommandRouter>,
}

/// Parse `<setting> <on|off>`.
pub fn parse_toggle(mut args: Args) -> Result<(UserSetting, bool), HandlerError> {
    let (Some(name), Some(value)) = (args.next(), args.next()) else {
        return Err(HandlerError::usage(
            "You must provide a setting name and either on or off",
        ));
    };
    let setting: UserSetting = name.parse().map_err(|()| {
        let names: Vec<&str> = UserSetting::ALL.iter().map(|s| s.column()).collect();
        HandlerError::usage(format!(
            "That's not a valid setting name. The settings consist of the following: {}",
            names.join(", ")
        ))
    })?;
    let enabled = match value.to_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(HandlerError::usage("You must specify 'on' or 'off'")),
    };
    Ok((setting, enabled))
}

#[async_trait]
impl Component for SettingsBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new().with(
            CommandSpec::new("toggle", "Turn one of your settings on or off")
                .arg(CommandArg::required(
                    "setting",
                    "can_receive_money or auto_remove_afk",
                ))
                .arg(CommandArg::required("value", "on or off")),
        )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        if inv.command.name() != "toggle" {
            return Err(HandlerError::UnknownCommand(inv.command.name().to_owned()));
        }
        let (setting, enabled) = parse_toggle(inv.args())?;

        let core = self.router.core();
        let users = core.db().users();
        users.ensure(inv.user_id(), inv.username()).await?;
        users.set_setting(inv.user_id(), setting, enabled).await?;

        let text = format!(
            "The {setting} setting has been turned {}.",
            if enabled { "on" } else { "off" }
        );
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

impl Declare for SettingsBot {
    const NAME: &'static str = "SettingsBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Args {
        Args::new(words.iter().map(|w| w.to_string()))
    }

    #[test]
    fn test_parse_toggle() {
        let (setting, on) = parse_toggle(args(&["auto_remove_afk", "OFF"])).unwrap();
        assert_eq!(setting, UserSetting::AutoRemoveAfk);
        assert!(!on);
    }

    #[test]
    fn test_parse_toggle_errors() {
        let missing = parse_toggle(args(&["auto_remove_afk"])).unwrap_err();
        assert_eq!(
            missing.user_reply(),
            Some("You must provide a setting name and either on or off")
        );

        let bad_name = parse_toggle(args(&["volume", "on"])).unwrap_err();
        assert!(bad_name.user_reply().unwrap().contains("can_receive_money"));

        let bad_value = parse_toggle(args(&["can_receive_money", "maybe"])).unwrap_err();
        assert_eq!(bad_value.user_reply(), Some("You must specify 'on' or 'off'"));
    }
}
