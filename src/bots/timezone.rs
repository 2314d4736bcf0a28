//! Linked timezones and `utime`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::{TZ_VARIANTS, Tz};

use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};
use crate::util::normalize_username;

const VALID_TZ_URL: &str = "https://en.wikipedia.org/wiki/List_of_tz_database_time_zones";

pub struct TimezoneBot {
    router: Arc<CommandRouter>,
    /// Current abbreviation (`CET`, `PST`) to the first zone using it.
    abbreviations: HashMap<String, Tz>,
}

/// Abbreviation index as of `now`.
fn abbreviation_index(now: DateTime<Utc>) -> HashMap<String, Tz> {
    let mut index = HashMap::new();
    for tz in TZ_VARIANTS {
        let abbr = now.with_timezone(&tz).format("%Z").to_string();
        if abbr.chars().all(|c| c.is_ascii_alphabetic()) {
            index.entry(abbr).or_insert(tz);
        }
    }
    index
}

impl TimezoneBot {
    /// Resolve a zone name case-insensitively, or an abbreviation.
    pub fn lookup(&self, input: &str) -> Option<Tz> {
        let input = input.trim();
        TZ_VARIANTS
            .iter()
            .copied()
            .find(|tz| tz.name().eq_ignore_ascii_case(input))
            .or_else(|| self.abbreviations.get(&input.to_uppercase()).copied())
    }

    async fn link(&self, inv: &Invocation) -> HandlerResult {
        let arg = inv
            .args()
            .next()
            .ok_or_else(|| HandlerError::usage("Please specify a timezone to link."))?;
        let tz = self.lookup(&arg).ok_or_else(|| {
            HandlerError::usage(
                "That's not a valid timezone. For setting the tz by UTC or GMT, as an example: \
                 UTC+5 would be Etc/GMT-5. Do !validtz if you are having trouble.",
            )
        })?;

        let core = self.router.core();
        core.db()
            .timezones()
            .set(inv.user_id(), inv.username(), tz.name())
            .await?;
        core.reply(inv.channel(), inv.display_name(), "Timezone has been linked!")
            .await?;
        Ok(())
    }

    async fn user_time(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let username = inv
            .args()
            .next()
            .map(|name| normalize_username(&name))
            .unwrap_or_else(|| inv.username().to_owned());
        let is_self = username.eq_ignore_ascii_case(inv.username());

        let user = core
            .db()
            .users()
            .find_by_username(&username)
            .await?
            .ok_or_else(|| HandlerError::usage(format!("{username} is not in the database")))?;
        let tz = core
            .db()
            .timezones()
            .get(user.id)
            .await?
            .and_then(|name| name.parse::<Tz>().ok())
            .ok_or_else(|| {
                let who = if is_self { "You have" } else { "This user has" };
                HandlerError::usage(format!(
                    "{who} not linked a timezone, which can be done with !linktz"
                ))
            })?;

        let local = Utc::now().with_timezone(&tz);
        let text = format!("Time for {username}: {}", local.format("%H:%M (%Z)"));
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

#[async_trait]
impl Component for TimezoneBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new()
            .with(CommandSpec::new(
                "validtz",
                "Where to find a valid timezone name for !linktz",
            ))
            .with(
                CommandSpec::new("linktz", "Link a timezone to yourself, used by !utime")
                    .arg(CommandArg::required(
                        "timezone",
                        "Continent/City format works best; see !validtz",
                    ))
                    .cooldown(0, 3),
            )
            .with(
                CommandSpec::new("utime", "What time it is for a user with a linked timezone")
                    .arg(CommandArg::optional("user", "empty for yourself"))
                    .aliases(&["usertime"])
                    .cooldown(1, 1),
            )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "validtz" => {
                let text = format!(
                    "Having trouble linking your timezone? Use a name from the TZ identifier column: {VALID_TZ_URL}"
                );
                self.router
                    .core()
                    .reply(inv.channel(), inv.display_name(), &text)
                    .await?;
                Ok(())
            }
            "linktz" => self.link(inv).await,
            "utime" => self.user_time(inv).await,
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }
}

impl Declare for TimezoneBot {
    const NAME: &'static str = "TimezoneBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            abbreviations: abbreviation_index(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_index() {
        let winter = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let index = abbreviation_index(winter);
        let cet = index.get("CET").expect("CET indexed");
        assert_eq!(winter.with_timezone(cet).format("%Z").to_string(), "CET");
        assert!(!index.contains_key("+05"));
    }
}
