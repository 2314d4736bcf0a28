//! Reminders.
//!
//! New reminders are scheduled as soon as they are stored. Reminders loaded
//! at setup wait for the bot to join their channel so the delivery has a
//! lane to go out on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tmi_proto::{ContextType, MembershipContext};
use tracing::{debug, error, info, warn};

use super::core::Core;
use super::router::CommandRouter;
use crate::commands::{CommandArg, CommandSet, CommandSpec, Invocation};
use crate::db::Reminder;
use crate::error::{HandlerError, HandlerResult, ResolveError};
use crate::runtime::{Component, ComponentId, Declare, Dependencies};
use crate::util::format_time_length;

const MIN_REMINDER_SECS: i64 = 60;
/// Ten years.
const MAX_REMINDER_SECS: f64 = 315_360_000.0;

/// Why a `when` argument was rejected. Displayed verbatim in chat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WhenError {
    #[error("Must specify times in XX:XX format Nerdge")]
    BadClock,
    #[error("You need to link a timezone with !linktz to use time reminders")]
    NoTimezone,
    #[error("the time must end with s, m, h, d, or w Nerdge")]
    BadSuffix,
    #[error("not a valid number Nerdge")]
    BadNumber,
}

/// Seconds from `now` until `when`.
///
/// `when` is either `<number><s|m|h|d|w>` (fractions allowed) or `HH:MM`
/// in `tz`, rolling over to tomorrow when that time already passed today.
pub fn parse_when(when: &str, tz: Option<Tz>, now: DateTime<Utc>) -> Result<i64, WhenError> {
    if when.contains(':') {
        let time = NaiveTime::parse_from_str(when, "%H:%M").map_err(|_| WhenError::BadClock)?;
        let tz = tz.ok_or(WhenError::NoTimezone)?;
        let local_now = now.with_timezone(&tz);
        let mut target = tz
            .from_local_datetime(&local_now.date_naive().and_time(time))
            .earliest()
            .ok_or(WhenError::BadClock)?;
        if target <= local_now {
            target += chrono::Duration::days(1);
        }
        return Ok((target.with_timezone(&Utc) - now).num_seconds());
    }

    let suffix = when.chars().last().ok_or(WhenError::BadSuffix)?;
    let multiplier = match suffix.to_ascii_lowercase() {
        's' => 1.0,
        'm' => 60.0,
        'h' => 3600.0,
        'd' => 86_400.0,
        'w' => 604_800.0,
        _ => return Err(WhenError::BadSuffix),
    };
    let amount: f64 = when[..when.len() - suffix.len_utf8()]
        .parse()
        .map_err(|_| WhenError::BadNumber)?;
    let seconds = (amount * multiplier).round();
    if !seconds.is_finite() || seconds.abs() > MAX_REMINDER_SECS {
        return Err(WhenError::BadNumber);
    }
    Ok(seconds as i64)
}

pub struct ReminderBot {
    router: Arc<CommandRouter>,
    /// Stored reminders not yet scheduled, waiting for their channel join.
    pending: Mutex<Vec<Reminder>>,
}

impl ReminderBot {
    fn schedule(&self, reminder: Reminder) {
        let core = Arc::clone(self.router.core());
        let delay = (reminder.remind_at - Utc::now().timestamp()).max(0) as u64;
        debug!(id = reminder.id, delay, "Reminder scheduled");
        let scheduler = core.scheduler().clone();
        scheduler.call_later(Duration::from_secs(delay), deliver(core, reminder));
    }

    async fn set_reminder(&self, inv: &Invocation) -> HandlerResult {
        let core = self.router.core();
        let mut args = inv.args();
        let when = args
            .next()
            .ok_or_else(|| HandlerError::usage("Must give a time (10s, 20m, 1.5h, 3.2d, ...) Chatting"))?;

        let tz = if when.contains(':') {
            core.db()
                .timezones()
                .get(inv.user_id())
                .await?
                .and_then(|name| name.parse::<Tz>().ok())
        } else {
            None
        };
        let now = Utc::now();
        let length = parse_when(&when, tz, now).map_err(|e| HandlerError::usage(e.to_string()))?;
        if length < MIN_REMINDER_SECS {
            return Err(HandlerError::usage("Reminder must be at least a minute Nerdge"));
        }
        let remind_at = now
            .timestamp()
            .checked_add(length)
            .ok_or_else(|| HandlerError::usage(WhenError::BadNumber.to_string()))?;

        let reminder = core
            .db()
            .reminders()
            .create(
                inv.user_id(),
                inv.username(),
                inv.ctx.room_id,
                remind_at,
                &args.rest(),
            )
            .await?;
        info!(id = reminder.id, user = %inv.username(), remind_at = reminder.remind_at, "Reminder set");
        self.schedule(reminder);

        let text = format!(
            "Set reminder to occur in {} YIPPEE",
            format_time_length(length as u64)
        );
        core.reply(inv.channel(), inv.display_name(), &text).await?;
        Ok(())
    }
}

async fn deliver(core: Arc<Core>, reminder: Reminder) {
    let text = format!("@{} DinkDonk Reminder! {}", reminder.username, reminder.message);
    if let Err(e) = core.send(&reminder.channel, &text).await {
        warn!(id = reminder.id, channel = %reminder.channel, error = %e, "Reminder not delivered");
        return;
    }
    match core.db().reminders().finish(reminder.id).await {
        Ok(_) => debug!(id = reminder.id, "Reminder delivered"),
        Err(e) => error!(id = reminder.id, error = %e, "Failed to finish reminder"),
    }
}

#[async_trait]
impl Component for ReminderBot {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handles(&self) -> &'static [ContextType] {
        &[ContextType::Setup, ContextType::Join]
    }

    fn commands(&self) -> CommandSet {
        CommandSet::new().with(
            CommandSpec::new(
                "remind",
                "Set a reminder for later, with a relative or an absolute time.",
            )
            .arg(CommandArg::required(
                "when",
                "relative (90s, 20m, 1.5h, 3.2d) or absolute (20:00, needs !linktz)",
            ))
            .arg(CommandArg::optional("message", "what to remind you of"))
            .aliases(&["reminder", "remindme"]),
        )
    }

    async fn invoke(&self, inv: &Invocation) -> HandlerResult {
        match inv.command.name() {
            "remind" => self.set_reminder(inv).await,
            other => Err(HandlerError::UnknownCommand(other.to_owned())),
        }
    }

    async fn on_setup(&self) -> HandlerResult {
        let stored = self.router.core().db().reminders().list().await?;
        info!(reminders = stored.len(), "Stored reminders loaded");
        *self.pending.lock() = stored;
        Ok(())
    }

    async fn on_join(&self, ctx: &MembershipContext) -> HandlerResult {
        let core = self.router.core();
        if !ctx.user.as_deref().is_none_or(|user| core.is_self(user)) {
            return Ok(());
        }
        // hooks for one JOIN run concurrently, so don't wait on Core to open
        // the lane a due reminder goes out on
        core.sender().open(&ctx.channel);
        let due: Vec<Reminder> = {
            let mut pending = self.pending.lock();
            let (due, rest): (Vec<Reminder>, Vec<Reminder>) = std::mem::take(&mut *pending)
                .into_iter()
                .partition(|r| r.channel.eq_ignore_ascii_case(&ctx.channel));
            *pending = rest;
            due
        };
        for reminder in due {
            self.schedule(reminder);
        }
        Ok(())
    }
}

impl Declare for ReminderBot {
    const NAME: &'static str = "ReminderBot";

    fn dependencies() -> Vec<ComponentId> {
        vec![ComponentId::of::<CommandRouter>()]
    }

    fn build(deps: &Dependencies<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            router: deps.get::<CommandRouter>()?,
            pending: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_relative_units() {
        let now = at("2024-01-01T00:00:00Z");
        assert_eq!(parse_when("90s", None, now), Ok(90));
        assert_eq!(parse_when("20m", None, now), Ok(1200));
        assert_eq!(parse_when("1.5h", None, now), Ok(5400));
        assert_eq!(parse_when("2W", None, now), Ok(1_209_600));
    }

    #[test]
    fn test_relative_errors() {
        let now = at("2024-01-01T00:00:00Z");
        assert_eq!(parse_when("10x", None, now), Err(WhenError::BadSuffix));
        assert_eq!(parse_when("abcm", None, now), Err(WhenError::BadNumber));
        assert_eq!(parse_when("m", None, now), Err(WhenError::BadNumber));
    }

    #[test]
    fn test_relative_out_of_range() {
        let now = at("2024-01-01T00:00:00Z");
        assert_eq!(parse_when("1e300s", None, now), Err(WhenError::BadNumber));
        assert_eq!(parse_when("inf", None, now), Err(WhenError::BadSuffix));
        assert_eq!(parse_when("-1e20w", None, now), Err(WhenError::BadNumber));
        assert_eq!(parse_when("520w", None, now), Ok(314_496_000));
        assert_eq!(parse_when("600w", None, now), Err(WhenError::BadNumber));
    }

    #[test]
    fn test_clock_time_needs_timezone() {
        let now = at("2024-01-01T00:00:00Z");
        assert_eq!(parse_when("20:00", None, now), Err(WhenError::NoTimezone));
        assert_eq!(parse_when("1:2:3", None, now), Err(WhenError::BadClock));
    }

    #[test]
    fn test_clock_time_rolls_over() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        // 12:00 UTC is 13:00 in Berlin in winter
        let now = at("2024-01-01T12:00:00Z");
        assert_eq!(parse_when("14:00", Some(tz), now), Ok(3600));
        assert_eq!(parse_when("12:00", Some(tz), now), Ok(23 * 3600));
    }
}
