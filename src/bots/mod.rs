//! Components shipped with the bot.
//!
//! [`Core`] is the root every component can reach. [`CommandRouter`] turns
//! chat messages into command invocations; the feature components only
//! contribute commands and hooks on top of it.

mod afk;
mod bomb_party;
mod control;
mod core;
mod guess;
mod help;
mod pull;
mod reminder;
mod router;
mod rps;
mod scramble;
mod settings;
mod timezone;
mod user_data;

pub use afk::AfkBot;
pub use bomb_party::{
    BombPartyBot, Dictionary, Difficulty, Game, Letters, SettingError, Settings, WordError,
};
pub use control::ControlBot;
pub use self::core::Core;
pub use guess::GuessBot;
pub use help::HelpBot;
pub use pull::{PullBot, Rarity, reset as reset_pity, roll as roll_pull};
pub use reminder::{ReminderBot, WhenError, parse_when};
pub use router::{ChannelChange, CommandRouter};
pub use rps::{Move, RpsBot};
pub use scramble::{ScrambleBot, payout, scramble_word};
pub use settings::{SettingsBot, parse_toggle};
pub use timezone::TimezoneBot;
pub use user_data::UserDataBot;

use crate::runtime::BotBuilder;

/// Register every shipped component. Registration order does not matter;
/// dependencies are resolved by the builder.
pub fn register_all(builder: BotBuilder) -> BotBuilder {
    builder
        .register::<CommandRouter>()
        .register::<ControlBot>()
        .register::<HelpBot>()
        .register::<AfkBot>()
        .register::<ReminderBot>()
        .register::<SettingsBot>()
        .register::<UserDataBot>()
        .register::<RpsBot>()
        .register::<GuessBot>()
        .register::<TimezoneBot>()
        .register::<ScrambleBot>()
        .register::<PullBot>()
        .register::<BombPartyBot>()
}
