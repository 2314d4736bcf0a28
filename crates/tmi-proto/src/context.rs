//! Typed events produced from the wire (and from the runtime itself).
//!
//! A [`Context`] is the unit of dispatch. Wire events are built by
//! [`crate::parse`]; `Setup`, `Update` and `ServerControl` are synthesized
//! by the bot runtime and never appear on the wire.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::control::ControlRequest;
use crate::tags::{parse_badges, Badge, Tags};

/// Discriminant used for dispatch lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextType {
    /// `PRIVMSG`
    Message,
    /// `JOIN`
    Join,
    /// `PART`
    Part,
    /// `USERSTATE`
    UserState,
    /// `ROOMSTATE`
    RoomState,
    /// `376`, end of the login banner.
    Connected,
    /// `RECONNECT`, the server is about to drop us.
    Reconnect,
    /// One-shot startup hydration, runtime generated.
    Setup,
    /// Periodic tick, runtime generated.
    Update,
    /// Out-of-band command from the control channel.
    ServerControl,
    /// Any other wire type.
    Unknown,
}

impl ContextType {
    /// Every variant, in declaration order.
    pub const ALL: [ContextType; 11] = [
        Self::Message,
        Self::Join,
        Self::Part,
        Self::UserState,
        Self::RoomState,
        Self::Connected,
        Self::Reconnect,
        Self::Setup,
        Self::Update,
        Self::ServerControl,
        Self::Unknown,
    ];

    /// Map a wire type token. Synthetic types never match.
    pub fn from_wire(token: &str) -> Option<Self> {
        Some(match token {
            "PRIVMSG" => Self::Message,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "USERSTATE" => Self::UserState,
            "ROOMSTATE" => Self::RoomState,
            "376" => Self::Connected,
            "RECONNECT" => Self::Reconnect,
            _ => return None,
        })
    }

    /// Stable name, the wire token for wire types.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "PRIVMSG",
            Self::Join => "JOIN",
            Self::Part => "PART",
            Self::UserState => "USERSTATE",
            Self::RoomState => "ROOMSTATE",
            Self::Connected => "376",
            Self::Reconnect => "RECONNECT",
            Self::Setup => "SETUP",
            Self::Update => "UPDATE",
            Self::ServerControl => "SERVER_MSG",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the wire form carries a `#channel` argument.
    pub fn has_channel(self) -> bool {
        matches!(
            self,
            Self::Message | Self::Join | Self::Part | Self::UserState | Self::RoomState
        )
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed protocol or runtime event.
#[derive(Clone, Debug)]
pub enum Context {
    /// A chat message.
    Message(Arc<MessageContext>),
    /// Someone (usually the bot) joined a channel.
    Join(MembershipContext),
    /// Someone (usually the bot) left a channel.
    Part(MembershipContext),
    /// The bot's own state in a channel.
    UserState(UserStateContext),
    /// Channel moderation settings.
    RoomState(RoomStateContext),
    /// Login completed.
    Connected,
    /// Server asked us to reconnect.
    Reconnect,
    /// Startup hydration.
    Setup,
    /// Periodic tick.
    Update,
    /// Control channel command.
    ServerControl(ControlRequest),
    /// Unrecognised wire type.
    Unknown(UnknownContext),
}

impl Context {
    /// Dispatch discriminant.
    pub fn kind(&self) -> ContextType {
        match self {
            Self::Message(_) => ContextType::Message,
            Self::Join(_) => ContextType::Join,
            Self::Part(_) => ContextType::Part,
            Self::UserState(_) => ContextType::UserState,
            Self::RoomState(_) => ContextType::RoomState,
            Self::Connected => ContextType::Connected,
            Self::Reconnect => ContextType::Reconnect,
            Self::Setup => ContextType::Setup,
            Self::Update => ContextType::Update,
            Self::ServerControl(_) => ContextType::ServerControl,
            Self::Unknown(_) => ContextType::Unknown,
        }
    }

    /// Channel the event belongs to, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(&m.channel),
            Self::Join(c) | Self::Part(c) => Some(&c.channel),
            Self::UserState(u) => Some(&u.channel),
            Self::RoomState(r) => Some(&r.channel),
            _ => None,
        }
    }
}

/// Which characters [`MessageContext::get_args`] keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CharAcceptance {
    /// Keep everything.
    #[default]
    Unicode,
    /// Drop non-ASCII characters first.
    Ascii,
}

/// A `PRIVMSG`.
#[derive(Clone, Debug)]
pub struct MessageContext {
    /// Raw source token, `:nick!user@host`.
    pub source: String,
    /// Login of the sender.
    pub sending_user: String,
    /// Channel without the leading `#`.
    pub channel: String,
    /// Message body with any ACTION wrapper removed.
    pub message: String,
    /// Whether the body was a `/me` action.
    pub action: bool,
    /// All tags as received.
    pub tags: Tags,
    /// Message id (`id` tag).
    pub id: Option<String>,
    /// Sender's user id, `-1` when absent.
    pub user_id: i64,
    /// Channel's user id, `0` when absent.
    pub room_id: i64,
    /// First message ever sent by the user in this channel.
    pub first_msg: bool,
    /// Returning chatter flag.
    pub returning_chatter: bool,
    /// Turbo subscriber.
    pub turbo: bool,
    /// Raw emote positions.
    pub emotes: Option<String>,
    /// Raw automod flags.
    pub flags: Option<String>,
    /// Server-side send timestamp.
    pub sent_at: Option<DateTime<Utc>>,
    /// Sender badges, color and display name.
    pub user: UserStateContext,
    /// Parent message when this is a reply.
    pub reply: Option<ReplyContext>,
}

impl MessageContext {
    /// Build from a parsed line.
    pub fn new(source: &str, channel: &str, body: &str, tags: Tags) -> Self {
        let sending_user = sender_login(source).unwrap_or_default().to_owned();
        let (message, action) = match crate::ctcp::unwrap_action(body) {
            Some(inner) => (inner.to_owned(), true),
            None => (body.to_owned(), false),
        };
        let user = UserStateContext::from_tags(channel, Some(sending_user.clone()), &tags);

        Self {
            source: source.to_owned(),
            channel: channel.to_owned(),
            message,
            action,
            id: tags.non_empty("id").map(str::to_owned),
            user_id: tags.int("user-id").unwrap_or(-1),
            room_id: tags.int("room-id").unwrap_or(0),
            first_msg: tags.flag("first-msg").unwrap_or(false),
            returning_chatter: tags.flag("returning-chatter").unwrap_or(false),
            turbo: tags.flag("turbo").unwrap_or(false),
            emotes: tags.non_empty("emotes").map(str::to_owned),
            flags: tags.non_empty("flags").map(str::to_owned),
            sent_at: tags
                .int("tmi-sent-ts")
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            reply: ReplyContext::from_tags(&tags),
            sending_user,
            user,
            tags,
        }
    }

    /// Words after the command token.
    ///
    /// On a reply, Twitch prefixes the body with `@parent`, which is skipped
    /// along with the command itself.
    pub fn get_args(&self, acceptance: CharAcceptance) -> Vec<String> {
        let text: String = match acceptance {
            CharAcceptance::Unicode => self.message.clone(),
            CharAcceptance::Ascii => self.message.chars().filter(char::is_ascii).collect(),
        };
        let skip = if self.reply.is_some() { 2 } else { 1 };
        text.split_whitespace().skip(skip).map(str::to_owned).collect()
    }

    /// Lowercased logins pinged with `@`.
    ///
    /// Commas, periods and dashes are dropped before splitting, so
    /// `@alice,` and `@a-lice` both ping `alice`.
    pub fn mentions(&self) -> BTreeSet<String> {
        self.message
            .to_lowercase()
            .replace([',', '.', '-'], "")
            .split_whitespace()
            .filter(|word| word.starts_with('@'))
            .map(|word| word.replace('@', ""))
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Parent message of a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyContext {
    /// Parent author's display name.
    pub display_name: String,
    /// Parent author's login.
    pub user_login: String,
    /// Parent author's id.
    pub user_id: Option<i64>,
    /// Parent body.
    pub msg_body: String,
    /// Parent message id.
    pub msg_id: String,
}

impl ReplyContext {
    /// Present only when `reply-parent-msg-id` is.
    pub fn from_tags(tags: &Tags) -> Option<Self> {
        let msg_id = tags.non_empty("reply-parent-msg-id")?.to_owned();
        Some(Self {
            display_name: tags
                .get("reply-parent-display-name")
                .unwrap_or_default()
                .to_owned(),
            user_login: tags
                .get("reply-parent-user-login")
                .unwrap_or_default()
                .to_owned(),
            user_id: tags.int("reply-parent-user-id"),
            msg_body: tags
                .get("reply-parent-msg-body")
                .unwrap_or_default()
                .to_owned(),
            msg_id,
        })
    }
}

/// `JOIN` / `PART`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipContext {
    /// Channel without `#`.
    pub channel: String,
    /// Login of the user joining or leaving.
    pub user: Option<String>,
}

/// `USERSTATE`, or the sender half of a `PRIVMSG`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserStateContext {
    /// Channel without `#`.
    pub channel: String,
    /// Login, when the source carries one.
    pub username: Option<String>,
    /// Display name, falling back to the login.
    pub display_name: String,
    /// Raw `badge-info` (e.g. subscription months).
    pub badge_info: Vec<Badge>,
    /// Badges.
    pub badges: Vec<Badge>,
    /// Name color, `#FFFFFF` by default.
    pub color: String,
    /// Available emote set ids.
    pub emote_sets: Vec<String>,
    /// `mod=1`.
    pub moderator: bool,
    /// `subscriber=1`.
    pub subscriber: bool,
    /// `user-type`.
    pub user_type: Option<String>,
}

impl UserStateContext {
    /// Decode from tags.
    pub fn from_tags(channel: &str, username: Option<String>, tags: &Tags) -> Self {
        let display_name = tags
            .non_empty("display-name")
            .map(str::to_owned)
            .or_else(|| username.clone())
            .unwrap_or_default();
        Self {
            channel: channel.to_owned(),
            display_name,
            badge_info: parse_badges(tags.get("badge-info").unwrap_or_default()),
            badges: parse_badges(tags.get("badges").unwrap_or_default()),
            color: tags.non_empty("color").unwrap_or("#FFFFFF").to_owned(),
            emote_sets: tags
                .get("emote-sets")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            moderator: tags.flag("mod").unwrap_or(false),
            subscriber: tags.flag("subscriber").unwrap_or(false),
            user_type: tags.non_empty("user-type").map(str::to_owned),
            username,
        }
    }

    /// Whether this user has the given badge.
    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b.name == name)
    }

    /// Moderator or broadcaster; either gets the fast send lane.
    pub fn is_privileged(&self) -> bool {
        self.moderator || self.has_badge("broadcaster")
    }
}

/// `ROOMSTATE`. Fields are `None` when the update omitted them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomStateContext {
    /// Channel without `#`.
    pub channel: String,
    /// Emote-only mode.
    pub emote_only: Option<bool>,
    /// Followers-only minutes, `-1` when off.
    pub followers_only: Option<i64>,
    /// Unique-chat mode.
    pub r9k: Option<bool>,
    /// Channel user id.
    pub room_id: Option<i64>,
    /// Slow mode seconds.
    pub slow: Option<i64>,
    /// Subscribers-only mode.
    pub subs_only: Option<bool>,
}

impl RoomStateContext {
    /// Decode from tags.
    pub fn from_tags(channel: &str, tags: &Tags) -> Self {
        Self {
            channel: channel.to_owned(),
            emote_only: tags.flag("emote-only"),
            followers_only: tags.int("followers-only"),
            r9k: tags.flag("r9k"),
            room_id: tags.int("room-id"),
            slow: tags.int("slow"),
            subs_only: tags.flag("subs-only"),
        }
    }
}

/// A line with an unrecognised type token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownContext {
    /// The raw type token.
    pub kind: String,
    /// Source token.
    pub source: String,
    /// Tags, if any.
    pub tags: Tags,
}

/// Login portion of a `:nick!user@host` source.
pub fn sender_login(source: &str) -> Option<&str> {
    let source = source.strip_prefix(':').unwrap_or(source);
    let (nick, _) = source.split_once('!')?;
    (!nick.is_empty()).then_some(nick)
}
