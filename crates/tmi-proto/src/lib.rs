//! # tmi-proto
//!
//! Wire protocol for the Twitch chat IRC dialect (TMI).
//!
//! - Parse raw lines into typed [`Context`] events, skipping anything
//!   malformed instead of failing
//! - Decode IRCv3 tags into typed fields (badges, replies, room state)
//! - Build outbound lines and split long chat text into sendable chunks
//! - Frame the local control channel
//! - Optional Tokio [`LineCodec`] for `Framed` sockets
//!
//! ## Parsing
//!
//! ```rust
//! use tmi_proto::{parse_line, Context};
//!
//! let raw = "@id=abc;user-id=42;room-id=19 alice!alice@x PRIVMSG #bob :!remind 90s buy milk";
//! let Some(Context::Message(msg)) = parse_line(raw) else { panic!() };
//! assert_eq!(msg.channel, "bob");
//! assert_eq!(msg.sending_user, "alice");
//! assert_eq!(msg.user_id, 42);
//! assert_eq!(msg.room_id, 19);
//! ```
//!
//! ## Sending
//!
//! ```rust
//! use tmi_proto::outbound;
//!
//! assert_eq!(outbound::privmsg("bob", "hi", false), "PRIVMSG #bob :/me hi");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod context;
pub mod control;
pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod outbound;
pub mod parse;
pub mod tags;

pub use self::context::{
    CharAcceptance, Context, ContextType, MembershipContext, MessageContext, ReplyContext,
    RoomStateContext, UnknownContext, UserStateContext,
};
pub use self::control::{ControlCommand, ControlRequest};
pub use self::error::{ControlParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::parse::{connection_control, contexts, parse_line, ConnectionControl, Contexts};
pub use self::tags::{Badge, Tags};
