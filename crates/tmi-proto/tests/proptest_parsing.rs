//! Property-based tests for the line parser.
//!
//! 1. Parsing never panics, whatever the input
//! 2. Lines with fewer than three tokens never produce a context
//! 3. Boolean tags decode independently of their neighbours

use proptest::prelude::*;
use tmi_proto::{contexts, parse_line, Context};

fn login_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_]{1,25}").expect("valid regex")
}

fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_]{1,25}").expect("valid regex")
}

/// Chat text without line breaks or leading CTCP delimiter
fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\u{1}]{1,200}").expect("valid regex")
}

fn token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\\s]{1,20}").expect("valid regex")
}

proptest! {
    #[test]
    fn never_panics(input in "\\PC{0,300}") {
        let _ = parse_line(&input);
        let _ = contexts(&input).count();
    }

    #[test]
    fn short_lines_yield_nothing(tokens in prop::collection::vec(token_strategy(), 0..3)) {
        let line = tokens.join(" ");
        prop_assert!(parse_line(&line).is_none());
        prop_assert_eq!(contexts(&line).count(), 0);
    }

    #[test]
    fn boolean_tags_decode(
        first in any::<bool>(),
        turbo in any::<bool>(),
        returning in any::<bool>(),
        user_id in 1i64..1_000_000_000,
        login in login_strategy(),
        channel in channel_strategy(),
        text in text_strategy(),
    ) {
        let line = format!(
            "@first-msg={};turbo={};returning-chatter={};user-id={} :{login}!{login}@x PRIVMSG #{channel} :{text}",
            u8::from(first), u8::from(turbo), u8::from(returning), user_id,
        );
        let Some(Context::Message(msg)) = parse_line(&line) else {
            return Err(TestCaseError::fail("expected a message context"));
        };
        prop_assert_eq!(msg.first_msg, first);
        prop_assert_eq!(msg.turbo, turbo);
        prop_assert_eq!(msg.returning_chatter, returning);
        prop_assert_eq!(msg.user_id, user_id);
        prop_assert_eq!(&msg.sending_user, &login);
        prop_assert_eq!(&msg.channel, &channel);
        prop_assert_eq!(msg.room_id, 0);
    }
}
