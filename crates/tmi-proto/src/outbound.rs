//! Outbound line builders and chat text shaping.
//!
//! Builders return lines without the trailing CRLF; the codec writer appends
//! it.

/// Appended to a chunk identical to the previous one so Twitch does not drop
/// it as a duplicate.
pub const DUPLICATE_MARKER: &str = " \u{E0000}";

/// Longest chat chunk we send, in bytes.
pub const MAX_MESSAGE_LEN: usize = 495;

/// `PASS <token>`
pub fn pass(token: &str) -> String {
    format!("PASS {token}")
}

/// `NICK <name>`
pub fn nick(name: &str) -> String {
    format!("NICK {name}")
}

/// `JOIN #<channel>`, lowercased.
pub fn join(channel: &str) -> String {
    format!("JOIN #{}", channel.to_lowercase())
}

/// `PART #<channel>`, lowercased.
pub fn part(channel: &str) -> String {
    format!("PART #{}", channel.to_lowercase())
}

/// `CAP REQ :twitch.tv/<cap> ...`
pub fn cap_req<S: AsRef<str>>(caps: &[S]) -> String {
    let caps: Vec<String> = caps
        .iter()
        .map(|c| format!("twitch.tv/{}", c.as_ref()))
        .collect();
    format!("CAP REQ :{}", caps.join(" "))
}

/// `PONG :<host>`
pub fn pong(host: &str) -> String {
    format!("PONG :{host}")
}

/// `PRIVMSG #<channel> :/me <text>`, with [`DUPLICATE_MARKER`] when
/// `duplicate` is set.
pub fn privmsg(channel: &str, text: &str, duplicate: bool) -> String {
    let marker = if duplicate { DUPLICATE_MARKER } else { "" };
    format!("PRIVMSG #{channel} :/me {text}{marker}")
}

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into trimmed, non-empty chunks of at most `max_len` bytes.
///
/// Splits prefer the last space inside the window and never cut a
/// character in half.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.len() <= max_len {
            chunks.push(rest.to_owned());
            break;
        }

        let mut cut = max_len;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // first char alone is wider than the window
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        } else if !rest[cut..].starts_with(' ') {
            if let Some(space) = rest[..cut].rfind(' ').filter(|&i| i > 0) {
                cut = space;
            }
        }

        let chunk = rest[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_owned());
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        assert_eq!(pass("oauth:abc"), "PASS oauth:abc");
        assert_eq!(nick("bot"), "NICK bot");
        assert_eq!(join("Chan"), "JOIN #chan");
        assert_eq!(part("Chan"), "PART #chan");
        assert_eq!(
            cap_req(&["tags", "commands"]),
            "CAP REQ :twitch.tv/tags twitch.tv/commands"
        );
        assert_eq!(pong("tmi.twitch.tv"), "PONG :tmi.twitch.tv");
    }

    #[test]
    fn test_privmsg_marker() {
        assert_eq!(privmsg("x", "hello", false), "PRIVMSG #x :/me hello");
        assert_eq!(
            privmsg("x", "hello", true),
            "PRIVMSG #x :/me hello \u{E0000}"
        );
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b\t\nc "), "a b c");
    }

    #[test]
    fn test_split_short() {
        assert_eq!(split_message("hello", 495), ["hello"]);
        assert!(split_message("   ", 495).is_empty());
    }

    #[test]
    fn test_split_prefers_spaces() {
        let chunks = split_message("aaaa bbbb cccc", 9);
        assert_eq!(chunks, ["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_split_hard_cut() {
        let chunks = split_message(&"x".repeat(1000), MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= MAX_MESSAGE_LEN));
        assert_eq!(chunks.concat().len(), 1000);
    }

    #[test]
    fn test_split_char_boundary() {
        let text = "é".repeat(10);
        let chunks = split_message(&text, 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }
}
