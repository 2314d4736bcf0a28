//! IRCv3 message tags as sent by Twitch.
//!
//! Tags arrive as the first token of a line, `@key=value;key2=value2`.
//! Values are unescaped on parse; keys without `=` get an empty value.

/// Unescape a tag value from wire format.
///
/// A trailing lone backslash is dropped and unknown escapes yield the
/// escaped character.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Decoded tag map for a single line, in wire order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags {
    entries: Vec<(String, String)>,
}

impl Tags {
    /// Parse a tag token. The leading `@` is optional.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('@').unwrap_or(raw);
        let entries = raw
            .split(';')
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut kv = entry.splitn(2, '=');
                let key = kv.next().unwrap_or_default().to_owned();
                let value = kv.next().map(unescape_tag_value).unwrap_or_default();
                (key, value)
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { entries }
    }

    /// Raw (unescaped) value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, `None` when absent or empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Boolean flag encoded as `"1"` / `"0"`.
    ///
    /// Any other value, including an empty one, is `None`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        }
    }

    /// Integer value for `key`.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key)?.parse().ok()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the line carried no tags.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A chat badge, e.g. `subscriber/12`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
    /// Badge set id (`moderator`, `subscriber`, ...).
    pub name: String,
    /// Version within the set. Empty when the badge has none.
    pub version: String,
}

/// Parse a comma separated `name/version` badge list.
pub fn parse_badges(raw: &str) -> Vec<Badge> {
    raw.split(',')
        .filter(|b| !b.is_empty())
        .map(|b| {
            let (name, version) = b.split_once('/').unwrap_or((b, ""));
            Badge {
                name: name.to_owned(),
                version: version.to_owned(),
            }
        })
        .collect()
}
