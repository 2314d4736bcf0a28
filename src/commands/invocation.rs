//! A routed command call and its argument cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use tmi_proto::{CharAcceptance, MessageContext};

use super::CallableCommand;

/// One command call, after routing and cooldown checks.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: Arc<CallableCommand>,
    pub ctx: Arc<MessageContext>,
    /// Normalized text: prefix removed, reply mention stripped, ASCII only.
    pub text: String,
}

impl Invocation {
    pub fn new(command: Arc<CallableCommand>, ctx: Arc<MessageContext>, text: String) -> Self {
        Self { command, ctx, text }
    }

    /// Words after the command token, as typed (emotes included).
    pub fn args(&self) -> Args {
        Args::new(self.ctx.get_args(CharAcceptance::Unicode))
    }

    pub fn channel(&self) -> &str {
        &self.ctx.channel
    }

    pub fn user_id(&self) -> i64 {
        self.ctx.user_id
    }

    pub fn username(&self) -> &str {
        &self.ctx.sending_user
    }

    /// Display name, falling back to the login.
    pub fn display_name(&self) -> &str {
        if self.ctx.user.display_name.is_empty() {
            &self.ctx.sending_user
        } else {
            &self.ctx.user.display_name
        }
    }
}

/// Consuming cursor over command arguments.
///
/// Flags are pulled out first so positional arguments are whatever remains:
///
/// ```
/// use offlinechatbot::commands::Args;
///
/// let mut args = Args::new(["-n", "5", "alice"].map(String::from));
/// assert_eq!(args.take_value("n").as_deref(), Some("5"));
/// assert_eq!(args.next().as_deref(), Some("alice"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    words: VecDeque<String>,
}

impl Args {
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }

    /// Remove `-<flag>` and report whether it was present.
    pub fn take_flag(&mut self, flag: &str) -> bool {
        match self.position(flag) {
            Some(pos) => {
                self.words.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove `-<flag> <value>` and return the value.
    ///
    /// A trailing flag with no value is removed and yields `None`.
    pub fn take_value(&mut self, flag: &str) -> Option<String> {
        let pos = self.position(flag)?;
        self.words.remove(pos);
        self.words.remove(pos)
    }

    /// Next positional argument.
    pub fn next(&mut self) -> Option<String> {
        self.words.pop_front()
    }

    /// Remaining words joined by spaces.
    pub fn rest(self) -> String {
        Vec::from(self.words).join(" ")
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn position(&self, flag: &str) -> Option<usize> {
        self.words.iter().position(|word| {
            word.strip_prefix('-')
                .is_some_and(|name| name.eq_ignore_ascii_case(flag))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &str) -> Args {
        Args::new(text.split_whitespace().map(str::to_owned))
    }

    #[test]
    fn test_invocation_args_keep_unicode() {
        let owner: std::sync::Weak<dyn crate::runtime::Component> =
            std::sync::Weak::<crate::runtime::NoopComponent>::new();
        let spec = crate::commands::CommandSpec::new("afk", "away");
        let command = Arc::new(CallableCommand::new(spec, owner, "AfkBot"));
        let ctx = Arc::new(MessageContext::new(
            ":alice!alice@x",
            "bob",
            "!afk  eating 🍕 brb",
            Default::default(),
        ));
        let inv = Invocation::new(command, ctx, "!afk eating  brb".into());
        assert_eq!(inv.args().rest(), "eating 🍕 brb");
        assert_eq!(inv.display_name(), "alice");
    }

    #[test]
    fn test_positional() {
        let mut a = args("90s buy milk");
        assert_eq!(a.next().as_deref(), Some("90s"));
        assert_eq!(a.rest(), "buy milk");
    }

    #[test]
    fn test_flags_anywhere() {
        let mut a = args("alice -N 3 -v");
        assert!(a.take_flag("v"));
        assert!(!a.take_flag("v"));
        assert_eq!(a.take_value("n").as_deref(), Some("3"));
        assert_eq!(a.rest(), "alice");
    }

    #[test]
    fn test_trailing_flag_without_value() {
        let mut a = args("x -n");
        assert_eq!(a.take_value("n"), None);
        assert_eq!(a.len(), 1);
    }
}
