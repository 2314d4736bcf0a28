//! Tracing setup and span constructors.

use tracing::{Span, info_span};
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Install the global subscriber. `RUST_LOG` wins over the `info` default.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Standardized span constructors.
pub mod spans {
    use super::*;

    /// One server session, from connect to close.
    pub fn connection(address: &str, attempt: u32) -> Span {
        info_span!("connection", address = %address, attempt)
    }

    /// One hook run for one context.
    pub fn dispatch(kind: &str, component: &str) -> Span {
        info_span!("dispatch", kind = %kind, component = %component)
    }

    /// One command invocation.
    pub fn command(name: &str, channel: &str, user: &str) -> Span {
        info_span!("command", name = %name, channel = %channel, user = %user)
    }
}
