//! Small formatting helpers shared by chat features.

use chrono::Utc;

const UNITS: [(&str, u64); 6] = [
    ("seconds", 60),
    ("minutes", 60),
    ("hours", 24),
    ("days", 30),
    ("months", 12),
    ("years", 100),
];

/// Human duration using the two largest non-trivial units, e.g.
/// `"2 hours 5 minutes"` or `"42 seconds"`.
pub fn format_time_length(seconds: u64) -> String {
    // values[i] is the amount in unit i; the last slot holds centuries
    let mut values = vec![seconds];
    for (_, per_next) in UNITS {
        let Some(last) = values.last_mut() else { break };
        if *last < per_next {
            break;
        }
        let carry = *last / per_next;
        *last %= per_next;
        values.push(carry);
    }

    let label = |i: usize| UNITS.get(i).map_or("centuries", |(name, _)| *name);
    let top = values.len() - 1;
    let mut parts = vec![format!("{} {}", values[top], label(top))];
    if top > 0 {
        parts.push(format!("{} {}", values[top - 1], label(top - 1)));
    }
    parts.join(" ")
}

/// Time elapsed since the unix timestamp `then`.
pub fn format_since(then: i64) -> String {
    let elapsed = Utc::now().timestamp().saturating_sub(then).max(0);
    format_time_length(elapsed as u64)
}

/// Strip a leading `@` and lowercase a username argument.
pub fn normalize_username(arg: &str) -> String {
    arg.trim_start_matches('@').to_lowercase()
}
