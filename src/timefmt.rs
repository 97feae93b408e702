//! Coarse relative-age strings for task timestamps.
//!
//! The ladder below is deliberately literal-minded: each granularity only
//! takes over once there are at least two of it, and the composite forms
//! ("1y 3m ago") appear only when a single unit of the larger granularity
//! leaves two or more of the finer one on the table. Ages that satisfy
//! neither rule fall through, which is why 90 seconds reads "90 secs ago"
//! rather than "1 min ago". Anything consuming these strings (and any
//! test) should treat the formula as the contract, not the intuition.

use chrono::{DateTime, Utc};

const YEAR: i64 = 31_536_000;
const MONTH: i64 = 2_592_000;
const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;
const MINUTE: i64 = 60;

/// Render an age, given in seconds, as the coarse ladder string. Negative
/// ages clamp to zero.
pub fn time_since(seconds: i64) -> String {
    let s = seconds.max(0);

    let interval = s / YEAR;
    if interval > 1 {
        return format!("{interval} years ago");
    }
    if interval == 1 {
        let months = s / MONTH - 12;
        if months > 1 {
            return format!("1y {months}m ago");
        }
    }

    let interval = s / MONTH;
    if interval > 1 {
        return format!("{interval} months ago");
    }
    if interval == 1 {
        let days = s / DAY - 31;
        if days > 1 {
            return format!("1m {days}d ago");
        }
    }

    let interval = s / DAY;
    if interval > 1 {
        return format!("{interval} days ago");
    }
    if interval == 1 {
        let hours = s / HOUR - 24;
        if hours > 1 {
            return format!("1d {hours}h ago");
        }
    }

    let interval = s / HOUR;
    if interval > 1 {
        return format!("{interval} hours ago");
    }
    if interval == 1 {
        let minutes = s / MINUTE - 60;
        if minutes > 1 {
            return format!("1h {minutes}m ago");
        }
    }

    let interval = s / MINUTE;
    if interval > 1 {
        return format!("{interval} mins ago");
    }

    format!("{s} secs ago")
}

/// Render the age of an ISO-8601 timestamp relative to `now`. Timestamps
/// the service formats in ways chrono can't parse are shown verbatim
/// instead of erroring the whole cell.
pub fn render_age(timestamp: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(moment) => {
            let age = now.signed_duration_since(moment.with_timezone(&Utc));
            time_since(age.num_seconds())
        }
        Err(_) => timestamp.to_string(),
    }
}
