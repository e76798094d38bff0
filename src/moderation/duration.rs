//! Human duration strings such as `10m`, `1.5h` or `2 days`

use std::time::Duration;

/// Discord's timeout ceiling
pub const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 60 * 60);

const SECOND: f64 = 1_000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

/// Parse a duration. A bare number is milliseconds.
///
/// Returns `None` for anything unparseable, negative or zero.
#[must_use]
pub fn parse(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let value: f64 = number.parse().ok()?;

    let scale = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };

    let millis = (value * scale).round();
    if !millis.is_finite() || millis < 1.0 {
        return None;
    }
    // Anything past u64 millis is far beyond any ceiling we check against
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let millis = millis.min(u64::MAX as f64) as u64;
    Some(Duration::from_millis(millis))
}

/// Parse a timeout length, rejecting anything above [`MAX_TIMEOUT`]
#[must_use]
pub fn parse_timeout(input: &str) -> Option<Duration> {
    parse(input).filter(|duration| *duration <= MAX_TIMEOUT)
}

/// Render a duration the way notices read it, e.g. `1 hour` or `90 minutes`
#[must_use]
pub fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (amount, unit) = if secs >= 86_400 && secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs >= 3_600 && secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}
