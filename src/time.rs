use chrono::{DateTime, Duration, TimeDelta, Utc};

/// Signed number of seconds from `from` to `to`, with nanosecond resolution.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9
}

/// `base` shifted by a (possibly fractional or negative) number of seconds,
/// or `None` when the result is not a representable instant.
pub fn checked_shifted_by(base: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as i64;
    let delta = TimeDelta::try_seconds(whole as i64)?.checked_add(&TimeDelta::nanoseconds(nanos))?;
    base.checked_add_signed(delta)
}

/// `base` shifted by a (possibly fractional or negative) number of seconds.
///
/// Panics if the result leaves chrono's range; offsets from user input go
/// through [`checked_shifted_by`].
pub fn shifted_by(base: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as i64;
    base + Duration::seconds(whole as i64) + Duration::nanoseconds(nanos)
}
