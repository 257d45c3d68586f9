//! UTC timestamps stored as fractional epoch seconds

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC instant with microsecond precision
///
/// Persisted as seconds since the epoch in a floating point column; the
/// microsecond precision keeps that conversion lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(6))
    }

    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    /// Build from fractional epoch seconds, rounding to the microsecond.
    /// Returns `None` for values chrono cannot represent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_epoch_secs(secs: f64) -> Option<Self> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let mut micros = ((secs - whole) * 1_000_000.0).round() as u32;
        let mut whole = whole as i64;
        if micros >= 1_000_000 {
            whole += 1;
            micros -= 1_000_000;
        }
        DateTime::from_timestamp(whole, micros * 1_000).map(Self)
    }

    /// Fractional seconds since the epoch
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_epoch_secs(&self) -> f64 {
        self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_micros()) / 1_000_000.0
    }

    /// `YYYY-MM-DD HH:MM:SS` without the fractional part
    #[must_use]
    pub fn format_no_usec(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Compact form used in session tags, e.g. `20140730210615`
    #[must_use]
    pub fn format_compact(&self) -> String {
        self.0.format("%Y%m%d%H%M%S").to_string()
    }

    /// Elapsed time from `earlier` to `self`
    #[must_use]
    pub fn since(&self, earlier: &Timestamp) -> TimeDelta {
        self.0 - earlier.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.6f"))
    }
}

/// Format a duration as `H:MM:SS`, prefixed with days when longer than one.
/// Sub-second parts are dropped and negative durations clamp to zero.
#[must_use]
pub fn format_duration(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    match days {
        0 => format!("{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("1 day, {hours}:{minutes:02}:{seconds:02}"),
        n => format!("{n} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_seconds_and_display_agree() {
        let raw = 1_406_754_375.6;
        let ts = Timestamp::from_epoch_secs(raw).unwrap();
        assert!((ts.as_epoch_secs() - raw).abs() < 1e-6);
        assert_eq!(ts.to_string(), "2014-07-30 21:06:15.600000");
        assert_eq!(ts.format_no_usec(), "2014-07-30 21:06:15");
        assert_eq!(ts.format_compact(), "20140730210615");
    }

    #[test]
    fn rounding_carries_into_seconds() {
        let ts = Timestamp::from_epoch_secs(9.999_999_9).unwrap();
        assert!((ts.as_epoch_secs() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(Timestamp::from_epoch_secs(f64::NAN).is_none());
        assert!(Timestamp::from_epoch_secs(f64::INFINITY).is_none());
    }

    #[test]
    fn now_survives_storage_form() {
        let now = Timestamp::now();
        let back = Timestamp::from_epoch_secs(now.as_epoch_secs()).unwrap();
        assert_eq!(back, now);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(TimeDelta::seconds(0)), "0:00:00");
        assert_eq!(format_duration(TimeDelta::milliseconds(3_723_900)), "1:02:03");
        assert_eq!(format_duration(TimeDelta::seconds(86_400 + 5)), "1 day, 0:00:05");
        assert_eq!(format_duration(TimeDelta::seconds(3 * 86_400)), "3 days, 0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0:00:00");
    }
}
