use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How often the rolling-state synchronization runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodicSync {
    Hourly,
    #[default]
    Daily,
    Weekly,
}

impl PeriodicSync {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    /// `strftime` pattern of the rolling-state index suffix.
    #[must_use]
    pub fn state_bucket_format(self) -> &'static str {
        match self {
            Self::Hourly => "%Y.%m.%d-%H",
            Self::Daily | Self::Weekly => "%Y.%m.%d",
        }
    }

    /// The next aligned boundary strictly after `now` (UTC): top of the next
    /// hour, next midnight, or next Sunday midnight.
    #[must_use]
    pub fn next_boundary(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            Self::Hourly => midnight + TimeDelta::hours(i64::from(now.hour()) + 1),
            Self::Daily => midnight + TimeDelta::days(1),
            Self::Weekly => {
                midnight + TimeDelta::days(7 - i64::from(now.weekday().num_days_from_sunday()))
            }
        }
    }

    /// Time to wait from `now` until the next boundary. Missed boundaries are
    /// never caught up: the result always targets the upcoming one.
    #[must_use]
    pub fn next_tick(self, now: DateTime<Utc>) -> Duration {
        (self.next_boundary(now) - now)
            .to_std()
            .unwrap_or(Duration::from_secs(1))
    }
}

impl fmt::Display for PeriodicSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodicSync {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Hourly, Self::Daily, Self::Weekly]
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::InvalidPeriodicity(s.to_owned()))
    }
}
