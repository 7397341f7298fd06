use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Quota of one API family.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rate {
    pub limit: u64,
    pub remaining: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub reset: DateTime<Utc>,
}

/// Answer of `GET /rate_limit`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimits {
    pub core: Rate,
    pub search: Rate,
}

#[derive(Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimits,
}

impl fmt::Display for RateLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, rate) in [("Core", &self.core), ("Search", &self.search)] {
            writeln!(f, "{name}:")?;
            writeln!(f, "  Limit:     {}", rate.limit)?;
            writeln!(f, "  Remaining: {}", rate.remaining)?;
            writeln!(f, "  Reset:     {}", rate.reset)?;
        }
        Ok(())
    }
}
