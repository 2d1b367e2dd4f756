//! Run triggers and the twice-daily schedule.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// What started a run. Both variants feed the same runner entry point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Trigger {
    /// Fired by the schedule at `fire_time`.
    Scheduled { fire_time: DateTime<Utc> },
    /// Invoked on demand.
    Manual,
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Trigger::Scheduled { .. } => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

/// Daily fire times in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    times: Vec<NaiveTime>,
}

impl Schedule {
    /// Build a schedule from times of day. Times are sorted and deduplicated.
    pub fn new(mut times: Vec<NaiveTime>) -> MonitorResult<Self> {
        if times.is_empty() {
            return Err(MonitorError::Config(
                "schedule needs at least one time of day".to_string(),
            ));
        }
        times.sort();
        times.dedup();
        Ok(Self { times })
    }

    /// Parse `HH:MM` entries.
    pub fn parse(entries: &[String]) -> MonitorResult<Self> {
        let times = entries
            .iter()
            .map(|e| {
                NaiveTime::parse_from_str(e.trim(), "%H:%M").map_err(|err| {
                    MonitorError::Config(format!("invalid schedule time '{}': {}", e, err))
                })
            })
            .collect::<MonitorResult<Vec<_>>>()?;
        Self::new(times)
    }

    /// Twice daily, at midnight and noon UTC.
    pub fn twice_daily() -> Self {
        Self {
            times: vec![NaiveTime::MIN, NaiveTime::MIN + Duration::hours(12)],
        }
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        for day in [today, today + Duration::days(1)] {
            for time in &self.times {
                let candidate = day.and_time(*time).and_utc();
                if candidate > now {
                    return candidate;
                }
            }
        }
        // Unreachable with a non-empty schedule: tomorrow's first slot is always later.
        (today + Duration::days(1)).and_time(self.times[0]).and_utc()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::twice_daily()
    }
}
