//! Scheduling executor - publish now or at a requested local time
//!
//! The wait before a scheduled publish is the only wall-clock suspension in a
//! run. Once it starts it can only be ended by the process exiting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::publisher::{PublishReceipt, PublishRequest, Publisher};
use crate::{RedpostError, Result};

/// Accepted schedule input, `YYYY-MM-DD HH:mm:ss`
pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static SCHEDULE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("schedule time pattern is valid")
});

/// A validated publish instant in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleTime(NaiveDateTime);

impl ScheduleTime {
    /// Strict parse: exact layout, real calendar date, existing local instant
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || RedpostError::InvalidScheduleTime {
            input: input.to_string(),
        };

        let trimmed = input.trim();
        if !SCHEDULE_TIME_RE.is_match(trimmed) {
            return Err(invalid());
        }

        let naive =
            NaiveDateTime::parse_from_str(trimmed, SCHEDULE_TIME_FORMAT).map_err(|_| invalid())?;
        let time = Self(naive);
        // Rejects instants skipped by a DST jump
        time.to_local().ok_or_else(invalid)?;
        Ok(time)
    }

    pub fn to_local(&self) -> Option<DateTime<Local>> {
        Local.from_local_datetime(&self.0).earliest()
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(SCHEDULE_TIME_FORMAT))
    }
}

impl std::str::FromStr for ScheduleTime {
    type Err = RedpostError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How long to wait before publishing; `None` means publish now
pub fn delay_until(target: DateTime<Local>, now: DateTime<Local>) -> Option<Duration> {
    (target - now).to_std().ok().filter(|d| !d.is_zero())
}

/// Outcome of one executed publish
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub receipt: PublishReceipt,
    pub scheduled_for: Option<ScheduleTime>,
    pub waited: Duration,
    pub published_at: DateTime<Utc>,
}

pub struct SchedulingExecutor {
    publisher: Arc<dyn Publisher>,
}

impl SchedulingExecutor {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    pub fn publisher_name(&self) -> &str {
        self.publisher.name()
    }

    pub async fn execute(
        &self,
        schedule: Option<&ScheduleTime>,
        request: &PublishRequest,
    ) -> Result<ExecutionReport> {
        self.execute_from(Local::now(), schedule, request).await
    }

    /// Same as [`execute`](Self::execute) with an explicit notion of "now"
    pub async fn execute_from(
        &self,
        now: DateTime<Local>,
        schedule: Option<&ScheduleTime>,
        request: &PublishRequest,
    ) -> Result<ExecutionReport> {
        let delay = match schedule {
            None => None,
            Some(time) => {
                let target = time.to_local().ok_or_else(|| RedpostError::InvalidScheduleTime {
                    input: time.to_string(),
                })?;
                match delay_until(target, now) {
                    Some(delay) => Some(delay),
                    None => {
                        tracing::warn!(
                            "[SCHEDULER] Requested time {} already passed, publishing now",
                            time
                        );
                        None
                    }
                }
            }
        };

        let waited = match delay {
            Some(delay) => {
                tracing::info!(
                    "[SCHEDULER] Waiting {}s until scheduled publish",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                delay
            }
            None => Duration::ZERO,
        };

        tracing::info!("[SCHEDULER] Publishing via {}", self.publisher.name());
        let receipt = self.publisher.publish(request).await?;

        Ok(ExecutionReport {
            receipt,
            scheduled_for: schedule.copied(),
            waited,
            published_at: Utc::now(),
        })
    }
}
