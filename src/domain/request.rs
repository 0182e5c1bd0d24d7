use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::domain::validation::ConfigError;

/// Per-call options shared by every send operation.
///
/// `from` and `udh` take precedence over the backend's configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub from: Option<String>,
    pub udh: Option<String>,
    /// Seconds component for scheduled sends (defaults to 0).
    pub seconds: Option<u32>,
    /// Recurrence passed verbatim to providers that support periodic schedules.
    pub period: Option<String>,
}

impl SendOptions {
    /// Options overriding only the sender.
    pub fn from(sender: impl Into<String>) -> Self {
        Self {
            from: Some(sender.into()),
            ..Default::default()
        }
    }
}

/// Provider-side schedule time, as calendar components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    year: i32,
    month: u32,
    day: u32,
    hours: u32,
    minutes: u32,
}

impl ScheduleTime {
    /// Capture the calendar components; they are checked when combined with seconds.
    pub fn new(year: i32, month: u32, day: u32, hours: u32, minutes: u32) -> Self {
        Self {
            year,
            month,
            day,
            hours,
            minutes,
        }
    }

    /// Resolve into a concrete date-time, rejecting impossible dates such as February 30th.
    pub fn at(self, seconds: Option<u32>) -> Result<NaiveDateTime, ConfigError> {
        let seconds = seconds.unwrap_or(0);
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hours, self.minutes, seconds))
            .ok_or_else(|| ConfigError::InvalidSchedule {
                input: format!(
                    "{}-{}-{} {}:{}:{}",
                    self.year, self.month, self.day, self.hours, self.minutes, seconds
                ),
            })
    }
}

/// `YYYY-MM-DD HH:MM:SS`, every component zero-padded.
pub fn format_padded(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `M/D/YYYY H:M` without padding.
pub fn format_unpadded(at: &NaiveDateTime) -> String {
    format!(
        "{}/{}/{} {}:{}",
        at.month(),
        at.day(),
        at.year(),
        at.hour(),
        at.minute()
    )
}
