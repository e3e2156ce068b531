use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use planner_shared::{TaskPayload, TaskRow};
use serde::{Deserialize, Serialize};

use crate::datetime::local_date;

pub type TaskId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hour,
    #[serde(rename = "min")]
    Minute,
    #[serde(rename = "sec")]
    Second,
}

impl TimeUnit {
    pub fn as_key(self) -> &'static str {
        match self {
            TimeUnit::Hour => "hour",
            TimeUnit::Minute => "min",
            TimeUnit::Second => "sec",
        }
    }

    /// `None` when an hour count overflows on conversion.
    pub fn to_minutes(self, value: i64) -> Option<f64> {
        match self {
            TimeUnit::Hour => value.checked_mul(60).map(|minutes| minutes as f64),
            TimeUnit::Minute => Some(value as f64),
            TimeUnit::Second => Some(value as f64 / 60.0),
        }
    }

    pub fn display(self, value: i64) -> String {
        match self {
            TimeUnit::Hour => format!("{value}h"),
            TimeUnit::Minute => format!("{value} min"),
            TimeUnit::Second => format!("{value}s"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hours" | "h" => Ok(TimeUnit::Hour),
            "min" | "mins" | "minute" | "minutes" | "m" => Ok(TimeUnit::Minute),
            "sec" | "secs" | "second" | "seconds" | "s" => Ok(TimeUnit::Second),
            other => Err(anyhow!("unknown time unit: {other}")),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationInput {
    pub value: i64,
    pub unit: TimeUnit,
}

/// Raw form input for a new task, before mode validation.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub text: String,
    pub subject: Option<String>,
    pub duration: Option<DurationInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub date: DateTime<Utc>,
    pub time: String,
    #[serde(default)]
    pub minutes: Option<f64>,
    #[serde(default)]
    pub time_value: Option<i64>,
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,
    #[serde(default)]
    pub time_display: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl Task {
    /// Calendar day the task is listed under.
    pub fn day(&self, tz: &Tz) -> NaiveDate {
        local_date(self.date, tz)
    }

    pub fn to_payload(&self) -> TaskPayload {
        TaskPayload {
            id: self.id,
            text: self.text.clone(),
            completed: self.completed,
            date: format_wire_date(self.date),
            time: self.time.clone(),
            minutes: self.minutes,
            time_value: self.time_value,
            time_unit: self.time_unit.map(|unit| unit.as_key().to_string()),
            time_display: self.time_display.clone(),
            subject: self.subject.clone(),
        }
    }

    pub fn from_payload(payload: TaskPayload) -> anyhow::Result<Self> {
        Ok(Self {
            id: payload.id,
            date: parse_wire_date(&payload.date)
                .with_context(|| format!("task {} has an invalid date", payload.id))?,
            text: payload.text,
            completed: payload.completed,
            time: payload.time,
            minutes: payload.minutes,
            time_value: payload.time_value,
            time_unit: parse_unit(payload.time_unit.as_deref()),
            time_display: payload.time_display,
            subject: payload.subject,
        })
    }

    pub fn from_row(row: TaskRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.task_id,
            date: parse_wire_date(&row.date)
                .with_context(|| format!("task {} has an invalid date", row.task_id))?,
            completed: row.is_completed(),
            text: row.text,
            time: row.time,
            minutes: row.minutes,
            time_value: row.time_value,
            time_unit: parse_unit(row.time_unit.as_deref()),
            time_display: row.time_display,
            subject: row.subject,
        })
    }
}

/// Millisecond-precision UTC timestamp with a `Z` suffix.
pub fn format_wire_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_wire_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("failed parsing timestamp `{raw}`"))?;
    Ok(parsed.with_timezone(&Utc))
}

fn parse_unit(raw: Option<&str>) -> Option<TimeUnit> {
    let raw = raw?;
    match raw.parse::<TimeUnit>() {
        Ok(unit) => Some(unit),
        Err(err) => {
            tracing::debug!(unit = raw, error = %err, "ignoring unknown stored time unit");
            None
        }
    }
}
