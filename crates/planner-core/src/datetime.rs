use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "planner-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "PLANNER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "PLANNER_TIME_CONFIG";
const DEFAULT_PLANNER_TIMEZONE: &str =
  "America/Sao_Paulo";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Time zone used to decide which
/// calendar day a task belongs to.
pub fn planner_timezone() -> Tz {
  static PLANNER_TZ: OnceLock<Tz> =
    OnceLock::new();
  *PLANNER_TZ.get_or_init(
    resolve_planner_timezone
  )
}

#[must_use]
pub fn local_date(
  dt: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  dt.with_timezone(tz).date_naive()
}

fn resolve_planner_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PLANNER_TIMEZONE,
    "DEFAULT_PLANNER_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured planner timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Resolves a wall-clock time in `tz`
/// to UTC. Ambiguous times pick the
/// earlier instant.
pub fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime {local_naive} \
         does not exist in {tz}"
      ))
    }
  }
}

/// Parses `today`, `tomorrow`,
/// `yesterday` or `YYYY-MM-DD`.
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  match token
    .to_ascii_lowercase()
    .as_str()
  {
    | "today" => Ok(today),
    | "tomorrow" => Ok(add_days(today, 1)),
    | "yesterday" => {
      Ok(add_days(today, -1))
    }
    | _ => {
      NaiveDate::parse_from_str(
        token, "%Y-%m-%d"
      )
      .with_context(|| {
        format!(
          "invalid date `{token}`; \
           expected YYYY-MM-DD"
        )
      })
    }
  }
}

/// Parses `YYYY-MM` into the first day
/// of that month.
pub fn parse_month_arg(
  input: &str
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let (year, month) = token
    .split_once('-')
    .ok_or_else(|| {
      anyhow!(
        "invalid month `{token}`; \
         expected YYYY-MM"
      )
    })?;
  let year: i32 = year
    .parse()
    .with_context(|| {
      format!("invalid year in `{token}`")
    })?;
  let month: u32 = month
    .parse()
    .with_context(|| {
      format!(
        "invalid month in `{token}`"
      )
    })?;
  NaiveDate::from_ymd_opt(year, month, 1)
    .ok_or_else(|| {
      anyhow!(
        "month out of range: {token}"
      )
    })
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Moves to the first day of the month
/// `months` away from `date`.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  first_day_of_month(year, month as u32)
}

/// Formats a number the way the planner
/// has always shown durations: integral
/// values without a fraction.
pub fn format_number(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{value:.0}")
  } else {
    format!("{value}")
  }
}

/// `HH:MM:SS` for a stopwatch reading.
pub fn format_elapsed(
  total_seconds: u64
) -> String {
  let hours = total_seconds / 3600;
  let minutes =
    (total_seconds % 3600) / 60;
  let seconds = total_seconds % 60;
  format!(
    "{hours:02}:{minutes:02}:{seconds:02}"
  )
}

/// Formats an amount of minutes as
/// `"{h}h {m}min"` from one hour up, or
/// `"{m} min"` below. With
/// `suppress_zero_minutes` a whole number
/// of hours renders as `"{h}h"`.
pub fn format_total_minutes(
  total: f64,
  suppress_zero_minutes: bool
) -> String {
  if total >= 60.0 {
    let hours = (total / 60.0).floor();
    let minutes = total % 60.0;
    if suppress_zero_minutes
      && minutes <= 0.0
    {
      format!(
        "{}h",
        format_number(hours)
      )
    } else {
      format!(
        "{}h {}min",
        format_number(hours),
        format_number(minutes)
      )
    }
  } else {
    format!(
      "{} min",
      format_number(total)
    )
  }
}
