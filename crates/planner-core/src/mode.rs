use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime::format_total_minutes;
use crate::task::{TaskDraft, TimeUnit};

/// Which planner a task list belongs to. Each mode decides which draft
/// fields are required and which aggregate the stats panel shows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMode {
    #[default]
    Generic,
    Fitness,
    Study,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Text,
    Subject,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task text is required")]
    MissingText,
    #[error("subject is required")]
    MissingSubject,
    #[error("duration must be a whole number greater than zero")]
    InvalidDuration,
}

impl ValidationError {
    /// Input the user should be sent back to.
    pub fn field(self) -> DraftField {
        match self {
            ValidationError::MissingText => DraftField::Text,
            ValidationError::MissingSubject => DraftField::Subject,
            ValidationError::InvalidDuration => DraftField::Duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDuration {
    pub value: i64,
    pub unit: TimeUnit,
    pub minutes: f64,
    pub display: String,
}

/// A draft that passed mode validation, trimmed and normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub text: String,
    pub subject: Option<String>,
    pub duration: Option<NormalizedDuration>,
}

impl PlannerMode {
    pub const ALL: [PlannerMode; 3] = [PlannerMode::Generic, PlannerMode::Fitness, PlannerMode::Study];

    pub fn as_key(self) -> &'static str {
        match self {
            PlannerMode::Generic => "generic",
            PlannerMode::Fitness => "fitness",
            PlannerMode::Study => "study",
        }
    }

    pub fn has_duration(self) -> bool {
        matches!(self, PlannerMode::Fitness | PlannerMode::Study)
    }

    pub fn has_subject(self) -> bool {
        matches!(self, PlannerMode::Study)
    }

    pub fn has_timer(self) -> bool {
        matches!(self, PlannerMode::Study)
    }

    /// Whether an aggregate of exactly N hours drops the `0min` remainder.
    pub fn suppresses_zero_minutes(self) -> bool {
        matches!(self, PlannerMode::Study)
    }

    pub fn format_total_minutes(self, total: f64) -> String {
        format_total_minutes(total, self.suppresses_zero_minutes())
    }

    /// Checks the draft fields in form order: text, subject, duration.
    pub fn validate(self, draft: &TaskDraft) -> Result<ValidDraft, ValidationError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(ValidationError::MissingText);
        }

        let subject = if self.has_subject() {
            let subject = draft.subject.as_deref().map(str::trim).unwrap_or_default();
            if subject.is_empty() {
                return Err(ValidationError::MissingSubject);
            }
            Some(subject.to_string())
        } else {
            None
        };

        let duration = if self.has_duration() {
            let input = draft
                .duration
                .filter(|input| input.value > 0)
                .ok_or(ValidationError::InvalidDuration)?;
            let minutes = input
                .unit
                .to_minutes(input.value)
                .ok_or(ValidationError::InvalidDuration)?;
            Some(NormalizedDuration {
                value: input.value,
                unit: input.unit,
                minutes,
                display: input.unit.display(input.value),
            })
        } else {
            None
        };

        Ok(ValidDraft {
            text: text.to_string(),
            subject,
            duration,
        })
    }
}

impl FromStr for PlannerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "daily" => Ok(PlannerMode::Generic),
            "fitness" => Ok(PlannerMode::Fitness),
            "study" => Ok(PlannerMode::Study),
            other => Err(anyhow!("unknown planner mode: {other}")),
        }
    }
}

impl fmt::Display for PlannerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DurationInput;

    fn draft(text: &str, subject: Option<&str>, duration: Option<(i64, TimeUnit)>) -> TaskDraft {
        TaskDraft {
            text: text.to_string(),
            subject: subject.map(str::to_string),
            duration: duration.map(|(value, unit)| DurationInput { value, unit }),
        }
    }

    #[test]
    fn generic_only_needs_text() {
        let valid = PlannerMode::Generic
            .validate(&draft("  buy milk ", None, None))
            .expect("valid generic draft");
        assert_eq!(valid.text, "buy milk");
        assert!(valid.duration.is_none());
        assert!(valid.subject.is_none());

        assert_eq!(
            PlannerMode::Generic.validate(&draft("   ", None, None)),
            Err(ValidationError::MissingText)
        );
    }

    #[test]
    fn fitness_seconds_become_fractional_minutes() {
        let valid = PlannerMode::Fitness
            .validate(&draft("Plank", None, Some((90, TimeUnit::Second))))
            .expect("valid fitness draft");
        let duration = valid.duration.expect("duration kept");
        assert_eq!(duration.minutes, 1.5);
        assert_eq!(duration.display, "90s");
    }

    #[test]
    fn fitness_rejects_missing_or_zero_duration() {
        let err = PlannerMode::Fitness
            .validate(&draft("Run", None, Some((0, TimeUnit::Minute))))
            .expect_err("zero duration");
        assert_eq!(err.field(), DraftField::Duration);
        assert_eq!(
            PlannerMode::Fitness.validate(&draft("Run", None, None)),
            Err(ValidationError::InvalidDuration)
        );
    }

    #[test]
    fn oversized_hour_counts_are_rejected() {
        let err = PlannerMode::Fitness
            .validate(&draft(
                "Ride",
                None,
                Some((200_000_000_000_000_000, TimeUnit::Hour)),
            ))
            .expect_err("overflowing hours");
        assert_eq!(err, ValidationError::InvalidDuration);
        assert_eq!(err.field(), DraftField::Duration);
    }

    #[test]
    fn study_checks_subject_before_duration() {
        let err = PlannerMode::Study
            .validate(&draft("Chapter 3", Some(" "), None))
            .expect_err("subject missing");
        assert_eq!(err.field(), DraftField::Subject);

        let valid = PlannerMode::Study
            .validate(&draft("Chapter 3", Some("Math"), Some((2, TimeUnit::Hour))))
            .expect("valid study draft");
        assert_eq!(valid.subject.as_deref(), Some("Math"));
        let duration = valid.duration.expect("duration kept");
        assert_eq!(duration.minutes, 120.0);
        assert_eq!(duration.display, "2h");
    }

    #[test]
    fn text_is_checked_first_in_every_mode() {
        for mode in PlannerMode::ALL {
            assert_eq!(
                mode.validate(&draft("", None, None)),
                Err(ValidationError::MissingText)
            );
        }
    }

    #[test]
    fn daily_is_an_alias_of_generic() {
        assert_eq!("daily".parse::<PlannerMode>().expect("alias"), PlannerMode::Generic);
        assert!("cooking".parse::<PlannerMode>().is_err());
    }

    #[test]
    fn zero_minute_suppression_is_study_only() {
        assert_eq!(PlannerMode::Study.format_total_minutes(120.0), "2h");
        assert_eq!(PlannerMode::Fitness.format_total_minutes(120.0), "2h 0min");
    }
}
