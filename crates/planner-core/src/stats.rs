use std::collections::HashSet;

use serde::Serialize;

use crate::mode::PlannerMode;
use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayStats {
    pub total: usize,
    pub completed: usize,
    pub percentage: u32,
}

impl DayStats {
    pub fn from_counts(completed: usize, total: usize) -> Self {
        Self {
            total,
            completed,
            percentage: completion_percentage(completed, total),
        }
    }
}

/// Mode-specific panel: fitness shows training time, study shows study
/// time and how many distinct subjects were covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModeAggregate {
    Fitness {
        total_minutes: f64,
        display: String,
    },
    Study {
        total_minutes: f64,
        display: String,
        subjects: usize,
    },
}

pub fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u32
}

pub fn day_stats(tasks: &[&Task]) -> DayStats {
    let completed = tasks.iter().filter(|task| task.completed).count();
    DayStats::from_counts(completed, tasks.len())
}

/// Sum of `minutes` over completed tasks; tasks without a duration count as 0.
pub fn completed_minutes(tasks: &[&Task]) -> f64 {
    tasks
        .iter()
        .filter(|task| task.completed)
        .map(|task| task.minutes.unwrap_or(0.0))
        .sum()
}

pub fn distinct_subjects(tasks: &[&Task]) -> usize {
    tasks
        .iter()
        .filter(|task| task.completed)
        .filter_map(|task| task.subject.as_deref())
        .map(str::to_lowercase)
        .collect::<HashSet<_>>()
        .len()
}

pub fn mode_aggregate(mode: PlannerMode, tasks: &[&Task]) -> Option<ModeAggregate> {
    match mode {
        PlannerMode::Generic => None,
        PlannerMode::Fitness => {
            let total_minutes = completed_minutes(tasks);
            Some(ModeAggregate::Fitness {
                total_minutes,
                display: mode.format_total_minutes(total_minutes),
            })
        }
        PlannerMode::Study => {
            let total_minutes = completed_minutes(tasks);
            Some(ModeAggregate::Study {
                total_minutes,
                display: mode.format_total_minutes(total_minutes),
                subjects: distinct_subjects(tasks),
            })
        }
    }
}
