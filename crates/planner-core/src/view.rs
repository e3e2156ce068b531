use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calendar::{DayCell, build_month_grid, month_title, selected_date_title};
use crate::datetime::format_number;
use crate::mode::PlannerMode;
use crate::stats::{DayStats, ModeAggregate, day_stats, mode_aggregate};
use crate::store::TaskStore;
use crate::task::{Task, TaskId};
use crate::timer::{TaskTimer, TimerStatus};

/// Everything a front end needs to draw one frame of the planner.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerView {
    pub mode: PlannerMode,
    pub month_title: String,
    #[serde(skip)]
    pub calendar: Vec<DayCell>,
    pub date_title: String,
    pub rows: Vec<TaskRowView>,
    pub is_empty: bool,
    pub stats: DayStats,
    pub aggregate: Option<ModeAggregate>,
    pub timer: Option<TimerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRowView {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub detail: RowDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RowDetail {
    Generic {
        time: String,
    },
    Fitness {
        duration: Option<String>,
    },
    Study {
        subject: Option<String>,
        duration: Option<String>,
        can_start_timer: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerView {
    pub task_id: TaskId,
    pub subject: Option<String>,
    pub text: String,
    pub elapsed: String,
    pub paused: bool,
    pub pause_label: &'static str,
}

pub struct ViewContext<'a> {
    pub mode: PlannerMode,
    pub store: &'a TaskStore,
    pub timer: &'a TaskTimer,
    pub focus: NaiveDate,
    pub selected: NaiveDate,
    pub today: NaiveDate,
}

pub fn render_view(ctx: &ViewContext<'_>) -> PlannerView {
    let ViewContext {
        mode,
        store,
        timer,
        focus,
        selected,
        today,
    } = *ctx;

    let calendar = build_month_grid(focus.year(), focus.month(), selected, today, |date| {
        store.has_tasks_on(date)
    });
    let day = store.day_list(selected);
    let rows: Vec<TaskRowView> = day.iter().map(|task| row_view(mode, task)).collect();

    PlannerView {
        mode,
        month_title: month_title(focus),
        calendar,
        date_title: selected_date_title(selected, today),
        is_empty: rows.is_empty(),
        rows,
        stats: day_stats(&day),
        aggregate: mode_aggregate(mode, &day),
        timer: timer_view(timer),
    }
}

pub fn row_view(mode: PlannerMode, task: &Task) -> TaskRowView {
    let detail = match mode {
        PlannerMode::Generic => RowDetail::Generic {
            time: task.time.clone(),
        },
        PlannerMode::Fitness => RowDetail::Fitness {
            duration: duration_label(task),
        },
        PlannerMode::Study => RowDetail::Study {
            subject: task.subject.clone(),
            duration: task.time_display.clone(),
            can_start_timer: !task.completed && task.time_display.is_none(),
        },
    };
    TaskRowView {
        id: task.id,
        text: task.text.clone(),
        completed: task.completed,
        detail,
    }
}

/// Stored display text, or the bare minute count for rows saved without one.
fn duration_label(task: &Task) -> Option<String> {
    task.time_display
        .clone()
        .or_else(|| task.minutes.map(|m| format!("{} min", format_number(m))))
}

fn timer_view(timer: &TaskTimer) -> Option<TimerView> {
    let session = timer.session()?;
    Some(TimerView {
        task_id: session.task_id,
        subject: session.subject.clone(),
        text: session.text.clone(),
        elapsed: timer.display(),
        paused: timer.status() == TimerStatus::Paused,
        pause_label: timer.pause_label(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::task::{DurationInput, TaskDraft, TimeUnit};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn study_draft(text: &str, subject: &str) -> TaskDraft {
        TaskDraft {
            text: text.to_string(),
            subject: Some(subject.to_string()),
            duration: Some(DurationInput {
                value: 45,
                unit: TimeUnit::Minute,
            }),
        }
    }

    #[test]
    fn empty_day_renders_zero_stats() {
        let store = TaskStore::detached(chrono_tz::UTC);
        let timer = TaskTimer::new();
        let today = ymd(2026, 10, 16);
        let view = render_view(&ViewContext {
            mode: PlannerMode::Generic,
            store: &store,
            timer: &timer,
            focus: today,
            selected: today,
            today,
        });

        assert!(view.is_empty);
        assert_eq!(view.date_title, "Today");
        assert_eq!(view.month_title, "October 2026");
        assert_eq!(view.stats, DayStats::default());
        assert!(view.aggregate.is_none());
        assert!(view.timer.is_none());
        assert_eq!(view.calendar.len(), 35);
    }

    #[test]
    fn study_rows_expose_subject_and_stats() {
        let mut store = TaskStore::detached(chrono_tz::UTC);
        let today = ymd(2026, 10, 16);
        let now = Utc
            .with_ymd_and_hms(2026, 10, 16, 9, 30, 0)
            .single()
            .expect("instant");
        let done = store
            .add(PlannerMode::Study, &study_draft("Essay", "History"), today, now)
            .expect("add");
        store
            .add(PlannerMode::Study, &study_draft("Proofs", "Math"), today, now)
            .expect("add");
        store.toggle_completed(done);

        let timer = TaskTimer::new();
        let view = render_view(&ViewContext {
            mode: PlannerMode::Study,
            store: &store,
            timer: &timer,
            focus: today,
            selected: today,
            today,
        });

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.stats.percentage, 50);
        assert_eq!(
            view.aggregate,
            Some(ModeAggregate::Study {
                total_minutes: 45.0,
                display: "45 min".to_string(),
                subjects: 1,
            })
        );
        assert!(
            view.calendar
                .iter()
                .any(|cell| cell.date == today && cell.has_tasks)
        );
        match &view.rows[0].detail {
            RowDetail::Study {
                subject,
                can_start_timer,
                ..
            } => {
                assert!(subject.is_some());
                assert!(!can_start_timer);
            }
            other => panic!("unexpected row: {other:?}"),
        }
    }

    #[test]
    fn fitness_rows_fall_back_to_minutes() {
        let task = Task {
            id: 1,
            text: "Run".to_string(),
            completed: false,
            date: Utc::now(),
            time: "07:00".to_string(),
            minutes: Some(30.0),
            time_value: None,
            time_unit: None,
            time_display: None,
            subject: None,
        };
        assert_eq!(
            row_view(PlannerMode::Fitness, &task).detail,
            RowDetail::Fitness {
                duration: Some("30 min".to_string())
            }
        );
        assert_eq!(
            row_view(PlannerMode::Study, &task).detail,
            RowDetail::Study {
                subject: None,
                duration: None,
                can_start_timer: true,
            }
        );
        assert_eq!(
            row_view(PlannerMode::Generic, &task).detail,
            RowDetail::Generic {
                time: "07:00".to_string()
            }
        );
    }
}
