use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info};

use crate::datetime::{first_day_of_month, local_date, shift_months};
use crate::mode::{PlannerMode, ValidationError};
use crate::store::TaskStore;
use crate::task::{TaskDraft, TaskId};
use crate::timer::{TaskTimer, TimerError, TimerOutcome, TimerStatus};
use crate::view::{PlannerView, ViewContext, render_view};

/// One planner page: a mode, its task store, the calendar focus and the
/// study stopwatch.
pub struct PlannerApp {
    mode: PlannerMode,
    store: TaskStore,
    timer: TaskTimer,
    focus: NaiveDate,
    selected: NaiveDate,
}

impl PlannerApp {
    pub fn new(mode: PlannerMode, store: TaskStore, today: NaiveDate) -> Self {
        Self {
            mode,
            store,
            timer: TaskTimer::new(),
            focus: month_start(today),
            selected: today,
        }
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn timer(&self) -> &TaskTimer {
        &self.timer
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn focus(&self) -> NaiveDate {
        self.focus
    }

    /// Selects `date` and moves the calendar to its month.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
        self.focus = month_start(date);
        debug!(%date, "selected date");
    }

    pub fn previous_month(&mut self) {
        self.focus = shift_months(self.focus, -1);
    }

    pub fn next_month(&mut self) {
        self.focus = shift_months(self.focus, 1);
    }

    /// Shows the month of `month` without changing the selection.
    pub fn show_month(&mut self, month: NaiveDate) {
        self.focus = month_start(month);
    }

    pub fn add(&mut self, draft: &TaskDraft, now: DateTime<Utc>) -> Result<TaskId, ValidationError> {
        self.store.add(self.mode, draft, self.selected, now)
    }

    pub fn toggle(&mut self, id: TaskId) -> bool {
        self.store.toggle_completed(id)
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        self.store.remove(id)
    }

    pub fn clear_completed(&mut self) -> usize {
        self.store.clear_completed(self.selected)
    }

    /// Starts timing `id`. Missing or completed tasks are ignored.
    pub fn start_timer(&mut self, id: TaskId) -> Result<bool, TimerError> {
        if let Some(session) = self.timer.session() {
            return Err(TimerError::AlreadyActive {
                task_id: session.task_id,
            });
        }
        match self.store.get(id) {
            Some(task) => self.timer.start(task),
            None => {
                debug!(task_id = id, "timer not started; no such task");
                Ok(false)
            }
        }
    }

    pub fn tick_timer(&mut self) -> bool {
        self.timer.tick()
    }

    pub fn toggle_pause(&mut self) -> TimerStatus {
        self.timer.toggle_pause()
    }

    /// Stops the stopwatch and records the session on its task.
    pub fn stop_timer(&mut self) -> Result<TimerOutcome, TimerError> {
        let outcome = self.timer.stop()?;
        self.store.apply_timer_outcome(&outcome);
        Ok(outcome)
    }

    /// Drops the running session without touching its task.
    pub fn abandon_timer(&mut self) -> bool {
        match self.timer.stop() {
            Ok(outcome) => {
                info!(task_id = outcome.task_id, "timer abandoned");
                true
            }
            Err(_) => false,
        }
    }

    pub fn render(&self, now: DateTime<Utc>) -> PlannerView {
        let today = local_date(now, &self.store.timezone());
        render_view(&ViewContext {
            mode: self.mode,
            store: &self.store,
            timer: &self.timer,
            focus: self.focus,
            selected: self.selected,
            today,
        })
    }

    /// Waits for pending saves.
    pub async fn shutdown(self) {
        self.store.flush().await;
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date.year(), date.month())
}
