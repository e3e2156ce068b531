use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::datetime::{format_elapsed, format_total_minutes};
use crate::task::{Task, TaskId};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSession {
    pub task_id: TaskId,
    pub subject: Option<String>,
    pub text: String,
    pub elapsed_seconds: u64,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("a timer is already running for task {task_id}")]
    AlreadyActive { task_id: TaskId },
    #[error("no timer is running")]
    NotActive,
}

/// What a stopped session writes back onto its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerOutcome {
    pub task_id: TaskId,
    pub elapsed_seconds: u64,
    pub minutes: u64,
    pub display: String,
}

/// Stopwatch bound to at most one task at a time.
#[derive(Debug, Default)]
pub struct TaskTimer {
    session: Option<TimerSession>,
}

impl TaskTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TimerStatus {
        match &self.session {
            None => TimerStatus::Idle,
            Some(session) if session.paused => TimerStatus::Paused,
            Some(_) => TimerStatus::Running,
        }
    }

    pub fn session(&self) -> Option<&TimerSession> {
        self.session.as_ref()
    }

    /// Binds the stopwatch to `task` with elapsed time reset. Completed
    /// tasks are ignored and yield `Ok(false)`.
    pub fn start(&mut self, task: &Task) -> Result<bool, TimerError> {
        if let Some(active) = &self.session {
            return Err(TimerError::AlreadyActive {
                task_id: active.task_id,
            });
        }
        if task.completed {
            debug!(task_id = task.id, "not timing a completed task");
            return Ok(false);
        }

        info!(task_id = task.id, "timer started");
        self.session = Some(TimerSession {
            task_id: task.id,
            subject: task.subject.clone(),
            text: task.text.clone(),
            elapsed_seconds: 0,
            paused: false,
        });
        Ok(true)
    }

    /// One second of wall time. Counts only while running.
    pub fn tick(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if !session.paused => {
                session.elapsed_seconds += 1;
                true
            }
            _ => false,
        }
    }

    pub fn pause(&mut self) -> bool {
        self.set_paused(true)
    }

    pub fn resume(&mut self) -> bool {
        self.set_paused(false)
    }

    pub fn toggle_pause(&mut self) -> TimerStatus {
        match self.status() {
            TimerStatus::Running => {
                self.pause();
            }
            TimerStatus::Paused => {
                self.resume();
            }
            TimerStatus::Idle => {}
        }
        self.status()
    }

    fn set_paused(&mut self, paused: bool) -> bool {
        match self.session.as_mut() {
            Some(session) if session.paused != paused => {
                session.paused = paused;
                debug!(task_id = session.task_id, paused, "timer pause toggled");
                true
            }
            _ => false,
        }
    }

    /// Label for the pause/resume control.
    pub fn pause_label(&self) -> &'static str {
        match self.status() {
            TimerStatus::Paused => "Resume",
            _ => "Pause",
        }
    }

    pub fn display(&self) -> String {
        format_elapsed(self.session.as_ref().map_or(0, |s| s.elapsed_seconds))
    }

    /// Ends the session. Minutes are rounded up so any started minute counts.
    pub fn stop(&mut self) -> Result<TimerOutcome, TimerError> {
        let session = self.session.take().ok_or(TimerError::NotActive)?;
        let minutes = session.elapsed_seconds.div_ceil(60);
        let outcome = TimerOutcome {
            task_id: session.task_id,
            elapsed_seconds: session.elapsed_seconds,
            minutes,
            display: format_total_minutes(minutes as f64, true),
        };
        info!(
            task_id = outcome.task_id,
            elapsed_seconds = outcome.elapsed_seconds,
            minutes = outcome.minutes,
            "timer stopped"
        );
        Ok(outcome)
    }
}

/// Background task emitting one tick per period until cancelled. Dropping
/// the handle cancels it.
#[derive(Debug)]
pub struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(period: Duration, ticks: mpsc::UnboundedSender<()>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if ticks.send(()).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("ticker stopped");
        });
        Self { cancel, handle }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn study_task(id: TaskId, completed: bool) -> Task {
        Task {
            id,
            text: "Chapter 3".to_string(),
            completed,
            date: Utc::now(),
            time: "09:00".to_string(),
            minutes: None,
            time_value: None,
            time_unit: None,
            time_display: None,
            subject: Some("Math".to_string()),
        }
    }

    #[test]
    fn one_hundred_twenty_five_ticks() {
        let mut timer = TaskTimer::new();
        assert!(timer.start(&study_task(1, false)).expect("idle timer starts"));
        for _ in 0..125 {
            assert!(timer.tick());
        }
        assert_eq!(timer.display(), "00:02:05");

        let outcome = timer.stop().expect("active timer stops");
        assert_eq!(outcome.minutes, 3);
        assert_eq!(outcome.display, "3 min");
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.display(), "00:00:00");
    }

    #[test]
    fn paused_timer_ignores_ticks() {
        let mut timer = TaskTimer::new();
        timer.start(&study_task(1, false)).expect("start");
        timer.tick();
        assert_eq!(timer.toggle_pause(), TimerStatus::Paused);
        assert_eq!(timer.pause_label(), "Resume");
        assert!(!timer.tick());
        assert!(!timer.pause());
        assert_eq!(timer.toggle_pause(), TimerStatus::Running);
        assert_eq!(timer.pause_label(), "Pause");
        timer.tick();
        assert_eq!(timer.session().expect("session").elapsed_seconds, 2);
    }

    #[test]
    fn only_one_session_at_a_time() {
        let mut timer = TaskTimer::new();
        timer.start(&study_task(1, false)).expect("start");
        assert_eq!(
            timer.start(&study_task(2, false)),
            Err(TimerError::AlreadyActive { task_id: 1 })
        );
        assert_eq!(timer.session().expect("session").task_id, 1);
    }

    #[test]
    fn completed_tasks_are_not_timed() {
        let mut timer = TaskTimer::new();
        assert_eq!(timer.start(&study_task(1, true)), Ok(false));
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.stop(), Err(TimerError::NotActive));
        assert_eq!(timer.toggle_pause(), TimerStatus::Idle);
    }

    #[test]
    fn long_sessions_show_hours() {
        let mut timer = TaskTimer::new();
        timer.start(&study_task(1, false)).expect("start");
        for _ in 0..(2 * 3600) {
            timer.tick();
        }
        assert_eq!(timer.display(), "02:00:00");
        let outcome = timer.stop().expect("stop");
        assert_eq!(outcome.minutes, 120);
        assert_eq!(outcome.display, "2h");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_ticks_every_period_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let ticker = Ticker::spawn(TICK_PERIOD, tx);

        rx.recv().await.expect("first tick");
        assert!(started.elapsed() >= TICK_PERIOD);
        rx.recv().await.expect("second tick");
        rx.recv().await.expect("third tick");
        assert!(started.elapsed() >= TICK_PERIOD * 3);

        drop(ticker);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_ticker_finishes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = Ticker::spawn(TICK_PERIOD, tx);
        ticker.cancel();
        ticker.cancel();
        assert!(ticker.is_cancelled());
        assert!(rx.recv().await.is_none());
        assert!(ticker.is_finished());
    }
}
