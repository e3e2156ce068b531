use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::datetime::to_utc_from_local;
use crate::mode::{PlannerMode, ValidationError};
use crate::remote::{Partition, RemoteStore};
use crate::sync::SaveQueue;
use crate::task::{Task, TaskDraft, TaskId};
use crate::timer::TimerOutcome;

/// In-memory task list of one partition, mirrored to the remote store
/// after every mutation.
pub struct TaskStore {
    tasks: Vec<Task>,
    partition: Option<Partition>,
    tz: Tz,
    queue: Option<SaveQueue>,
    last_id: TaskId,
}

impl TaskStore {
    /// Store with no signed-in user. Mutations work but are never saved.
    pub fn detached(tz: Tz) -> Self {
        Self {
            tasks: Vec::new(),
            partition: None,
            tz,
            queue: None,
            last_id: 0,
        }
    }

    /// Loads `partition` from `remote`. Any failure leaves the store empty.
    #[instrument(skip(remote, tz), fields(user = %partition.user, mode = %partition.mode))]
    pub async fn load(remote: Arc<dyn RemoteStore>, partition: Partition, tz: Tz) -> Self {
        let tasks = match remote.load(&partition).await {
            Ok(tasks) => {
                info!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Err(err) => {
                warn!(error = %err, "failed to load tasks; starting empty");
                Vec::new()
            }
        };
        let last_id = tasks.iter().map(|task| task.id).max().unwrap_or(0);

        Self {
            tasks,
            partition: Some(partition),
            tz,
            queue: Some(SaveQueue::spawn(remote)),
            last_id,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Time-based id, strictly greater than any id handed out before.
    pub fn next_id(&mut self, now: DateTime<Utc>) -> TaskId {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.day(&self.tz) == date)
            .collect()
    }

    /// Tasks of `date`, newest first.
    pub fn day_list(&self, date: NaiveDate) -> Vec<&Task> {
        let mut tasks = self.tasks_for_date(date);
        tasks.sort_by(|a, b| b.date.cmp(&a.date));
        tasks
    }

    pub fn has_tasks_on(&self, date: NaiveDate) -> bool {
        self.tasks.iter().any(|task| task.day(&self.tz) == date)
    }

    /// Validates `draft` for `mode` and appends it under `selected`, stamped
    /// with the current local hour and minute.
    pub fn add(
        &mut self,
        mode: PlannerMode,
        draft: &TaskDraft,
        selected: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TaskId, ValidationError> {
        let valid = mode.validate(draft)?;
        let id = self.next_id(now);

        let local_now = now.with_timezone(&self.tz);
        let clock = NaiveTime::from_hms_opt(local_now.hour(), local_now.minute(), 0)
            .unwrap_or(NaiveTime::MIN);
        let date = to_utc_from_local(selected.and_time(clock), &self.tz)
            .or_else(|err| {
                debug!(error = %err, "local time skipped; falling back to noon");
                to_utc_from_local(selected.and_time(noon()), &self.tz)
            })
            .unwrap_or(now);

        let (minutes, time_value, time_unit, time_display) = match valid.duration {
            Some(d) => (Some(d.minutes), Some(d.value), Some(d.unit), Some(d.display)),
            None => (None, None, None, None),
        };

        self.tasks.push(Task {
            id,
            text: valid.text,
            completed: false,
            date,
            time: local_now.format("%H:%M").to_string(),
            minutes,
            time_value,
            time_unit,
            time_display,
            subject: valid.subject,
        });
        info!(task_id = id, mode = %mode, %selected, "added task");
        self.save();
        Ok(id)
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!(task_id = id, "toggle ignored; no such task");
            return false;
        };
        task.completed = !task.completed;
        info!(task_id = id, completed = task.completed, "toggled task");
        self.save();
        true
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!(task_id = id, "remove ignored; no such task");
            return false;
        }
        info!(task_id = id, "removed task");
        self.save();
        true
    }

    /// Drops completed tasks of `date`. Returns how many went away.
    pub fn clear_completed(&mut self, date: NaiveDate) -> usize {
        let tz = self.tz;
        let before = self.tasks.len();
        self.tasks
            .retain(|task| !(task.completed && task.day(&tz) == date));
        let removed = before - self.tasks.len();
        if removed > 0 {
            info!(removed, %date, "cleared completed tasks");
            self.save();
        }
        removed
    }

    /// Marks the timed task done with the measured duration.
    pub fn apply_timer_outcome(&mut self, outcome: &TimerOutcome) -> bool {
        let Some(task) = self
            .tasks
            .iter_mut()
            .find(|task| task.id == outcome.task_id)
        else {
            warn!(task_id = outcome.task_id, "timed task disappeared before stop");
            return false;
        };
        task.completed = true;
        task.minutes = Some(outcome.minutes as f64);
        task.time_display = Some(outcome.display.clone());
        info!(task_id = outcome.task_id, minutes = outcome.minutes, "recorded timed session");
        self.save();
        true
    }

    /// Queues a full replace of the partition. Skipped without a user.
    pub fn save(&self) {
        match (&self.queue, &self.partition) {
            (Some(queue), Some(partition)) => {
                queue.enqueue(partition.clone(), self.tasks.clone());
            }
            _ => debug!("no signed-in user; skipping save"),
        }
    }

    /// Waits until every queued save has been attempted.
    pub async fn flush(&self) {
        if let Some(queue) = &self.queue {
            queue.flush().await;
        }
    }
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}
