use super::actor::ActorId;

const MIN_REPEAT_INTERVAL: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TaskId(u64);

/// What a deferred task refers to. Tasks whose target has gone away are dropped
/// instead of fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskTarget {
    None,
    Actor(ActorId),
}

#[derive(Debug)]
struct ScheduledTask<T> {
    id: TaskId,
    due: f64,
    interval: Option<f64>,
    target: TaskTarget,
    payload: T,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DueTask<T> {
    pub(crate) id: TaskId,
    pub(crate) target: TaskTarget,
    pub(crate) payload: T,
}

/// Session-owned timer list driven by simulation time. Everything pending is
/// cancelled when the session ends, so no callback outlives it.
#[derive(Debug)]
pub(crate) struct TaskScheduler<T> {
    next_id: u64,
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T: Clone> TaskScheduler<T> {
    pub(crate) fn schedule_at(&mut self, due: f64, target: TaskTarget, payload: T) -> TaskId {
        self.push(due, None, target, payload)
    }

    pub(crate) fn schedule_every(
        &mut self,
        first_due: f64,
        interval: f64,
        target: TaskTarget,
        payload: T,
    ) -> TaskId {
        let interval = if interval.is_finite() {
            interval.max(MIN_REPEAT_INTERVAL)
        } else {
            MIN_REPEAT_INTERVAL
        };
        self.push(first_due, Some(interval), target, payload)
    }

    fn push(&mut self, due: f64, interval: Option<f64>, target: TaskTarget, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.tasks.push(ScheduledTask {
            id,
            due: if due.is_finite() { due } else { 0.0 },
            interval,
            target,
            payload,
        });
        id
    }

    pub(crate) fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub(crate) fn cancel_all(&mut self) -> usize {
        let cancelled = self.tasks.len();
        self.tasks.clear();
        cancelled
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Moves every task due at `now` into `out`, ordered by due time then by
    /// scheduling order. One-shot tasks are consumed. Repeating tasks fire at
    /// most once per drain and are re-armed from their previous due time.
    /// Tasks for which `is_target_live` returns `false` are discarded.
    pub(crate) fn drain_due(
        &mut self,
        now: f64,
        is_target_live: impl Fn(TaskTarget) -> bool,
        out: &mut Vec<DueTask<T>>,
    ) {
        let mut kept = Vec::with_capacity(self.tasks.len());
        let mut fired: Vec<(f64, DueTask<T>)> = Vec::new();

        for mut task in self.tasks.drain(..) {
            if task.due > now {
                kept.push(task);
                continue;
            }
            if !is_target_live(task.target) {
                continue;
            }
            fired.push((
                task.due,
                DueTask {
                    id: task.id,
                    target: task.target,
                    payload: task.payload.clone(),
                },
            ));
            if let Some(interval) = task.interval {
                task.due += interval;
                if task.due <= now {
                    task.due = now + interval;
                }
                kept.push(task);
            }
        }

        self.tasks = kept;
        fired.sort_by(|(a_due, a), (b_due, b)| a_due.total_cmp(b_due).then(a.id.cmp(&b.id)));
        out.extend(fired.into_iter().map(|(_, task)| task));
    }
}
