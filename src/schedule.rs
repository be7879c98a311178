use std::time::{Duration, Instant};

/// Identifies one scheduled task. Handles are never reused, so a handle
/// that has been cancelled can never match a later task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cadence {
    Once,
    Every(Duration),
}

#[derive(Debug, Clone)]
struct Task {
    handle: TaskHandle,
    due: Instant,
    cadence: Cadence,
}

/// Deadline queue for the timers owned by a single state machine.
///
/// Nothing runs in the background: the owner calls [`Scheduler::fire_due`]
/// with the current time and re-enters its own event handling for every
/// handle returned.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, now: Instant, delay: Duration) -> TaskHandle {
        self.push(now + delay, Cadence::Once)
    }

    /// Periodic task; first fires one `interval` after `now`.
    pub fn schedule_every(&mut self, now: Instant, interval: Duration) -> TaskHandle {
        let interval = interval.max(Duration::from_millis(1));
        self.push(now + interval, Cadence::Every(interval))
    }

    /// Returns true if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    pub fn is_live(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.due).min()
    }

    /// Collect every task due at `now`, earliest first.
    ///
    /// One-shot tasks are removed. Periodic tasks fire at most once per call
    /// and are re-armed past `now`, so missed periods coalesce.
    pub fn fire_due(&mut self, now: Instant) -> Vec<TaskHandle> {
        let mut due: Vec<(Instant, TaskHandle)> = self
            .tasks
            .iter()
            .filter(|t| t.due <= now)
            .map(|t| (t.due, t.handle))
            .collect();
        due.sort();

        self.tasks.retain(|t| t.due > now || t.cadence != Cadence::Once);
        for task in self.tasks.iter_mut() {
            if let Cadence::Every(interval) = task.cadence {
                while task.due <= now {
                    task.due += interval;
                }
            }
        }

        due.into_iter().map(|(_, handle)| handle).collect()
    }

    fn push(&mut self, due: Instant, cadence: Cadence) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.tasks.push(Task {
            handle,
            due,
            cadence,
        });
        handle
    }
}
