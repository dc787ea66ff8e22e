//! UI task queue for deferred and periodic work.
//!
//! The scheduler backs every deferral a popup needs: throttled callbacks,
//! fixed-cadence repositioning ticks and "run on the next turn of the queue"
//! relayouts. It is driven by the host's event loop calling
//! [`SharedTaskScheduler::process_ready`] whenever
//! [`SharedTaskScheduler::time_until_next`] elapses.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_suggest_core::{ManualClock, SharedTaskScheduler};
//!
//! let clock = ManualClock::new();
//! let scheduler = SharedTaskScheduler::with_clock(Arc::new(clock.clone()));
//!
//! scheduler.schedule_once(Duration::from_millis(200), || println!("fired"));
//!
//! clock.advance(Duration::from_millis(200));
//! assert_eq!(scheduler.process_ready(), 1);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulerError};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a scheduled task.
    pub struct ScheduledTaskId;
}

/// The type of scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTaskKind {
    /// Executes once at the scheduled time.
    OneShot,
    /// Executes repeatedly at the specified interval.
    Repeating,
}

/// Smallest interval accepted for repeating tasks.
const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// A boxed task closure.
type BoxedScheduledTask = Box<dyn FnMut() + Send + 'static>;

/// Internal scheduled task data.
struct ScheduledTaskData {
    /// When this task should next execute.
    next_run: Instant,
    /// The interval for repeating tasks.
    interval: Duration,
    /// The kind of task.
    kind: ScheduledTaskKind,
    /// The task closure. `None` while the closure is executing.
    task: Option<BoxedScheduledTask>,
}

/// An entry in the scheduler queue (min-heap by execution time, then FIFO).
#[derive(Debug, Clone, Copy)]
struct SchedulerQueueEntry {
    id: ScheduledTaskId,
    run_time: Instant,
    seq: u64,
}

impl PartialEq for SchedulerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time && self.seq == other.seq
    }
}

impl Eq for SchedulerQueueEntry {}

impl PartialOrd for SchedulerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .run_time
            .cmp(&self.run_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A task that is due, taken out of the scheduler for execution.
struct ReadyTask {
    id: ScheduledTaskId,
    run_time: Instant,
    task: BoxedScheduledTask,
}

/// Manages scheduled tasks for a single UI queue.
///
/// The scheduler maintains a priority queue of tasks ordered by their next
/// execution time. Tasks can be one-shot (execute once) or repeating
/// (execute at regular intervals).
pub struct TaskScheduler {
    /// Source of the current time.
    clock: Arc<dyn Clock>,
    /// All registered scheduled tasks.
    tasks: SlotMap<ScheduledTaskId, ScheduledTaskData>,
    /// Priority queue of pending task executions (min-heap by run time).
    queue: BinaryHeap<SchedulerQueueEntry>,
    /// Insertion counter used to keep equal run times in FIFO order.
    next_seq: u64,
}

impl TaskScheduler {
    /// Create a new task scheduler driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new task scheduler driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// The current time according to this scheduler's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    fn push_entry(&mut self, id: ScheduledTaskId, run_time: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(SchedulerQueueEntry { id, run_time, seq });
    }

    fn insert(
        &mut self,
        next_run: Instant,
        interval: Duration,
        kind: ScheduledTaskKind,
        task: BoxedScheduledTask,
    ) -> ScheduledTaskId {
        let id = self.tasks.insert(ScheduledTaskData {
            next_run,
            interval,
            kind,
            task: Some(task),
        });
        self.push_entry(id, next_run);
        id
    }

    /// Schedule a one-shot task to execute after the specified delay.
    ///
    /// A zero delay runs the task on the next call to
    /// [`process_ready`](Self::process_ready).
    pub fn schedule_once<F>(&mut self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        let next_run = self.now() + delay;
        self.insert(next_run, delay, ScheduledTaskKind::OneShot, Box::new(task))
    }

    /// Schedule a task to execute at a specific instant.
    ///
    /// If the instant is in the past, the task will execute on the next
    /// scheduler processing cycle.
    pub fn schedule_at<F>(&mut self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.insert(
            instant,
            Duration::ZERO,
            ScheduledTaskKind::OneShot,
            Box::new(task),
        )
    }

    /// Schedule a repeating task that executes at the specified interval.
    ///
    /// The first execution occurs after `interval`. Intervals shorter than
    /// one millisecond are clamped.
    pub fn schedule_repeating<F>(&mut self, interval: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        let next_run = self.now() + interval;
        self.insert(
            next_run,
            interval,
            ScheduledTaskKind::Repeating,
            Box::new(task),
        )
    }

    /// Cancel and remove a scheduled task.
    ///
    /// Cancelling a task from inside its own body is allowed; it will not be
    /// rescheduled.
    pub fn cancel(&mut self, id: ScheduledTaskId) -> Result<()> {
        match self.remove_task(id) {
            Some(_) => Ok(()),
            None => Err(SchedulerError::InvalidTaskId.into()),
        }
    }

    /// Remove a task, handing its closure back so it can be dropped outside
    /// any lock guarding the scheduler.
    fn remove_task(&mut self, id: ScheduledTaskId) -> Option<Option<BoxedScheduledTask>> {
        self.tasks.remove(id).map(|data| data.task)
    }

    /// Reschedule an existing task with a new delay.
    ///
    /// For repeating tasks, this resets the schedule with the current time as base.
    pub fn reschedule(&mut self, id: ScheduledTaskId, delay: Duration) -> Result<()> {
        let next_run = self.now() + delay;
        if let Some(task) = self.tasks.get_mut(id) {
            task.next_run = next_run;
            // The old queue entry is skipped when processed.
            self.push_entry(id, next_run);
            Ok(())
        } else {
            Err(SchedulerError::InvalidTaskId.into())
        }
    }

    /// Check if a scheduled task is still pending.
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Drop queue entries that refer to cancelled or rescheduled tasks.
    fn prune_front(&mut self) {
        while let Some(entry) = self.queue.peek() {
            let live = self
                .tasks
                .get(entry.id)
                .is_some_and(|t| t.next_run == entry.run_time);
            if live {
                break;
            }
            self.queue.pop();
        }
    }

    /// Get the duration until the next task should execute, if any.
    ///
    /// Returns `None` if there are no active scheduled tasks.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.prune_front();
        let now = self.now();
        self.queue
            .peek()
            .map(|entry| entry.run_time.saturating_duration_since(now))
    }

    /// Take the next task that is due at `now` and was queued before
    /// `seq_limit`.
    fn take_ready(&mut self, now: Instant, seq_limit: u64) -> Option<ReadyTask> {
        loop {
            self.prune_front();
            let entry = *self.queue.peek()?;
            if entry.run_time > now || entry.seq >= seq_limit {
                return None;
            }
            self.queue.pop();

            let Some(data) = self.tasks.get_mut(entry.id) else {
                continue;
            };
            // A task that is already executing cannot be re-entered.
            let Some(task) = data.task.take() else {
                continue;
            };
            return Some(ReadyTask {
                id: entry.id,
                run_time: entry.run_time,
                task,
            });
        }
    }

    /// Put a task back after it ran, rescheduling or removing it.
    ///
    /// Returns the closure when it is finished with, so the caller decides
    /// where it gets dropped.
    fn finish(&mut self, ready: ReadyTask, now: Instant) -> Option<BoxedScheduledTask> {
        let ReadyTask { id, run_time, task } = ready;
        let Some(data) = self.tasks.get_mut(id) else {
            // Cancelled while running.
            return Some(task);
        };

        match data.kind {
            ScheduledTaskKind::OneShot => {
                if data.next_run == run_time {
                    self.tasks.remove(id);
                    return Some(task);
                }
                // Rescheduled from inside its own body.
                data.task = Some(task);
            }
            ScheduledTaskKind::Repeating => {
                data.task = Some(task);
                if data.next_run == run_time {
                    // Use the scheduled time as base to avoid drift, but skip
                    // missed runs rather than bursting to catch up.
                    let mut next_run = run_time + data.interval;
                    if next_run <= now {
                        next_run = now + data.interval;
                    }
                    data.next_run = next_run;
                    self.push_entry(id, next_run);
                }
            }
        }
        None
    }

    /// Process all tasks that should execute now.
    ///
    /// Tasks scheduled while processing run on the next call. Returns the
    /// number of tasks that were executed.
    #[tracing::instrument(
        skip(self),
        target = "horizon_suggest_core::scheduler",
        level = "trace"
    )]
    pub fn process_ready(&mut self) -> usize {
        let now = self.now();
        let seq_limit = self.next_seq;
        let mut executed_count = 0;

        while let Some(mut ready) = self.take_ready(now, seq_limit) {
            tracing::trace!(target: targets::SCHEDULER, id = ?ready.id, "executing scheduled task");
            (ready.task)();
            executed_count += 1;
            let _finished = self.finish(ready, now);
        }

        executed_count
    }

    /// Get the number of pending scheduled tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Check if there are any tasks ready to execute now.
    pub fn has_ready(&mut self) -> bool {
        self.prune_front();
        let now = self.now();
        self.queue.peek().is_some_and(|entry| entry.run_time <= now)
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe handle to a [`TaskScheduler`], shared by everything that
/// posts work to the same UI queue.
///
/// Unlike [`TaskScheduler::process_ready`], task bodies run here with the
/// lock released, so a task may schedule or cancel other tasks.
pub struct SharedTaskScheduler {
    inner: Mutex<TaskScheduler>,
}

impl SharedTaskScheduler {
    /// Create a scheduler driven by the system clock.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskScheduler::new()),
        }
    }

    /// Create a scheduler driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(TaskScheduler::with_clock(clock)),
        }
    }

    pub fn now(&self) -> Instant {
        self.inner.lock().now()
    }

    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_once(delay, task)
    }

    pub fn schedule_at<F>(&self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_at(instant, task)
    }

    pub fn schedule_repeating<F>(&self, interval: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_repeating(interval, task)
    }

    pub fn cancel(&self, id: ScheduledTaskId) -> Result<()> {
        // The closure is dropped after the lock is released; its captures may
        // touch the scheduler from their own destructors.
        let removed = self.inner.lock().remove_task(id);
        match removed {
            Some(_) => Ok(()),
            None => Err(SchedulerError::InvalidTaskId.into()),
        }
    }

    pub fn reschedule(&self, id: ScheduledTaskId, delay: Duration) -> Result<()> {
        self.inner.lock().reschedule(id, delay)
    }

    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.inner.lock().is_active(id)
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        self.inner.lock().time_until_next()
    }

    #[tracing::instrument(
        skip(self),
        target = "horizon_suggest_core::scheduler",
        level = "trace"
    )]
    pub fn process_ready(&self) -> usize {
        let (now, seq_limit) = {
            let inner = self.inner.lock();
            (inner.now(), inner.next_seq)
        };
        let mut executed_count = 0;

        loop {
            let Some(mut ready) = self.inner.lock().take_ready(now, seq_limit) else {
                break;
            };
            tracing::trace!(target: targets::SCHEDULER, id = ?ready.id, "executing scheduled task");
            (ready.task)();
            executed_count += 1;
            let finished = self.inner.lock().finish(ready, now);
            drop(finished);
        }

        executed_count
    }

    /// Run passes of [`process_ready`](Self::process_ready) until nothing
    /// is due, bounded by `max_passes`. Returns the total number of tasks run.
    pub fn run_until_idle(&self, max_passes: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_passes {
            let executed = self.process_ready();
            if executed == 0 {
                break;
            }
            total += executed;
        }
        total
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }

    pub fn has_ready(&self) -> bool {
        self.inner.lock().has_ready()
    }
}

impl Default for SharedTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(SharedTaskScheduler: Send, Sync);
