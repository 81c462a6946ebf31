//! Update Scheduler
//!
//! The scheduler batches re-runs. Watchers and component render effects do
//! not re-run in place when a dependency changes; they enqueue a job here
//! instead, and the queue is drained later in one flush.
//!
//! # How Flushing Works
//!
//! 1. The first job enqueued since the last flush requests a flush. With
//!    [`FlushStrategy::LocalTask`] the flush is spawned onto the current
//!    tokio `LocalSet`; with [`FlushStrategy::Manual`] the host loop calls
//!    [`flush_jobs`] (or awaits [`next_tick`]) itself.
//!
//! 2. Any number of further enqueues before the flush runs just append.
//!
//! 3. The flush takes the queue, drops duplicates (same job `Rc`) keeping the
//!    first occurrence, and runs each remaining job once in that order.
//!    The queue is emptied before any job runs, so a job that enqueues work
//!    starts a fresh batch instead of extending the one in flight.
//!
//! # Default Flush Strategy
//!
//! The default [`RuntimeConfig`](crate::RuntimeConfig) uses
//! [`FlushStrategy::Manual`]. Under it, a flush request is only recorded:
//! nothing runs queued jobs until the host calls [`flush_jobs`],
//! [`flush_until_idle`] or awaits [`next_tick`]. For automatic deferred
//! flushing, configure [`FlushStrategy::LocalTask`] and run inside a tokio
//! `LocalSet`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::config::{current_config, FlushStrategy};
use crate::error::{Result, SprigError};

/// A unit of deferred work. Identity is the `Rc` allocation.
pub type Job = Rc<dyn Fn()>;

fn job_identity(job: &Job) -> *const () {
    Rc::as_ptr(job) as *const ()
}

/// Pending flush queue.
#[derive(Default)]
pub struct UpdateScheduler {
    queue: Vec<Job>,
    flush_pending: bool,
}

impl UpdateScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Returns `true` if this is the first job since the last
    /// batch was taken, i.e. the caller should request a flush.
    pub fn enqueue(&mut self, job: Job) -> bool {
        self.queue.push(job);
        !std::mem::replace(&mut self.flush_pending, true)
    }

    /// Take the pending jobs with duplicates removed, in first-enqueued order.
    pub fn take_batch(&mut self) -> Vec<Job> {
        self.flush_pending = false;
        let mut seen = HashSet::new();
        let mut batch = std::mem::take(&mut self.queue);
        batch.retain(|job| seen.insert(job_identity(job)));
        batch
    }

    /// Number of queued entries, duplicates included.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

thread_local! {
    static SCHEDULER: RefCell<UpdateScheduler> = RefCell::new(UpdateScheduler::new());
}

/// Enqueue a job on the current thread's scheduler.
///
/// # Panics
///
/// With [`FlushStrategy::LocalTask`], panics if called outside a tokio
/// `LocalSet`.
pub fn queue_job(job: Job) {
    let first = SCHEDULER.with(|scheduler| scheduler.borrow_mut().enqueue(job));
    if first {
        request_flush();
    }
}

fn request_flush() {
    match current_config().flush {
        FlushStrategy::Manual => {
            tracing::trace!(target: "sprig::scheduler", "flush requested");
        }
        FlushStrategy::LocalTask => {
            tracing::trace!(target: "sprig::scheduler", "flush spawned");
            tokio::task::spawn_local(async {
                flush_jobs();
            });
        }
    }
}

/// Run every pending job once. Returns how many distinct jobs ran.
///
/// Jobs enqueued while the flush runs are left for the next flush.
pub fn flush_jobs() -> usize {
    let batch = SCHEDULER.with(|scheduler| scheduler.borrow_mut().take_batch());
    if batch.is_empty() {
        return 0;
    }

    tracing::debug!(target: "sprig::scheduler", jobs = batch.len(), "flush");
    for job in &batch {
        job();
    }
    batch.len()
}

/// Flush repeatedly until no jobs remain. Returns the total number of jobs
/// run.
///
/// Fails with [`SprigError::SchedulerOverflow`] if jobs are still pending
/// after `max_flush_passes` flushes, which means some job keeps scheduling
/// itself.
pub fn flush_until_idle() -> Result<usize> {
    let max_passes = current_config().max_flush_passes;
    let mut total = 0;
    for _ in 0..max_passes {
        if !has_pending_jobs() {
            return Ok(total);
        }
        total += flush_jobs();
    }

    if has_pending_jobs() {
        tracing::warn!(target: "sprig::scheduler", passes = max_passes, "scheduler did not settle");
        return Err(SprigError::SchedulerOverflow { passes: max_passes });
    }
    Ok(total)
}

/// Whether any job is waiting for a flush.
pub fn has_pending_jobs() -> bool {
    SCHEDULER.with(|scheduler| !scheduler.borrow().is_empty())
}

/// Number of queued entries, duplicates included.
pub fn pending_job_count() -> usize {
    SCHEDULER.with(|scheduler| scheduler.borrow().len())
}

/// Yield to the executor once, then flush whatever is still pending.
///
/// After this resolves, every job enqueued before the call has run.
pub async fn next_tick() -> usize {
    tokio::task::yield_now().await;
    flush_jobs()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, RuntimeConfig};
    use std::cell::Cell;

    fn counting_job(counter: &Rc<Cell<usize>>) -> Job {
        let counter = counter.clone();
        Rc::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn first_enqueue_requests_a_flush() {
        let mut scheduler = UpdateScheduler::new();
        let job: Job = Rc::new(|| {});

        assert!(scheduler.enqueue(job.clone()));
        assert!(!scheduler.enqueue(job.clone()));

        scheduler.take_batch();
        assert!(scheduler.enqueue(job));
    }

    #[test]
    fn batch_dedups_by_identity_and_keeps_order() {
        let mut scheduler = UpdateScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = |name: &'static str| -> Job {
            let log = log.clone();
            Rc::new(move || log.borrow_mut().push(name))
        };
        let (a, b) = (make("a"), make("b"));

        scheduler.enqueue(a.clone());
        scheduler.enqueue(b.clone());
        scheduler.enqueue(a.clone());

        let batch = scheduler.take_batch();
        assert_eq!(batch.len(), 2);
        assert!(scheduler.is_empty());
        for job in &batch {
            job();
        }
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn manual_default_waits_for_the_host() {
        assert_eq!(current_config().flush, FlushStrategy::Manual);
        let runs = Rc::new(Cell::new(0));

        queue_job(counting_job(&runs));
        assert_eq!(runs.get(), 0);
        assert!(has_pending_jobs());

        flush_jobs();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn same_job_three_times_runs_once() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);

        queue_job(job.clone());
        queue_job(job.clone());
        queue_job(job);

        assert_eq!(runs.get(), 0);
        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 1);
        assert!(!has_pending_jobs());
    }

    #[test]
    fn jobs_enqueued_during_a_flush_wait_for_the_next_one() {
        let runs = Rc::new(Cell::new(0));
        let inner = counting_job(&runs);
        let outer: Job = Rc::new(move || queue_job(inner.clone()));

        queue_job(outer);
        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 0);
        assert_eq!(pending_job_count(), 1);

        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn flush_until_idle_drains_follow_up_work() {
        let runs = Rc::new(Cell::new(0));
        let inner = counting_job(&runs);
        let outer: Job = Rc::new(move || queue_job(inner.clone()));

        queue_job(outer);
        assert_eq!(flush_until_idle().unwrap(), 2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn self_rescheduling_job_overflows() {
        configure(RuntimeConfig {
            max_flush_passes: 5,
            ..RuntimeConfig::default()
        });

        let slot: Rc<RefCell<Option<Job>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let job: Job = Rc::new(move || {
            if let Some(me) = s.borrow().clone() {
                queue_job(me);
            }
        });
        *slot.borrow_mut() = Some(job.clone());

        queue_job(job);
        let err = flush_until_idle().unwrap_err();
        assert!(matches!(err, SprigError::SchedulerOverflow { passes: 5 }));

        slot.borrow_mut().take();
        flush_jobs();
    }

    #[test]
    fn local_task_strategy_flushes_on_the_local_set() {
        configure(RuntimeConfig {
            flush: FlushStrategy::LocalTask,
            ..RuntimeConfig::default()
        });

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let local = tokio::task::LocalSet::new();
        let runs = Rc::new(Cell::new(0));

        local.block_on(&rt, async {
            queue_job(counting_job(&runs));
            queue_job(counting_job(&runs));
            assert_eq!(runs.get(), 0);

            tokio::task::yield_now().await;
            assert_eq!(runs.get(), 2);
        });

        configure(RuntimeConfig::default());
    }
}
