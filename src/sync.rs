//! Debounced commit scheduling.
//!
//! Each [`WriteKey`] has at most one live timer. Scheduling a commit for a
//! key that already has a timer cancels it and starts a fresh one, so a burst
//! of edits produces a single commit carrying the last value.
//!
//! # Lifecycle of a timer
//!
//! 1. [`SyncScheduler::schedule`] spawns a task that sleeps for the delay.
//! 2. A newer `schedule` for the same key aborts that task before it fires.
//! 3. When the sleep ends (or [`SyncScheduler::flush`] triggers it early),
//!    the task removes itself from the timer map. From then on it can no
//!    longer be cancelled.
//! 4. The task takes the per-key commit lock and runs the commit. A later
//!    timer for the same key waits on that lock, so commits for one key
//!    never overlap.
//!
//! Timers require a running tokio runtime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use snipdeck_core::fields::{DebounceClass, Field};
use snipdeck_core::pending::WriteKey;

/// Debounce delay per field class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceDelays {
    pub text: Duration,
    pub comment: Duration,
    pub choice: Duration,
}

impl Default for DebounceDelays {
    fn default() -> Self {
        Self {
            text: Duration::from_millis(1000),
            comment: Duration::from_millis(500),
            choice: Duration::ZERO,
        }
    }
}

impl DebounceDelays {
    pub fn for_field(&self, field: Field) -> Duration {
        match field.debounce_class() {
            DebounceClass::Text => self.text,
            DebounceClass::Comment => self.comment,
            DebounceClass::Choice => self.choice,
        }
    }
}

struct Timer {
    id: u64,
    handle: JoinHandle<()>,
    trigger: Arc<Notify>,
}

#[derive(Default)]
struct TimerTable {
    timers: HashMap<WriteKey, Timer>,
    commit_locks: HashMap<WriteKey, Arc<tokio::sync::Mutex<()>>>,
    next_id: u64,
}

struct Shared {
    table: Mutex<TimerTable>,
    outstanding: watch::Sender<usize>,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the outstanding-task count when a timer task ends or is aborted.
struct OutstandingGuard(Arc<Shared>);

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.0.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Keyed debounce timers.
#[derive(Clone)]
pub struct SyncScheduler {
    shared: Arc<Shared>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncScheduler {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(TimerTable::default()),
                outstanding,
            }),
        }
    }

    /// Run `commit` after `delay`, replacing any unfired timer for `key`.
    pub fn schedule<F, Fut>(&self, key: WriteKey, delay: Duration, commit: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut table = self.shared.table();

        if let Some(previous) = table.timers.remove(&key) {
            previous.handle.abort();
            debug!(key = %key, "superseded pending commit");
        }

        table.next_id += 1;
        let id = table.next_id;
        let trigger = Arc::new(Notify::new());

        self.shared.outstanding.send_modify(|n| *n += 1);
        let guard = OutstandingGuard(Arc::clone(&self.shared));
        let shared = Arc::clone(&self.shared);
        let task_trigger = Arc::clone(&trigger);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = task_trigger.notified() => {}
            }

            let lock = {
                let mut table = shared.table();
                match table.timers.get(&task_key) {
                    Some(timer) if timer.id == id => {}
                    _ => return,
                }
                table.timers.remove(&task_key);
                Arc::clone(table.commit_locks.entry(task_key.clone()).or_default())
            };

            trace!(key = %task_key, "commit timer fired");
            {
                let _serial = lock.lock().await;
                commit().await;
            }
            drop(lock);

            let mut table = shared.table();
            if let Some(l) = table.commit_locks.get(&task_key) {
                if Arc::strong_count(l) == 1 {
                    table.commit_locks.remove(&task_key);
                }
            }
        });

        table.timers.insert(
            key,
            Timer {
                id,
                handle,
                trigger,
            },
        );
    }

    /// True while `key` has a timer that has not fired yet.
    pub fn is_scheduled(&self, key: &WriteKey) -> bool {
        self.shared.table().timers.contains_key(key)
    }

    /// Number of timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.shared.table().timers.len()
    }

    /// Fire every pending timer now and wait until all commits have finished.
    pub async fn flush(&self) {
        {
            let table = self.shared.table();
            for timer in table.timers.values() {
                timer.trigger.notify_one();
            }
        }
        let mut rx = self.shared.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
