//! src/pipeline/buffer.rs
//!
//! The shared, soft-bounded buffer between producer workers and consumers.
//!
//! One mutex guards the queued items, the producer-defined shared state
//! (`S`, e.g. a file cursor) and the pipeline fault. Two condition variables
//! hang off it:
//! - `not_empty`: consumers wait here for items.
//! - `not_full`: producers wait here for room below capacity.
//!
//! Waiters always re-check the buffer after waking, so spurious wakeups and
//! notifications that race with other threads are harmless.

use anyhow::Error;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Inner<T, S> {
    items: VecDeque<T>,
    state: S,
    fault: Option<Error>,
}

/// Buffer shared by every worker of a [`Pipeline`](super::Pipeline).
///
/// Capacity is a soft limit: workers check for room before producing and
/// append afterwards, so concurrent workers can push the length past
/// `capacity` by up to one production each.
pub struct PipelineBuffer<T, S = ()> {
    inner: Mutex<Inner<T, S>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl<T, S> PipelineBuffer<T, S> {
    pub(crate) fn new(capacity: usize, state: S, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                state,
                fault: None,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            shutdown,
        }
    }

    // A panicking producer never holds this lock, so a poisoned mutex still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner<T, S>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of buffered items. Advisory: it may be stale by the
    /// time the caller acts on it.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `false` once the pipeline has been shut down or has failed.
    pub fn is_alive(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    /// The flag shared with the worker pool.
    pub(crate) fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Runs `f` with exclusive access to the shared state and the queued
    /// items, in a single critical section.
    ///
    /// Producers use this to advance shared cursors; callers use it for
    /// operations that must reset buffered results atomically (reshuffles).
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S, &mut VecDeque<T>) -> R) -> R {
        let result = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            f(&mut inner.state, &mut inner.items)
        };
        // `f` may have drained items.
        self.not_full.notify_all();
        result
    }

    /// Blocks until the buffer is below capacity.
    ///
    /// Each wait is bounded by `idle_interval` so the shutdown flag is
    /// observed even without a notification. Returns `false` once the
    /// pipeline is no longer alive.
    pub(crate) fn wait_for_room(&self, idle_interval: Duration) -> bool {
        let mut guard = self.lock();
        loop {
            if !self.is_alive() {
                return false;
            }
            if guard.items.len() < self.capacity {
                return true;
            }
            guard = self
                .not_full
                .wait_timeout(guard, idle_interval)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    /// Appends items in order. If the pipeline stopped while they were being
    /// produced they are dropped and `false` is returned.
    pub(crate) fn push_all(&self, items: impl IntoIterator<Item = T>) -> bool {
        {
            let mut guard = self.lock();
            if !self.is_alive() {
                return false;
            }
            guard.items.extend(items);
        }
        self.not_empty.notify_all();
        true
    }

    /// Pops the oldest item without waiting.
    pub(crate) fn try_pop(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Pops the oldest item, waiting for one to arrive.
    ///
    /// With a `deadline` the wait gives up once it passes. Returns `None`
    /// when the deadline passes or the pipeline stops.
    pub(crate) fn pop_wait(&self, deadline: Option<Instant>) -> Option<T> {
        let mut guard = self.lock();
        loop {
            if !self.is_alive() {
                return None;
            }
            if let Some(item) = guard.items.pop_front() {
                drop(guard);
                self.not_full.notify_one();
                return Some(item);
            }
            guard = match deadline {
                None => self
                    .not_empty
                    .wait(guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.not_empty
                        .wait_timeout(guard, remaining)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
            };
        }
    }

    /// Stops the pipeline: flips the shutdown flag, drops every buffered
    /// item and wakes all waiters.
    pub(crate) fn close(&self) {
        {
            let mut guard = self.lock();
            self.shutdown.store(true, Ordering::Release);
            guard.items.clear();
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Records the first fatal error and stops the pipeline.
    pub(crate) fn fail(&self, error: Error) {
        {
            let mut guard = self.lock();
            if guard.fault.is_none() {
                guard.fault = Some(error);
            }
        }
        self.close();
    }

    pub(crate) fn take_fault(&self) -> Option<Error> {
        self.lock().fault.take()
    }
}
