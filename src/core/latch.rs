//! # Completion latch.
//!
//! A counting latch armed with the number of workers. Each worker holds a
//! [`CompletionGuard`]; dropping it counts the latch down exactly once, whether
//! the worker finished, stopped early, or unwound from a panic. [`CompletionLatch::wait`]
//! resolves once the count reaches zero.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts outstanding workers down to zero.
#[derive(Debug)]
pub struct CompletionLatch {
    remaining: AtomicUsize,
    done: Notify,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            done: Notify::new(),
        })
    }

    /// Hands out one guard. The caller must create exactly `count` guards.
    pub fn guard(self: &Arc<Self>) -> CompletionGuard {
        CompletionGuard {
            latch: Arc::clone(self),
        }
    }

    /// Outstanding completions.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Resolves once every guard has been dropped.
    pub async fn wait(&self) {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn count_down(&self) {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "completion latch counted below zero");
        if prev == 1 {
            self.done.notify_waiters();
        }
    }
}

/// Signals one worker's completion when dropped.
#[derive(Debug)]
pub struct CompletionGuard {
    latch: Arc<CompletionLatch>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
