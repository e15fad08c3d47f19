// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded worker pool for per-item fan-out within one batch.
//!
//! This is not a background job system: a processor fans enrichment work out
//! across the pool, waits on the barrier, and closes the pool when the batch
//! is done. The task channel is bounded at `workers * 10`, so a producer that
//! outruns the workers blocks in `submit`. Backpressure is intentional: the
//! processor must not buffer unbounded work.
//!
//! The pool makes no ordering guarantees between tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Queue capacity multiplier per worker.
const QUEUE_FACTOR: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
}

struct Task {
    fut: Pin<Box<dyn Future<Output = ()> + Send>>,
    on_done: Option<Box<dyn FnOnce() + Send>>,
}

/// Undoes an outstanding-counter increment unless the enqueue completed.
struct PendingGuard<'a> {
    outstanding: &'a AtomicUsize,
    notify: &'a Notify,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            self.notify.notify_waiters();
        }
    }
}

/// A fixed set of workers draining a bounded task channel.
pub struct WorkerPool {
    tx: mpsc::Sender<Task>,
    outstanding: Arc<AtomicUsize>,
    notify: Arc<Notify>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `num_workers` workers (at least one) with a task queue of
    /// `num_workers * 10`.
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let (tx, rx) = mpsc::channel::<Task>(num_workers * QUEUE_FACTOR);
        let rx = Arc::new(Mutex::new(rx));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(Notify::new());

        let workers = (0..num_workers)
            .map(|_| {
                let rx = Arc::clone(&rx);
                let outstanding = Arc::clone(&outstanding);
                let notify = Arc::clone(&notify);
                tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        let Some(task) = task else { break };
                        task.fut.await;
                        if let Some(on_done) = task.on_done {
                            on_done();
                        }
                        outstanding.fetch_sub(1, Ordering::AcqRel);
                        notify.notify_waiters();
                    }
                })
            })
            .collect();

        Self {
            tx,
            outstanding,
            notify,
            workers,
        }
    }

    /// Enqueue a task. Blocks when the queue is full; returns an error only
    /// if the pool has been closed. The task receives a child of `ctx` and is
    /// expected to return early once it is cancelled.
    pub async fn submit<F, Fut>(&self, ctx: &CancellationToken, f: F) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit_task(ctx, f, None).await
    }

    /// Like [`WorkerPool::submit`], additionally running `on_done` after the
    /// task completes and before the barrier observes it.
    pub async fn submit_with_callback<F, Fut>(
        &self,
        ctx: &CancellationToken,
        f: F,
        on_done: Box<dyn FnOnce() + Send>,
    ) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit_task(ctx, f, Some(on_done)).await
    }

    async fn submit_task<F, Fut>(
        &self,
        ctx: &CancellationToken,
        f: F,
        on_done: Option<Box<dyn FnOnce() + Send>>,
    ) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = ctx.child_token();
        let task = Task {
            fut: Box::pin(async move { f(token).await }),
            on_done,
        };
        // The send below can be abandoned mid-await (caller timeout or
        // cancellation); the guard keeps the barrier counter accurate in
        // every exit path that did not hand the task to a worker.
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            outstanding: &self.outstanding,
            notify: &self.notify,
            armed: true,
        };
        if self.tx.send(task).await.is_err() {
            return Err(PoolError::Closed);
        }
        guard.disarm();
        Ok(())
    }

    /// Barrier: wait until every task submitted so far has completed.
    pub async fn wait(&self) {
        loop {
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            let notified = self.notify.notified();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Forbid further submissions and wait for workers to drain and exit.
    pub async fn close(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_tasks_complete_before_wait_returns() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let ctx = CancellationToken::new();

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(&ctx, move |_token| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.wait().await;

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_wait_on_idle_pool_returns_immediately() {
        let pool = WorkerPool::new(2);
        pool.wait().await;
        pool.close().await;
    }

    #[tokio::test]
    async fn test_callback_runs_before_barrier_releases() {
        let pool = WorkerPool::new(2);
        let ctx = CancellationToken::new();
        let done = Arc::new(AtomicUsize::new(0));

        let flag = Arc::clone(&done);
        pool.submit_with_callback(
            &ctx,
            |_token| async {},
            Box::new(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .unwrap();
        pool.wait().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_tasks_still_drain() {
        let pool = WorkerPool::new(2);
        let ctx = CancellationToken::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let ran = Arc::clone(&ran);
            let skipped = Arc::clone(&skipped);
            pool.submit(&ctx, move |token| async move {
                if token.is_cancelled() {
                    skipped.fetch_add(1, Ordering::SeqCst);
                } else {
                    ran.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();
        }
        ctx.cancel();
        pool.wait().await;

        assert_eq!(
            ran.load(Ordering::SeqCst) + skipped.load(Ordering::SeqCst),
            20
        );
        pool.close().await;
    }

    #[tokio::test]
    async fn test_submit_applies_backpressure() {
        // One worker, queue capacity 10. A blocked worker plus a full queue
        // must make the next submit wait rather than buffer unboundedly.
        let pool = WorkerPool::new(1);
        let ctx = CancellationToken::new();
        let gate = Arc::new(Notify::new());

        let release = Arc::clone(&gate);
        pool.submit(&ctx, move |_token| async move {
            release.notified().await;
        })
        .await
        .unwrap();

        // Fill the queue behind the blocked worker.
        for _ in 0..10 {
            pool.submit(&ctx, |_token| async {}).await.unwrap();
        }

        let overflow = tokio::time::timeout(
            Duration::from_millis(50),
            pool.submit(&ctx, |_token| async {}),
        )
        .await;
        assert!(overflow.is_err(), "submit should block on a full queue");

        gate.notify_waiters();
        pool.wait().await;
        pool.close().await;
    }

    #[tokio::test]
    async fn test_no_ordering_guarantee_only_completion() {
        // Sanity check that concurrent tasks all complete with several
        // workers in flight; the pool promises completion, not order.
        let pool = WorkerPool::new(8);
        let ctx = CancellationToken::new();
        let total = Arc::new(AtomicUsize::new(0));

        for i in 0..200usize {
            let total = Arc::clone(&total);
            pool.submit(&ctx, move |_token| async move {
                if i % 3 == 0 {
                    tokio::task::yield_now().await;
                }
                total.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.wait().await;
        assert_eq!(total.load(Ordering::SeqCst), 200);
        pool.close().await;
    }
}
