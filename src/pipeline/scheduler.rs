//! Bounded background execution of pipeline runs.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

struct Shared {
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a task ends, including by panic.
struct InFlight(Arc<Shared>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Spawns submissions as tokio tasks, at most `concurrency` running at once.
///
/// Tasks past the limit are spawned immediately but wait for a permit before doing any work.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Scheduler running at most `concurrency` tasks (minimum one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                permits: Arc::new(Semaphore::new(concurrency.max(1))),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Number of tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Run `task` in the background inside `span`.
    pub fn spawn<F>(&self, span: tracing::Span, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.shared.clone());
        let permits = self.shared.permits.clone();

        tokio::spawn(
            async move {
                let _guard = guard;
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(error) => {
                        tracing::error!(error = %error, "Scheduler closed; dropping pipeline run");
                        return;
                    }
                };
                task.await;
            }
            .instrument(span),
        )
    }

    /// Resolve once no spawned task is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_idle_returns_immediately_without_work() {
        Scheduler::new(2).wait_idle().await;
    }

    #[tokio::test]
    async fn wait_idle_waits_for_every_task() {
        let scheduler = Scheduler::new(2);
        let finished = Arc::new(AtomicUsize::new(0));
        for delay in [30u64, 10, 20] {
            let finished = finished.clone();
            scheduler.spawn(tracing::Span::none(), async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        scheduler.wait_idle().await;
        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let scheduler = Scheduler::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            scheduler.spawn(tracing::Span::none(), async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        scheduler.wait_idle().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panicking_task_still_counts_as_finished() {
        let scheduler = Scheduler::new(1);
        let handle = scheduler.spawn(tracing::Span::none(), async {
            panic!("task blew up");
        });
        assert!(handle.await.is_err());
        scheduler.wait_idle().await;
        assert_eq!(scheduler.in_flight(), 0);
    }
}
