//! Named periodic loops.
//!
//! Each [`LoopKind`] owns at most one spawned task. `start` and `stop` are
//! idempotent, so callers can "ensure" a loop without tracking whether it
//! already runs. The first tick fires one full period after start.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::events::LoopKind;

#[derive(Default)]
pub struct PollScheduler {
    loops: Mutex<HashMap<LoopKind, JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LoopKind, JoinHandle<()>>> {
        self.loops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `kind` calling `tick` every `period`. Returns `false` if the
    /// loop is already running. Must be called inside a tokio runtime.
    pub fn start<F, Fut>(&self, kind: LoopKind, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut loops = self.lock();
        if loops.get(&kind).is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        loops.insert(kind, handle);
        tracing::debug!(loop_kind = kind.name(), period_ms = period.as_millis() as u64, "Loop started");
        true
    }

    /// Abort `kind`. Returns `false` if it was not running.
    pub fn stop(&self, kind: LoopKind) -> bool {
        match self.lock().remove(&kind) {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                tracing::debug!(loop_kind = kind.name(), "Loop stopped");
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self, kind: LoopKind) -> bool {
        self.lock().get(&kind).is_some_and(|h| !h.is_finished())
    }

    /// Abort every loop. Returns the kinds that were running.
    pub fn stop_all(&self) -> Vec<LoopKind> {
        let mut stopped = Vec::new();
        for (kind, handle) in self.lock().drain() {
            if !handle.is_finished() {
                stopped.push(kind);
            }
            handle.abort();
        }
        stopped
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.lock().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let scheduler = PollScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.start(LoopKind::Registry, Duration::from_secs(5), counting(&hits)));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let scheduler = PollScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.start(LoopKind::Health, Duration::from_secs(1), counting(&hits)));
        assert!(!scheduler.start(LoopKind::Health, Duration::from_secs(1), counting(&hits)));
        assert!(scheduler.is_running(LoopKind::Health));

        assert!(scheduler.stop(LoopKind::Health));
        assert!(!scheduler.stop(LoopKind::Health));
        assert!(!scheduler.is_running(LoopKind::Health));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_reports_running_loops() {
        let scheduler = PollScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        scheduler.start(LoopKind::Health, Duration::from_secs(1), counting(&hits));
        scheduler.start(LoopKind::Registry, Duration::from_secs(1), counting(&hits));

        let mut stopped = scheduler.stop_all();
        stopped.sort_by_key(|k| k.name());
        assert_eq!(stopped, vec![LoopKind::Health, LoopKind::Registry]);
        assert!(!scheduler.is_running(LoopKind::Registry));
    }
}
