use std::collections::VecDeque;

use tokio::task::JoinSet;

type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Bounded pool of blocking tasks.
///
/// At most `limit` jobs run at once; queued jobs start as running ones finish.
/// Results come back in completion order.
pub struct WorkerPool<T> {
    limit: usize,
    queued: VecDeque<Job<T>>,
    running: JoinSet<T>,
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("limit", &self.limit)
            .field("queued", &self.queued.len())
            .field("running", &self.running.len())
            .finish()
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            queued: VecDeque::new(),
            running: JoinSet::new(),
        }
    }

    /// Queue a job. Must be called from within a tokio runtime.
    pub fn submit(&mut self, job: impl FnOnce() -> T + Send + 'static) {
        self.queued.push_back(Box::new(job));
        self.fill();
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.queued.is_empty()
    }

    /// Next finished result, or `None` once every job has been collected.
    ///
    /// Jobs that panic or get cancelled are logged and skipped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let joined = self.running.join_next().await?;
            self.fill();
            match joined {
                Ok(value) => return Some(value),
                Err(e) => tracing::warn!("worker task failed: {e}"),
            }
        }
    }

    /// Drain every remaining job.
    pub async fn collect(mut self) -> Vec<T> {
        let mut results = Vec::with_capacity(self.queued.len() + self.running.len());
        while let Some(value) = self.next().await {
            results.push(value);
        }
        results
    }

    fn fill(&mut self) {
        while self.running.len() < self.limit
            && let Some(job) = self.queued.pop_front()
        {
            self.running.spawn_blocking(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn collects_every_result() {
        let mut pool = WorkerPool::new(3);
        for i in 0..10u32 {
            pool.submit(move || i * 2);
        }
        let mut results = pool.collect().await;
        results.sort_unstable();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2);

        for _ in 0..8 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            pool.submit(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
        assert!(pool.in_flight() <= 2);
        let results = pool.collect().await;
        assert_eq!(results.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panicking_job_is_skipped() {
        let mut pool = WorkerPool::new(2);
        pool.submit(|| 1);
        pool.submit(|| panic!("boom"));
        pool.submit(|| 3);
        let mut results = pool.collect().await;
        results.sort_unstable();
        assert_eq!(results, vec![1, 3]);
    }

    #[tokio::test]
    async fn zero_limit_still_runs() {
        let mut pool = WorkerPool::new(0);
        pool.submit(|| "ok");
        assert_eq!(pool.next().await, Some("ok"));
        assert!(pool.next().await.is_none());
        assert!(pool.is_idle());
    }
}
