//! Background task execution pool.
//!
//! A fixed set of worker threads ticking a shared async executor. Work is
//! submitted as futures and runs to completion off the submitting thread.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_executor::{Executor, Task};

/// A thread pool for executing async tasks.
///
/// # Example
///
/// ```ignore
/// use vesper_core::TaskPool;
///
/// let pool = TaskPool::new(4);
/// let task = pool.spawn(async { 42 });
/// let result = pollster::block_on(task);
/// assert_eq!(result, 42);
/// ```
pub struct TaskPool {
    executor: Arc<Executor<'static>>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl TaskPool {
    /// Create a pool with the given number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is 0.
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads > 0, "TaskPool must have at least one thread");

        let executor = Arc::new(Executor::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(num_threads);

        for i in 0..num_threads {
            let exec = executor.clone();
            let shutdown_flag = shutdown.clone();

            let handle = thread::Builder::new()
                .name(format!("vesper-worker-{}", i))
                .spawn(move || {
                    while !shutdown_flag.load(Ordering::Relaxed) {
                        if !exec.try_tick() {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
                .expect("failed to spawn task pool thread");

            threads.push(handle);
        }

        tracing::debug!("task pool started with {} threads", num_threads);

        Self {
            executor,
            threads: Mutex::new(threads),
            shutdown,
        }
    }

    /// Create a pool sized for background work: `max(1, num_cpus - 1)`,
    /// leaving one core for the thread driving the application.
    pub fn with_default_threads() -> Self {
        let num_threads = (num_cpus::get().saturating_sub(1)).max(1);
        Self::new(num_threads)
    }

    /// Spawn a future on the pool.
    ///
    /// The returned [`Task`] resolves to the future's output; dropping it
    /// cancels the work, call [`Task::detach`] to let it run to completion.
    pub fn spawn<T>(&self, future: impl Future<Output = T> + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// The number of worker threads this pool was started with.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// Whether [`TaskPool::shutdown`] has been requested.
    ///
    /// After shutdown, spawned futures are never polled.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stop the workers and wait for them to exit.
    ///
    /// Tasks already picked up by a worker finish; queued tasks that were
    /// never started are dropped. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);

        let threads = std::mem::take(&mut *self.threads.lock().unwrap());
        if threads.is_empty() {
            return;
        }

        tracing::debug!("shutting down task pool ({} threads)", threads.len());
        for handle in threads {
            if let Err(e) = handle.join() {
                tracing::error!("task pool thread panicked: {:?}", e);
            }
        }
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::with_default_threads()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_await() {
        let pool = TaskPool::new(2);

        let task = pool.spawn(async { 42 });

        let result = pollster::block_on(task);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_multiple_tasks() {
        let pool = TaskPool::new(4);

        let tasks: Vec<_> = (0..10).map(|i| pool.spawn(async move { i * 2 })).collect();

        let results: Vec<_> = tasks.into_iter().map(pollster::block_on).collect();

        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    }

    #[test]
    fn test_default_threads() {
        let pool = TaskPool::with_default_threads();
        assert!(pool.thread_count() >= 1);
        assert!(pool.thread_count() <= num_cpus::get());
    }

    #[test]
    #[should_panic(expected = "TaskPool must have at least one thread")]
    fn test_zero_threads_panics() {
        TaskPool::new(0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = TaskPool::new(2);

        let task = pool.spawn(async { 1 });
        assert_eq!(pollster::block_on(task), 1);

        pool.shutdown();
        assert!(pool.is_shut_down());
        pool.shutdown();
        assert_eq!(pool.thread_count(), 0);
    }
}
