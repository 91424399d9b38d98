/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Worker pools that run dispatcher jobs.
//!
//! The dispatcher only needs "run this closure on some thread, soon".
//! [`ThreadPool`] is the built-in implementation: N named OS threads
//! pulling jobs from one shared queue, optionally pinned and prioritised.
//! A tokio [`Handle`](tokio::runtime::Handle) also works, running each job
//! on the runtime's blocking pool.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::config::{DispatcherConfig, ThreadConfig};
use crate::error::PoolError;

/// A unit of work submitted by the dispatcher.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run jobs asynchronously.
pub trait WorkerPool: Send + Sync {
    /// Queue `job` for execution. Must not block on the job itself.
    ///
    /// A pool that cannot run the job drops it, either right away along
    /// with an error or later without one. Dropping the job hands the actor
    /// back to the dispatcher.
    fn submit(&self, job: Job) -> Result<(), PoolError>;
}

impl WorkerPool for tokio::runtime::Handle {
    fn submit(&self, job: Job) -> Result<(), PoolError> {
        // Actor handlers are synchronous, so keep them off the async workers.
        // After the runtime shuts down, tokio drops the job unrun.
        drop(self.spawn_blocking(job));
        Ok(())
    }
}

/// Fixed-size pool of worker threads sharing one unbounded job queue.
///
/// # Example
/// ```
/// use actor_lite::ThreadPool;
///
/// let pool = ThreadPool::new(4).unwrap();
/// assert_eq!(pool.size(), 4);
/// pool.shutdown();
/// ```
pub struct ThreadPool {
    name: String,
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool of `size` threads with default thread settings.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        Self::build("actor-worker", size, &ThreadConfig::default())
    }

    /// Create a pool sized and configured from a dispatcher config.
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, PoolError> {
        Self::build(&config.thread_name, config.workers, &config.thread)
    }

    fn build(name: &str, size: usize, config: &ThreadConfig) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::Spawn("pool size must be at least 1".into()));
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let pool = ThreadPool {
            name: name.to_string(),
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Vec::with_capacity(size)),
        };

        for index in 0..size {
            let handle = spawn_worker(format!("{}-{}", name, index), receiver.clone(), config.clone())
                .map_err(|e| PoolError::Spawn(e.to_string()));
            match handle {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }

        tracing::debug!(pool = %pool.name, workers = size, "thread pool started");
        Ok(pool)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Stop accepting jobs, let workers finish what is queued, and join them.
    ///
    /// Safe to call more than once. When called from one of the pool's own
    /// workers, that worker is not joined.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
        tracing::debug!(pool = %self.name, "thread pool stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl WorkerPool for ThreadPool {
    fn submit(&self, job: Job) -> Result<(), PoolError> {
        // A rejected job is dropped after the lock is released; its drop
        // may submit again.
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => sender.send(job).map_err(|_| PoolError::ShutDown),
            None => Err(PoolError::ShutDown),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    name: String,
    receiver: Receiver<Job>,
    config: ThreadConfig,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(name);
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder.spawn(move || {
        // Set CPU affinity if specified
        if !config.affinity.is_empty() {
            set_affinity(&config.affinity);
        }

        // Set thread priority if specified
        if config.priority > 0 {
            set_priority(config.priority, config.sched_policy);
        }

        worker_loop(receiver);
    })
}

/// Run jobs until the queue is closed and drained.
fn worker_loop(receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(
                worker = thread::current().name().unwrap_or("?"),
                "job panicked outside an actor handler"
            );
        }
    }
}

/// Set CPU affinity for the current thread
fn set_affinity(cores: &[usize]) {
    #[cfg(target_os = "linux")]
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        for &core in cores {
            libc::CPU_SET(core, &mut cpuset);
        }
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpuset) != 0 {
            tracing::warn!(?cores, "sched_setaffinity failed");
        }
    }
    #[cfg(not(target_os = "linux"))]
    tracing::warn!(?cores, "CPU affinity is only supported on Linux");
}

/// Set thread priority
fn set_priority(priority: i32, policy: i32) {
    #[cfg(target_os = "linux")]
    unsafe {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        if libc::sched_setscheduler(0, policy, &param) != 0 {
            tracing::warn!(priority, policy, "sched_setscheduler failed");
        }
    }
    #[cfg(not(target_os = "linux"))]
    tracing::warn!(priority, policy, "thread priority is only supported on Linux");
}
