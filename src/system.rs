/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Actor system: a thread pool plus the dispatcher that schedules onto it.
//!
//! The system:
//! - Builds the worker pool from a [`DispatcherConfig`]
//! - Spawns actors on its dispatcher
//! - Lets actors signal the program to finish through a [`SystemHandle`]
//! - Shuts the pool down and joins the workers on `end()`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::actor::Actor;
use crate::config::DispatcherConfig;
use crate::dispatcher::{Dispatcher, DispatcherStats};
use crate::error::SystemError;
use crate::pool::ThreadPool;
use crate::port::Port;

/// Handle for actors to signal termination to the system.
///
/// This is a cloneable handle that actors can use to end `run()`.
/// Clone it and pass it to actors that need to trigger shutdown.
#[derive(Clone, Debug, Default)]
pub struct SystemHandle {
    terminate_flag: Arc<AtomicBool>,
}

impl SystemHandle {
    /// Signal the system to terminate.
    ///
    /// This will cause the system's `run()` method to return.
    pub fn terminate(&self) {
        self.terminate_flag.store(true, Ordering::SeqCst);
    }

    /// Check if termination has been signaled.
    pub fn is_terminated(&self) -> bool {
        self.terminate_flag.load(Ordering::SeqCst)
    }
}

/// Owns a worker pool and a dispatcher.
///
/// # Example
/// ```
/// use actor_lite::{Actor, ActorSystem, DispatcherConfig, SystemHandle};
///
/// struct Once { handle: SystemHandle }
/// impl Actor for Once {}
///
/// let mut system = ActorSystem::new(DispatcherConfig::with_workers(2)).unwrap();
/// let port = system.spawn(Once { handle: system.handle() });
/// port.post(|a, ctx| {
///     a.handle.terminate();
///     ctx.exit();
/// });
/// system.run();  // Blocks until terminate() is called
/// system.end();
/// ```
pub struct ActorSystem {
    pool: Arc<ThreadPool>,
    dispatcher: Dispatcher,
    handle: SystemHandle,
}

impl ActorSystem {
    /// Validate `config`, start the pool and create the dispatcher.
    pub fn new(config: DispatcherConfig) -> Result<Self, SystemError> {
        config.validate()?;

        let pool = Arc::new(ThreadPool::from_config(&config)?);
        let dispatcher = Dispatcher::with_config(pool.clone(), &config);
        tracing::info!(
            workers = config.workers,
            throughput = config.throughput,
            "actor system started"
        );

        Ok(ActorSystem {
            pool,
            dispatcher,
            handle: SystemHandle::default(),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Create an actor on this system's dispatcher.
    pub fn spawn<A: Actor>(&self, actor: A) -> Port<A> {
        self.dispatcher.spawn(actor)
    }

    pub fn spawn_named<A: Actor>(&self, name: &str, actor: A) -> Port<A> {
        self.dispatcher.spawn_named(name, actor)
    }

    /// Get a handle for actors to signal termination.
    pub fn handle(&self) -> SystemHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }

    /// Run until terminate() is called.
    pub fn run(&self) {
        while !self.handle.is_terminated() {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Run until terminate() is called or `timeout` elapses. Returns true
    /// if terminated.
    pub fn run_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_terminated() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Stop the pool: queued jobs finish, new ones are refused, workers
    /// are joined. Messages still waiting in a mailbox after that are
    /// counted as dead letters.
    pub fn end(&mut self) {
        self.pool.shutdown();
        tracing::info!(stats = ?self.dispatcher.stats(), "actor system stopped");
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_handle() {
        let system = ActorSystem::new(DispatcherConfig::with_workers(1)).unwrap();
        let handle = system.handle();

        assert!(!handle.is_terminated());
        handle.terminate();
        assert!(handle.is_terminated());
        assert!(system.run_for(Duration::from_millis(1)));
    }

    #[test]
    fn test_run_for_times_out() {
        let system = ActorSystem::new(DispatcherConfig::with_workers(1)).unwrap();
        assert!(!system.run_for(Duration::from_millis(20)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DispatcherConfig {
            throughput: 0,
            ..DispatcherConfig::with_workers(1)
        };
        assert!(matches!(
            ActorSystem::new(config),
            Err(SystemError::Config(_))
        ));
    }

    #[test]
    fn test_actor_terminates_system() {
        struct Stopper {
            handle: SystemHandle,
        }
        impl Actor for Stopper {}

        let mut system = ActorSystem::new(DispatcherConfig::with_workers(2)).unwrap();
        let port = system.spawn_named("stopper", Stopper {
            handle: system.handle(),
        });
        port.post(|s, ctx| {
            s.handle.terminate();
            ctx.exit();
        });

        assert!(system.run_for(Duration::from_secs(5)));
        system.end();
        assert!(port.is_terminated());
        assert_eq!(system.stats().terminated, 1);
    }
}
