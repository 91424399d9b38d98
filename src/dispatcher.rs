/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! The dispatcher: decides when an actor needs a worker.
//!
//! Posting a message calls [`Dispatcher::ready_to_execute`]. The caller
//! that wins the actor's `Idle -> Running` compare-and-set submits one job
//! to the pool; everyone else returns immediately, because the winner is
//! already responsible for the mailbox. The job drains one message (or up
//! to `throughput` messages), then either terminates the actor or releases
//! it to `Idle` and re-checks the mailbox, re-claiming it if more messages
//! arrived. A message is therefore never left in a non-empty mailbox with
//! nobody owning the actor.
//!
//! If the pool refuses the job, or drops it without running it, the actor
//! is abandoned: its pending messages become dead letters and the claim goes
//! back to `Idle`.
//!
//! The dispatcher is an ordinary value: create one per pool and share it
//! by cloning. Tests typically build a private one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::actor::{Actor, ActorCell, ActorId, Runnable};
use crate::config::DispatcherConfig;
use crate::error::{PoolError, PostError};
use crate::pool::WorkerPool;
use crate::port::Port;

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    /// Actors created through this dispatcher.
    pub spawned: u64,
    /// Jobs handed to the worker pool.
    pub scheduled: u64,
    /// Messages applied to actors (including ones whose handler panicked).
    pub processed: u64,
    /// Messages dropped: posted after exit, rejected by a full mailbox, or
    /// still queued when their actor terminated.
    pub dead_letters: u64,
    /// Handler panics caught and contained.
    pub panics: u64,
    /// Actors that have exited.
    pub terminated: u64,
    /// Executions that found another worker inside the same actor. Always
    /// zero unless the single-runner guarantee is broken.
    pub contended: u64,
}

#[derive(Default)]
struct Counters {
    spawned: AtomicU64,
    scheduled: AtomicU64,
    processed: AtomicU64,
    dead_letters: AtomicU64,
    panics: AtomicU64,
    terminated: AtomicU64,
    contended: AtomicU64,
}

struct Inner {
    pool: Arc<dyn WorkerPool>,
    throughput: usize,
    mailbox_capacity: Option<usize>,
    counters: Counters,
}

/// Shared scheduling authority for a set of actors.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use actor_lite::{Actor, Dispatcher, ThreadPool};
///
/// #[derive(Default)]
/// struct Counter { value: u64 }
/// impl Actor for Counter {}
///
/// let pool = Arc::new(ThreadPool::new(2).unwrap());
/// let dispatcher = Dispatcher::new(pool.clone());
/// let counter = dispatcher.spawn(Counter::default());
/// counter.post(|c, _ctx| c.value += 1);
/// pool.shutdown();
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Dispatcher with default settings (one message per job, unbounded
    /// mailboxes).
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self::with_config(pool, &DispatcherConfig::default())
    }

    /// Dispatcher using the scheduling settings of `config`. The worker
    /// fields of `config` are ignored; the pool is already built.
    pub fn with_config(pool: Arc<dyn WorkerPool>, config: &DispatcherConfig) -> Self {
        Dispatcher {
            inner: Arc::new(Inner {
                pool,
                throughput: config.throughput.max(1),
                mailbox_capacity: config.mailbox_capacity,
                counters: Counters::default(),
            }),
        }
    }

    /// Create an actor in the `Idle` state with an empty mailbox.
    pub fn spawn<A: Actor>(&self, actor: A) -> Port<A> {
        self.spawn_inner(actor, None)
    }

    /// Like [`Dispatcher::spawn`], with a name used in logs.
    pub fn spawn_named<A: Actor>(&self, name: &str, actor: A) -> Port<A> {
        self.spawn_inner(actor, Some(name.to_string()))
    }

    fn spawn_inner<A: Actor>(&self, actor: A, name: Option<String>) -> Port<A> {
        let cell = ActorCell::new(actor, name, self.inner.mailbox_capacity, self.clone());
        self.inner.counters.spawned.fetch_add(1, Ordering::Relaxed);
        let port = Port::from_cell(Arc::new(cell));
        tracing::trace!(actor = %port.name(), "spawned");
        port
    }

    /// Current counter values.
    pub fn stats(&self) -> DispatcherStats {
        let c = &self.inner.counters;
        DispatcherStats {
            spawned: c.spawned.load(Ordering::Relaxed),
            scheduled: c.scheduled.load(Ordering::Relaxed),
            processed: c.processed.load(Ordering::Relaxed),
            dead_letters: c.dead_letters.load(Ordering::Relaxed),
            panics: c.panics.load(Ordering::Relaxed),
            terminated: c.terminated.load(Ordering::Relaxed),
            contended: c.contended.load(Ordering::Relaxed),
        }
    }

    pub fn throughput(&self) -> usize {
        self.inner.throughput
    }

    /// Schedule `actor` unless it has exited or another runner owns it.
    ///
    /// Fails only when the pool refuses the job. By then the claim has been
    /// released and the pending messages counted as dead letters.
    pub(crate) fn ready_to_execute(&self, actor: Arc<dyn Runnable>) -> Result<(), PoolError> {
        if actor.has_exited() {
            return Ok(());
        }

        if !actor.status().try_claim() {
            // Running (the owner will re-check the mailbox) or terminated.
            return Ok(());
        }

        tracing::trace!(actor = %actor.name(), "claimed");
        let job = RunJob {
            dispatcher: self.clone(),
            actor: Some(Arc::clone(&actor)),
        };
        match self.inner.pool.submit(Box::new(move || job.run())) {
            Ok(()) => {
                self.inner.counters.scheduled.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                tracing::error!(actor = %actor.name(), error = %e, "failed to schedule actor");
                Err(e)
            }
        }
    }

    /// A claimed actor whose job will never run: drop what is pending and
    /// give the claim back.
    fn abandon(&self, actor: Arc<dyn Runnable>) {
        let dropped = actor.discard_pending();
        if dropped > 0 {
            self.record_dead_letters(actor.id(), dropped, PostError::PoolShutDown);
        }
        actor.status().release();
        tracing::warn!(actor = %actor.name(), dropped, "actor run dropped by worker pool");

        // Same re-check as after a normal run.
        if actor.pending() > 0 {
            let _ = self.ready_to_execute(actor);
        }
    }

    /// Body of one pool job. The caller holds the actor's `Running` claim.
    fn run(&self, actor: Arc<dyn Runnable>) {
        let counters = &self.inner.counters;

        for _ in 0..self.inner.throughput {
            if Arc::clone(&actor).execute() {
                counters.processed.fetch_add(1, Ordering::Relaxed);
            }

            if actor.has_exited() {
                let orphaned = actor.shut_down();
                if orphaned > 0 {
                    self.record_dead_letters(actor.id(), orphaned, PostError::Terminated);
                }
                counters.terminated.fetch_add(1, Ordering::Relaxed);
                actor.status().terminate();
                tracing::debug!(actor = %actor.name(), orphaned, "terminated");
                return;
            }

            if actor.pending() == 0 {
                break;
            }
        }

        actor.status().release();
        tracing::trace!(actor = %actor.name(), "released");

        // A producer that lost the CAS to us relies on this re-check.
        if actor.pending() > 0 {
            let _ = self.ready_to_execute(actor);
        }
    }

    pub(crate) fn record_dead_letters(&self, id: ActorId, count: usize, reason: PostError) {
        self.inner
            .counters
            .dead_letters
            .fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(actor = %id, count, %reason, "dropped dead letters");
    }

    pub(crate) fn record_contention(&self, id: ActorId, name: &str) {
        self.inner.counters.contended.fetch_add(1, Ordering::Relaxed);
        tracing::error!(actor = %id, name, "actor entered by two workers at once");
    }

    pub(crate) fn record_panic(&self, id: ActorId, name: &str, message: String) {
        self.inner.counters.panics.fetch_add(1, Ordering::Relaxed);
        tracing::error!(actor = %id, name, panic = %message, "message handler panicked; message dropped");
    }
}

/// One scheduled run of an actor. A pool that drops it unrun abandons the
/// actor instead of leaving it claimed.
struct RunJob {
    dispatcher: Dispatcher,
    actor: Option<Arc<dyn Runnable>>,
}

impl RunJob {
    fn run(mut self) {
        if let Some(actor) = self.actor.take() {
            self.dispatcher.run(actor);
        }
    }
}

impl Drop for RunJob {
    fn drop(&mut self) {
        if let Some(actor) = self.actor.take() {
            self.dispatcher.abandon(actor);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("throughput", &self.inner.throughput)
            .field("mailbox_capacity", &self.inner.mailbox_capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
