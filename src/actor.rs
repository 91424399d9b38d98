/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Actor trait, per-message context, and the cell that holds an actor.
//!
//! An actor is plain mutable state. Everything outside the actor talks to
//! it by posting closures through a [`Port`]; the closures run one at a
//! time on whichever pool worker currently holds the actor's claim.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatcher::Dispatcher;
use crate::error::PostError;
use crate::mailbox::Mailbox;
use crate::port::Port;
use crate::status::{ActorStatus, StatusCell};

/// A message is a closure applied to the receiving actor.
pub type Message<A> = Box<dyn FnOnce(&mut A, &mut Context<A>) + Send + 'static>;

/// Process-unique actor identifier, used for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

impl ActorId {
    fn next() -> Self {
        ActorId(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Trait for all actors.
///
/// Only `Send + 'static` is required; all hooks have defaults, so
/// `impl Actor for MyState {}` is enough to start posting closures.
pub trait Actor: Send + Sized + 'static {
    /// Called on the first execution, before the first message is applied.
    /// A panic here is logged and counted; the first message still runs.
    fn started(&mut self, _ctx: &mut Context<Self>) {}

    /// Called once after the actor exits, before its status becomes
    /// `Terminated`. Messages still pending at that point are dropped.
    fn stopped(&mut self) {}

    /// Apply one message. Override to wrap every message (tracing,
    /// bookkeeping); the default just invokes the closure.
    fn receive(&mut self, message: Message<Self>, ctx: &mut Context<Self>) {
        message(self, ctx)
    }
}

/// Handle given to every message closure while it runs.
///
/// Only code running inside the actor can obtain one, which is what makes
/// [`Context::exit`] reachable from the actor's own handlers only.
pub struct Context<A: Actor> {
    port: Port<A>,
}

impl<A: Actor> Context<A> {
    fn new(port: Port<A>) -> Self {
        Context { port }
    }

    /// Stop this actor once the current message returns.
    ///
    /// Later posts are rejected and anything still queued is dropped as
    /// a dead letter.
    pub fn exit(&mut self) {
        self.port.cell().exited.store(true, Ordering::Release);
    }

    /// True once [`Context::exit`] has been called.
    pub fn has_exited(&self) -> bool {
        self.port.cell().has_exited()
    }

    /// This actor's own port, to hand out as a reply address.
    pub fn port(&self) -> Port<A> {
        self.port.clone()
    }

    pub fn id(&self) -> ActorId {
        self.port.id()
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    /// The dispatcher this actor is scheduled by.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.port.cell().dispatcher
    }

    /// Create a new actor on the same dispatcher.
    pub fn spawn<B: Actor>(&self, actor: B) -> Port<B> {
        self.dispatcher().spawn(actor)
    }
}

/// Type-erased view of an actor, as seen by the dispatcher.
pub(crate) trait Runnable: Send + Sync {
    fn id(&self) -> ActorId;

    fn name(&self) -> &str;

    fn status(&self) -> &StatusCell;

    fn has_exited(&self) -> bool;

    fn pending(&self) -> usize;

    /// Dequeue and apply at most one message. Returns false if the
    /// mailbox was empty.
    fn execute(self: Arc<Self>) -> bool;

    /// Close the mailbox and run the `stopped` hook. Returns the number of
    /// messages that were still pending.
    fn shut_down(&self) -> usize;

    /// Drop every pending message without closing the mailbox. Returns how
    /// many were dropped.
    fn discard_pending(&self) -> usize;
}

struct Slot<A> {
    actor: A,
    started: bool,
}

/// Shared storage for one actor: state, mailbox, status.
pub(crate) struct ActorCell<A: Actor> {
    id: ActorId,
    name: String,
    slot: Mutex<Slot<A>>,
    mailbox: Mailbox<Message<A>>,
    status: StatusCell,
    exited: AtomicBool,
    dispatcher: Dispatcher,
}

impl<A: Actor> ActorCell<A> {
    pub(crate) fn new(
        actor: A,
        name: Option<String>,
        mailbox_capacity: Option<usize>,
        dispatcher: Dispatcher,
    ) -> Self {
        let id = ActorId::next();
        ActorCell {
            id,
            name: name.unwrap_or_else(|| id.to_string()),
            slot: Mutex::new(Slot {
                actor,
                started: false,
            }),
            mailbox: Mailbox::with_capacity(mailbox_capacity),
            status: StatusCell::new(),
            exited: AtomicBool::new(false),
            dispatcher,
        }
    }

    pub(crate) fn actor_status(&self) -> ActorStatus {
        self.status.load()
    }

    /// Enqueue a message and tell the dispatcher the actor is ready.
    pub(crate) fn post(self: &Arc<Self>, message: Message<A>) -> Result<(), PostError> {
        if self.has_exited() {
            self.dispatcher
                .record_dead_letters(self.id, 1, PostError::Terminated);
            return Err(PostError::Terminated);
        }

        if let Err(rejected) = self.mailbox.enqueue(message) {
            self.dispatcher
                .record_dead_letters(self.id, 1, rejected.reason);
            return Err(rejected.reason);
        }

        let runnable: Arc<dyn Runnable> = Arc::clone(self) as Arc<dyn Runnable>;
        self.dispatcher
            .ready_to_execute(runnable)
            .map_err(|_| PostError::PoolShutDown)
    }
}

impl<A: Actor> Runnable for ActorCell<A> {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &StatusCell {
        &self.status
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    fn pending(&self) -> usize {
        self.mailbox.len()
    }

    fn execute(self: Arc<Self>) -> bool {
        let message = match self.mailbox.try_dequeue() {
            Some(message) => message,
            None => return false,
        };

        let dispatcher = self.dispatcher.clone();
        let id = self.id;
        let mut ctx = Context::new(Port::from_cell(Arc::clone(&self)));

        // Only the holder of the Running claim gets here, so the lock is
        // always free. If it is not, the claim protocol is broken.
        let mut slot = match self.slot.try_lock() {
            Some(slot) => slot,
            None => {
                dispatcher.record_contention(id, &self.name);
                self.slot.lock()
            }
        };
        let slot = &mut *slot;

        if !slot.started {
            slot.started = true;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.actor.started(&mut ctx)));
            if let Err(payload) = outcome {
                dispatcher.record_panic(id, &self.name, panic_message(payload.as_ref()));
            }
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.actor.receive(message, &mut ctx)));
        if let Err(payload) = outcome {
            dispatcher.record_panic(id, &self.name, panic_message(payload.as_ref()));
        }
        true
    }

    fn shut_down(&self) -> usize {
        let orphaned = self.mailbox.close().len();

        let mut slot = self.slot.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.actor.stopped()));
        if let Err(payload) = outcome {
            self.dispatcher
                .record_panic(self.id, &self.name, panic_message(payload.as_ref()));
        }
        orphaned
    }

    fn discard_pending(&self) -> usize {
        self.mailbox.drain().len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
