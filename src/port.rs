/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Ports: the capability handles used to message an actor.
//!
//! A [`Port`] can enqueue closures for one actor and nothing else; it gives
//! no access to the actor's state. A [`Recipient`] is a port narrowed to an
//! interface the actor implements, so a collaborator can hold "something
//! that handles these calls" without naming the concrete actor type.

use std::fmt;
use std::sync::Arc;

use crate::actor::{Actor, ActorCell, ActorId, Context, Runnable};
use crate::error::PostError;
use crate::status::ActorStatus;

/// Cloneable handle for posting messages to an actor.
///
/// # Example
/// ```ignore
/// let counter = dispatcher.spawn(Counter::default());
/// counter.post(|c, _ctx| c.value += 1);
/// ```
pub struct Port<A: Actor> {
    cell: Arc<ActorCell<A>>,
}

impl<A: Actor> Port<A> {
    pub(crate) fn from_cell(cell: Arc<ActorCell<A>>) -> Self {
        Port { cell }
    }

    pub(crate) fn cell(&self) -> &Arc<ActorCell<A>> {
        &self.cell
    }

    /// Post a message (fire-and-forget).
    ///
    /// Never blocks. If the actor has exited, or its bounded mailbox is
    /// full, the message is dropped and counted as a dead letter.
    pub fn post<F>(&self, message: F)
    where
        F: FnOnce(&mut A, &mut Context<A>) + Send + 'static,
    {
        let _ = self.try_post(message);
    }

    /// Like [`Port::post`], but reports why a message was dropped.
    pub fn try_post<F>(&self, message: F) -> Result<(), PostError>
    where
        F: FnOnce(&mut A, &mut Context<A>) + Send + 'static,
    {
        self.cell.post(Box::new(message))
    }

    pub fn id(&self) -> ActorId {
        self.cell.id()
    }

    pub fn name(&self) -> &str {
        Runnable::name(self.cell.as_ref())
    }

    /// Current execution status.
    pub fn status(&self) -> ActorStatus {
        self.cell.actor_status()
    }

    pub fn is_terminated(&self) -> bool {
        self.status() == ActorStatus::Terminated
    }

    /// Messages waiting in the mailbox (best effort).
    pub fn pending(&self) -> usize {
        self.cell.pending()
    }

    /// Narrow this port to an interface view of the actor.
    ///
    /// `view` projects the actor onto the interface, typically an unsizing
    /// coercion such as `fn(&mut Calc) -> &mut (dyn Sink + 'static)`.
    pub fn recipient<T, V>(&self, view: V) -> Recipient<T>
    where
        T: ?Sized + 'static,
        V: Fn(&mut A) -> &mut T + Send + Sync + 'static,
    {
        let port = self.clone();
        let view = Arc::new(view);
        Recipient {
            id: self.id(),
            deliver: Arc::new(move |message: Box<dyn FnOnce(&mut T) + Send>| {
                let view = Arc::clone(&view);
                port.try_post(move |actor, _ctx| message((*view)(actor)))
            }),
        }
    }

    /// True if both ports address the same actor.
    pub fn same_actor(&self, other: &Port<A>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<A: Actor> Clone for Port<A> {
    fn clone(&self) -> Self {
        Port {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<A: Actor> fmt::Debug for Port<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

type Deliver<T> = dyn Fn(Box<dyn FnOnce(&mut T) + Send>) -> Result<(), PostError> + Send + Sync;

/// A port to "some actor implementing `T`".
///
/// Created with [`Port::recipient`]. Messages are closures over `&mut T`;
/// they are still delivered through the owning actor's mailbox and run
/// under its single-runner guarantee.
pub struct Recipient<T: ?Sized + 'static> {
    id: ActorId,
    deliver: Arc<Deliver<T>>,
}

impl<T: ?Sized + 'static> Recipient<T> {
    pub fn post<F>(&self, message: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let _ = self.try_post(message);
    }

    pub fn try_post<F>(&self, message: F) -> Result<(), PostError>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        (self.deliver)(Box::new(message))
    }

    /// Id of the actor behind this recipient.
    pub fn id(&self) -> ActorId {
        self.id
    }
}

impl<T: ?Sized + 'static> Clone for Recipient<T> {
    fn clone(&self) -> Self {
        Recipient {
            id: self.id,
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Recipient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient").field("id", &self.id).finish()
    }
}
