/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Execution status of an actor.
//!
//! ```text
//!   Idle ──claim──▶ Running ──release──▶ Idle
//!                      │
//!                      └──terminate──▶ Terminated (final)
//! ```
//!
//! `Idle -> Running` is the only contended transition and is a single
//! compare-and-set: whoever wins owns the right to drain the mailbox.
//! `release` and `terminate` are plain stores made by that owner.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// One of the three states an actor can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActorStatus {
    /// No worker is draining or scheduled to drain the mailbox.
    Idle = 0,
    /// Exactly one worker owns the right to drain the mailbox.
    Running = 1,
    /// The actor will never run again.
    Terminated = 2,
}

impl ActorStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorStatus::Idle,
            1 => ActorStatus::Running,
            _ => ActorStatus::Terminated,
        }
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorStatus::Idle => "idle",
            ActorStatus::Running => "running",
            ActorStatus::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Atomic holder for an [`ActorStatus`].
pub struct StatusCell {
    value: AtomicU8,
}

impl StatusCell {
    pub fn new() -> Self {
        StatusCell {
            value: AtomicU8::new(ActorStatus::Idle as u8),
        }
    }

    pub fn load(&self) -> ActorStatus {
        ActorStatus::from_u8(self.value.load(Ordering::Acquire))
    }

    /// Try to move `Idle -> Running`. Returns true if this caller won the
    /// claim. Fails if another runner holds it or the actor is terminated.
    pub fn try_claim(&self) -> bool {
        self.value
            .compare_exchange(
                ActorStatus::Idle as u8,
                ActorStatus::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Give up the claim. Only the current `Running` owner may call this.
    pub fn release(&self) {
        debug_assert_eq!(self.load(), ActorStatus::Running);
        self.value.store(ActorStatus::Idle as u8, Ordering::Release);
    }

    /// Mark the actor finished. Only the current `Running` owner may call this.
    pub fn terminate(&self) {
        self.value
            .store(ActorStatus::Terminated as u8, Ordering::Release);
    }

    pub fn is_terminated(&self) -> bool {
        self.load() == ActorStatus::Terminated
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusCell").field(&self.load()).finish()
    }
}
