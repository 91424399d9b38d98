/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Per-actor message queue.
//!
//! Many producers append, one consumer (the worker currently holding the
//! actor's `Running` claim) removes from the front. The queue itself only
//! guarantees FIFO order and mutual exclusion; single-consumer access is
//! enforced by [`crate::status::StatusCell`].

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::PostError;

/// A message handed back by [`Mailbox::enqueue`] along with the reason.
pub struct Rejected<M> {
    pub message: M,
    pub reason: PostError,
}

struct Queue<M> {
    messages: VecDeque<M>,
    closed: bool,
}

/// Ordered queue of pending messages for one actor.
pub struct Mailbox<M> {
    queue: Mutex<Queue<M>>,
    capacity: Option<usize>,
}

impl<M> Mailbox<M> {
    /// Create an unbounded mailbox.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a mailbox that rejects messages once `capacity` are pending.
    /// `None` means unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Mailbox {
            queue: Mutex::new(Queue {
                messages: VecDeque::new(),
                closed: false,
            }),
            capacity,
        }
    }

    /// Append a message to the tail.
    pub fn enqueue(&self, message: M) -> Result<(), Rejected<M>> {
        let mut queue = self.queue.lock();
        if queue.closed {
            return Err(Rejected {
                message,
                reason: PostError::Terminated,
            });
        }
        if let Some(capacity) = self.capacity {
            if queue.messages.len() >= capacity {
                return Err(Rejected {
                    message,
                    reason: PostError::MailboxFull { capacity },
                });
            }
        }
        queue.messages.push_back(message);
        Ok(())
    }

    /// Remove the head, or `None` if nothing is pending.
    pub fn try_dequeue(&self) -> Option<M> {
        self.queue.lock().messages.pop_front()
    }

    /// Pending message count. Only a hint: it may change as soon as the
    /// lock is released.
    pub fn len(&self) -> usize {
        self.queue.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting messages and return everything still pending.
    ///
    /// Enqueue checks the closed flag under the same lock, so once this
    /// returns no message can land in the mailbox again.
    pub fn close(&self) -> Vec<M> {
        let mut queue = self.queue.lock();
        queue.closed = true;
        queue.messages.drain(..).collect()
    }

    /// Take everything pending, leaving the mailbox open.
    pub fn drain(&self) -> Vec<M> {
        self.queue.lock().messages.drain(..).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let mailbox = Mailbox::new();
        for i in 0..5 {
            assert!(mailbox.enqueue(i).is_ok());
        }
        assert_eq!(mailbox.len(), 5);

        let drained: Vec<i32> = std::iter::from_fn(|| mailbox.try_dequeue()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(mailbox.is_empty());
        assert!(mailbox.try_dequeue().is_none());
    }

    #[test]
    fn test_close_drains_and_rejects() {
        let mailbox = Mailbox::new();
        mailbox.enqueue("a").ok();
        mailbox.enqueue("b").ok();

        let leftovers = mailbox.close();
        assert_eq!(leftovers, vec!["a", "b"]);
        assert!(mailbox.is_closed());

        let rejected = mailbox.enqueue("c").err().unwrap();
        assert_eq!(rejected.message, "c");
        assert_eq!(rejected.reason, PostError::Terminated);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_drain_keeps_mailbox_open() {
        let mailbox = Mailbox::new();
        mailbox.enqueue(1).ok();
        mailbox.enqueue(2).ok();

        assert_eq!(mailbox.drain(), vec![1, 2]);
        assert!(mailbox.is_empty());
        assert!(!mailbox.is_closed());
        assert!(mailbox.enqueue(3).is_ok());
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_capacity_rejects_when_full() {
        let mailbox = Mailbox::with_capacity(Some(2));
        assert!(mailbox.enqueue(1).is_ok());
        assert!(mailbox.enqueue(2).is_ok());

        let rejected = mailbox.enqueue(3).err().unwrap();
        assert_eq!(rejected.message, 3);
        assert_eq!(rejected.reason, PostError::MailboxFull { capacity: 2 });

        mailbox.try_dequeue();
        assert!(mailbox.enqueue(3).is_ok());
    }

    #[test]
    fn test_concurrent_producers() {
        let mailbox = Arc::new(Mailbox::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    for i in 0..1000 {
                        mailbox.enqueue((t, i)).ok();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(mailbox.len(), 8000);

        // Each producer's messages come out in the order it sent them.
        let mut last = [-1i32; 8];
        while let Some((t, i)) = mailbox.try_dequeue() {
            assert!(i > last[t]);
            last[t] = i;
        }
    }
}
