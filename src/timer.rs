/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Timer utilities for scheduling delayed and periodic messages.
//!
//! Timers post closures to an actor's port after a delay. Each timer owns a
//! small thread that sleeps on a cancellation channel, so `cancel()` and
//! `drop` take effect immediately rather than after the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::actor::{Actor, Context};
use crate::error::PostError;
use crate::port::Port;

/// A timer that posts messages to an actor.
///
/// # Example
/// ```ignore
/// // One-shot timer
/// let timer = Timer::once(port.clone(), Duration::from_secs(5), |a, _| a.on_timeout());
///
/// // Periodic timer
/// let timer = Timer::periodic(port, Duration::from_millis(100), || |a: &mut Reporter, _| a.tick());
///
/// // Cancel when done
/// timer.cancel();
/// ```
pub struct Timer {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    cancel: Mutex<Option<Sender<()>>>,
}

impl Timer {
    /// Create a one-shot timer.
    ///
    /// Posts `message` to the actor after `delay`, unless cancelled first.
    pub fn once<A, F>(port: Port<A>, delay: Duration, message: F) -> Self
    where
        A: Actor,
        F: FnOnce(&mut A, &mut Context<A>) + Send + 'static,
    {
        Self::start(move |cancel_rx, running| {
            if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(delay) {
                if running.load(Ordering::SeqCst) {
                    port.post(message);
                }
            }
        })
    }

    /// Create a periodic timer.
    ///
    /// Posts `factory()` to the actor every `interval` until `cancel()` is
    /// called, the actor terminates or its worker pool shuts down.
    pub fn periodic<A, F, M>(port: Port<A>, interval: Duration, factory: F) -> Self
    where
        A: Actor,
        F: Fn() -> M + Send + 'static,
        M: FnOnce(&mut A, &mut Context<A>) + Send + 'static,
    {
        Self::start(move |cancel_rx, running| loop {
            match cancel_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e @ (PostError::Terminated | PostError::PoolShutDown)) =
                port.try_post(factory())
            {
                tracing::debug!(actor = %port.name(), error = %e, "timer target unreachable");
                break;
            }
        })
    }

    fn start<B>(body: B) -> Self
    where
        B: FnOnce(crossbeam_channel::Receiver<()>, &AtomicBool) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = thread::spawn(move || {
            body(cancel_rx, &running_clone);
            running_clone.store(false, Ordering::SeqCst);
        });

        Timer {
            handle: Some(handle),
            running,
            cancel: Mutex::new(Some(cancel_tx)),
        }
    }

    /// Cancel the timer.
    ///
    /// No more messages will be posted after this call.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the sender wakes the timer thread.
        self.cancel.lock().take();
    }

    /// Check if the timer is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            // The timer thread may hold the last port to an actor that owns
            // this timer, in which case the drop runs on that thread.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
