/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! # actor-lite - Lightweight actors on a shared worker pool
//!
//! An actor is a piece of mutable state that is only ever touched by one
//! thread at a time. Other code reaches it by posting closures to its
//! mailbox through a [`Port`]; a [`Dispatcher`] runs those closures on a
//! shared pool of worker threads.
//!
//! ## Features
//!
//! - **Actor Model**: Independent state mutated only by its own messages
//! - **Shared Pool**: Many actors, few threads, no global lock
//! - **Single Runner**: A lock-free status flag guarantees at most one
//!   worker runs a given actor at any instant
//! - **FIFO**: Messages from one producer arrive in the order posted
//! - **Contained Failures**: Panicking handlers are logged and dropped
//!
//! ## Quick Start
//!
//! ### 1. Define an Actor
//!
//! ```rust
//! use actor_lite::Actor;
//!
//! #[derive(Default)]
//! struct Counter {
//!     total: u64,
//! }
//!
//! impl Actor for Counter {}
//! ```
//!
//! ### 2. Start a System and Post Messages
//!
//! ```rust
//! # use actor_lite::Actor;
//! # #[derive(Default)] struct Counter { total: u64 }
//! # impl Actor for Counter {}
//! use actor_lite::{ActorSystem, DispatcherConfig};
//!
//! let mut system = ActorSystem::new(DispatcherConfig::with_workers(4)).unwrap();
//! let handle = system.handle();
//! let counter = system.spawn(Counter::default());
//!
//! for i in 1..=10 {
//!     counter.post(move |c, _ctx| c.total += i);
//! }
//! counter.post(move |c, ctx| {
//!     assert_eq!(c.total, 55);
//!     ctx.exit();
//!     handle.terminate();
//! });
//!
//! system.run();  // Blocks until handle.terminate()
//! system.end();
//! ```
//!
//! ## Messaging
//!
//! ### Fire-and-Forget
//! ```rust,ignore
//! other.post(|o, _ctx| o.on_data(42));
//! ```
//!
//! ### Reply
//! Pass your own port (or a [`Recipient`]) inside the message:
//! ```rust,ignore
//! let me = ctx.port();
//! other.post(move |o, _ctx| {
//!     let answer = o.compute();
//!     me.post(move |m, _ctx| m.on_answer(answer));
//! });
//! ```
//!
//! ### Exit
//! ```rust,ignore
//! port.post(|_, ctx| ctx.exit());
//! ```

pub mod actor;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mailbox;
pub mod pool;
pub mod port;
pub mod status;
pub mod system;
pub mod timer;

// Re-export commonly used types
pub use actor::{Actor, ActorId, Context, Message};
pub use config::{DispatcherConfig, ThreadConfig};
pub use dispatcher::{Dispatcher, DispatcherStats};
pub use error::{ConfigError, PoolError, PostError, SystemError};
pub use mailbox::Mailbox;
pub use pool::{Job, ThreadPool, WorkerPool};
pub use port::{Port, Recipient};
pub use status::ActorStatus;
pub use system::{ActorSystem, SystemHandle};
pub use timer::Timer;
