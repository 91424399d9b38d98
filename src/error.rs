/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Error types for the actor core.
//!
//! `post` never reports failures; these types surface through the
//! fallible variants (`try_post`, pool submission, config loading).

use thiserror::Error;

/// Why a message was not accepted into an actor's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    /// The actor has exited; its mailbox no longer accepts messages.
    #[error("actor has terminated")]
    Terminated,

    /// The mailbox was created with a capacity and is at that capacity.
    #[error("mailbox is full ({capacity} pending)")]
    MailboxFull { capacity: usize },

    /// The worker pool refused to run the actor. Its pending messages,
    /// this one included, were dropped.
    #[error("worker pool is shut down; message dropped")]
    PoolShutDown,
}

/// Failure to hand a unit of work to a worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool has been shut down and accepts no more jobs.
    #[error("worker pool is shut down")]
    ShutDown,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Failure to load a dispatcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to start an [`crate::ActorSystem`].
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
