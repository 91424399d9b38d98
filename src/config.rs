/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Dispatcher and worker-thread configuration.
//!
//! Every field has a default, so a config file only needs the fields it
//! changes:
//!
//! ```json
//! { "workers": 8, "throughput": 4, "thread": { "affinity": [2, 3] } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration applied to every worker thread of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// CPU cores to pin the thread to (empty = no pinning)
    pub affinity: Vec<usize>,
    /// Thread priority (1-99 for RT, 0 = default)
    pub priority: i32,
    /// Scheduling policy (SCHED_OTHER, SCHED_FIFO, SCHED_RR)
    pub sched_policy: i32,
    /// Stack size in bytes (None = platform default)
    pub stack_size: Option<usize>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        ThreadConfig {
            affinity: vec![],
            priority: 0,
            sched_policy: libc::SCHED_OTHER,
            stack_size: None,
        }
    }
}

impl ThreadConfig {
    /// Create config with CPU affinity
    pub fn with_affinity(cores: Vec<usize>) -> Self {
        ThreadConfig {
            affinity: cores,
            ..Default::default()
        }
    }

    /// Create config with real-time priority
    pub fn with_priority(priority: i32, policy: i32) -> Self {
        ThreadConfig {
            priority,
            sched_policy: policy,
            ..Default::default()
        }
    }
}

/// Settings for a [`crate::Dispatcher`] and the thread pool behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Worker thread name prefix; threads are named `{prefix}-{index}`.
    pub thread_name: String,
    /// Messages one job may drain before handing the worker back.
    /// 1 gives every ready actor a turn between messages.
    pub throughput: usize,
    /// Mailbox bound for newly spawned actors (None = unbounded).
    pub mailbox_capacity: Option<usize>,
    pub thread: ThreadConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            workers: default_workers(),
            thread_name: "actor-worker".to_string(),
            throughput: 1,
            mailbox_capacity: None,
            thread: ThreadConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Default config with a fixed worker count.
    pub fn with_workers(workers: usize) -> Self {
        DispatcherConfig {
            workers,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: DispatcherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.throughput == 0 {
            return Err(ConfigError::Invalid("throughput must be at least 1".into()));
        }
        if self.mailbox_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "mailbox_capacity must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
