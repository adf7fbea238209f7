//! Centralized configuration for switchboard.
//!
//! This module provides the tuning constants for dispatch, the server
//! surface, and the asynchronous log sink.

use std::time::Duration;

/// Configuration for the dispatch engine.
pub struct DispatchConfig;

impl DispatchConfig {
    /// How long a dispatcher waits for a worker reply before giving up.
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

    /// Messages per outbound socket frame before an immediate flush.
    pub const MAX_BATCH: usize = 100;

    /// How long the writer lets a non-empty batch sit without new arrivals.
    pub const IDLE_FLUSH: Duration = Duration::from_millis(10);

    /// Capacity of the dispatcher-to-writer handoff channel.
    pub const SUBMIT_QUEUE: usize = 1;

    /// Wildcard selection takes the first match at or below this load.
    pub const FAST_PATH_WAITING: usize = 3;
}

/// Configuration for the HTTP/WebSocket surface.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 18880;

    /// Prefix for names assigned to workers that connect without one.
    pub const GENERATED_NAME_PREFIX: &'static str = "_generate_";
}

/// Configuration for the asynchronous console log sink.
pub struct LogConfig;

impl LogConfig {
    /// Bounded queue between logging callers and the sink task.
    pub const QUEUE_CAPACITY: usize = 1000;

    /// Lines per write-out batch before an immediate flush.
    pub const BATCH_LINES: usize = 100;

    /// How long a non-empty batch sits before it is flushed anyway.
    pub const IDLE_FLUSH: Duration = Duration::from_millis(3);

    /// After a full-batch flush, a backlog beyond this many queued lines is
    /// discarded wholesale.
    pub const BACKLOG_DROP_THRESHOLD: usize = 100;

    /// Timestamp format for console lines.
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_bounds_are_reasonable() {
        assert!(DispatchConfig::IDLE_FLUSH < DispatchConfig::CALL_TIMEOUT);
        assert!(DispatchConfig::MAX_BATCH > 0);
        assert!(LogConfig::BATCH_LINES <= LogConfig::QUEUE_CAPACITY);
    }
}
