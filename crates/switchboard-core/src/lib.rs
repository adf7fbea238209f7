//! Switchboard Core - Headless dispatch engine for the request bridge.
//!
//! This crate owns everything between the HTTP surface and the worker
//! sockets: the connection registry, per-member batching and reply
//! demultiplexing, identifier-based correlation, wildcard member selection,
//! and the call timeout discipline. It knows nothing about HTTP or
//! WebSockets; the transport is abstracted behind the frame traits in
//! [`conn`], which the server crate adapts to real sockets.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_core::{dispatch, DispatchConfig, Dispatched, Registry};
//!
//! let registry = std::sync::Arc::new(Registry::new());
//! // ... workers register members as their sockets connect ...
//! let outcome = dispatch(
//!     &registry,
//!     "browsers",
//!     "render-*",
//!     "screenshot",
//!     "https://example.com",
//!     DispatchConfig::CALL_TIMEOUT,
//! )
//! .await;
//! ```

pub mod config;
pub mod conn;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod logging;
pub mod member;
pub mod pattern;
pub mod registry;
pub mod wire;

#[cfg(test)]
pub(crate) mod testconn;

// Re-export commonly used types
pub use config::{DispatchConfig, LogConfig, ServerConfig};
pub use dispatch::{dispatch, Dispatched};
pub use error::{Result, SwitchboardError};
pub use member::Member;
pub use registry::Registry;
pub use wire::{CallReply, CallRequest, MemberStatus, EXEC_ACTION};
