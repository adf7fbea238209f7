//! Switchboard RPC server library.
//!
//! The binary in `main.rs` is a thin wrapper around [`server::start_server`];
//! the library target exists so integration tests can run the full HTTP and
//! WebSocket surface in-process.

pub mod handler;
pub mod server;
