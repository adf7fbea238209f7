//! Transport seam between the engine and a worker socket.
//!
//! A member owns exactly one connection, split into a write half and a read
//! half so the writer and reader tasks can run independently. The server
//! crate adapts a real WebSocket to these traits; tests drive channel-backed
//! fakes through the same seam.

use crate::error::Result;
use async_trait::async_trait;

/// Write half of a worker connection. Carries whole text frames; the engine
/// has already encoded the batch as JSON.
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send_frame(&mut self, frame: String) -> Result<()>;
}

/// Read half of a worker connection.
///
/// `None` means the peer closed cleanly; `Some(Err(_))` is a transport
/// failure. Both end the member.
#[async_trait]
pub trait FrameSource: Send + 'static {
    async fn next_frame(&mut self) -> Option<Result<String>>;
}
