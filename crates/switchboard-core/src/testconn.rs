//! Channel-backed frame connections for engine tests.

use crate::conn::{FrameSink, FrameSource};
use crate::error::{Result, SwitchboardError};
use async_trait::async_trait;
use tokio::sync::mpsc;

struct ChannelSink(mpsc::UnboundedSender<String>);

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, frame: String) -> Result<()> {
        self.0.send(frame).map_err(|_| SwitchboardError::Socket {
            message: "sink closed".into(),
        })
    }
}

struct ChannelSource(mpsc::UnboundedReceiver<Result<String>>);

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        self.0.recv().await
    }
}

/// Test handle for one fake connection: observe what the member writes,
/// inject worker frames or a transport error. Dropping `inbound` reads as a
/// clean close.
pub(crate) struct FakeConn {
    pub outbound: mpsc::UnboundedReceiver<String>,
    pub inbound: mpsc::UnboundedSender<Result<String>>,
}

impl FakeConn {
    pub fn inject_frame(&self, frame: impl Into<String>) {
        self.inbound.send(Ok(frame.into())).expect("member reader gone");
    }

    pub fn inject_error(&self, message: &str) {
        self.inbound
            .send(Err(SwitchboardError::Socket {
                message: message.to_owned(),
            }))
            .expect("member reader gone");
    }
}

pub(crate) fn fake_conn() -> (Box<dyn FrameSink>, Box<dyn FrameSource>, FakeConn) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    (
        Box::new(ChannelSink(out_tx)),
        Box::new(ChannelSource(in_rx)),
        FakeConn {
            outbound: out_rx,
            inbound: in_tx,
        },
    )
}
