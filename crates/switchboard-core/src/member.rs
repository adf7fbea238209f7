//! One worker connection: the write-side batcher and the read-side
//! demultiplexer.
//!
//! A member owns its socket for its whole lifetime through two spawned
//! tasks. The writer is the only task that touches the write half: it drains
//! the bounded submit channel into a batch and flushes it as one JSON array,
//! either when the batch is full or after a short idle gap. The reader is
//! the only task that touches the read half: it decodes reply frames and
//! routes each reply to the dispatcher waiting on its id. The reader is the
//! authority on liveness - a read failure tears the member down; write
//! failures are only logged.

use crate::config::DispatchConfig;
use crate::conn::{FrameSink, FrameSource};
use crate::error::{Result, SwitchboardError};
use crate::registry::Registry;
use crate::wire::{CallReply, CallRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A registered worker connection within a group.
pub struct Member {
    group: String,
    name: String,
    /// Handoff from dispatchers to the writer task.
    sender: mpsc::Sender<CallRequest>,
    /// Reply slots for calls still awaiting a worker reply, keyed by id.
    pending: Mutex<HashMap<String, oneshot::Sender<CallReply>>>,
    /// In-flight call count, used for load-aware wildcard selection.
    pub(crate) waiting: AtomicUsize,
    /// Total submissions over the member's lifetime.
    send_num: AtomicU64,
}

impl Member {
    /// Create a member around a freshly accepted connection and start its
    /// writer and reader tasks. The caller still has to register the member
    /// with the registry; the member deregisters itself when its socket
    /// dies.
    pub fn spawn(
        registry: Arc<Registry>,
        group: &str,
        name: &str,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
    ) -> Arc<Member> {
        let (sender, submissions) = mpsc::channel(DispatchConfig::SUBMIT_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let member = Arc::new(Member {
            group: group.to_owned(),
            name: name.to_owned(),
            sender,
            pending: Mutex::new(HashMap::new()),
            waiting: AtomicUsize::new(0),
            send_num: AtomicU64::new(0),
        });

        tokio::spawn(run_writer(
            sink,
            submissions,
            shutdown_rx,
            Arc::clone(&member),
        ));
        tokio::spawn(run_reader(
            source,
            shutdown_tx,
            registry,
            Arc::clone(&member),
        ));

        member
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    pub fn send_num(&self) -> u64 {
        self.send_num.load(Ordering::Relaxed)
    }

    /// Record the call as pending and hand it to the writer. Blocks while
    /// the handoff slot is occupied. Fails only if the writer is gone, in
    /// which case the caller must still finalize with [`Member::complete`].
    pub async fn submit(
        &self,
        request: CallRequest,
        reply: oneshot::Sender<CallReply>,
    ) -> Result<()> {
        self.waiting.fetch_add(1, Ordering::Relaxed);
        self.send_num.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .expect("pending map lock poisoned")
            .insert(request.id.clone(), reply);
        self.sender
            .send(request)
            .await
            .map_err(|_| SwitchboardError::MemberGone {
                group: self.group.clone(),
                name: self.name.clone(),
            })
    }

    /// Finalize a call: drop the waiting count and reclaim the pending
    /// entry if the reply path has not already claimed it. Must be called
    /// exactly once per submit, on every outcome.
    pub fn complete(&self, id: &str) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
        self.pending
            .lock()
            .expect("pending map lock poisoned")
            .remove(id);
    }

    /// Route one worker reply to the dispatcher waiting on its id. Removing
    /// the slot before sending is what makes duplicate and post-timeout
    /// replies fall through harmlessly.
    fn deliver(&self, reply: CallReply) {
        if reply.id.is_empty() {
            return;
        }
        let slot = self
            .pending
            .lock()
            .expect("pending map lock poisoned")
            .remove(&reply.id);
        match slot {
            // The dispatcher may have timed out between our remove and this
            // send; the reply is dropped with the receiver.
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => {
                debug!(
                    "reply {} for {}/{} has no pending call, dropped",
                    reply.id, self.group, self.name
                );
            }
        }
    }
}

/// Writer loop: batch submissions and flush as one JSON array frame.
///
/// The idle timer restarts on every loop iteration, so 10ms without any
/// arrival flushes the batch; under a steady stream the batch-size bound is
/// what forces the flush.
async fn run_writer(
    mut sink: Box<dyn FrameSink>,
    mut submissions: mpsc::Receiver<CallRequest>,
    mut shutdown: oneshot::Receiver<String>,
    member: Arc<Member>,
) {
    let mut batch: Vec<CallRequest> = Vec::new();
    loop {
        tokio::select! {
            submission = submissions.recv() => match submission {
                Some(request) => {
                    batch.push(request);
                    if batch.len() >= DispatchConfig::MAX_BATCH {
                        flush(sink.as_mut(), &mut batch, &member).await;
                    }
                }
                None => break,
            },
            _ = tokio::time::sleep(DispatchConfig::IDLE_FLUSH), if !batch.is_empty() => {
                flush(sink.as_mut(), &mut batch, &member).await;
            }
            reason = &mut shutdown => {
                debug!(
                    "writer for {}/{} stopping: {}",
                    member.group,
                    member.name,
                    reason.unwrap_or_default()
                );
                break;
            }
        }
    }
}

/// Write errors do not stop the writer; the reader decides when the member
/// is dead.
async fn flush(sink: &mut dyn FrameSink, batch: &mut Vec<CallRequest>, member: &Member) {
    match serde_json::to_string(&batch) {
        Ok(frame) => {
            if let Err(e) = sink.send_frame(frame).await {
                warn!("send to {}/{} failed: {}", member.group, member.name, e);
            }
        }
        Err(e) => {
            warn!(
                "failed to encode batch for {}/{}: {}",
                member.group, member.name, e
            );
        }
    }
    batch.clear();
}

/// Reader loop: decode reply frames and correlate by id. On a read failure
/// or clean close, signal the writer, deregister, and exit. Malformed
/// frames are dropped without ending the member.
async fn run_reader(
    mut source: Box<dyn FrameSource>,
    shutdown: oneshot::Sender<String>,
    registry: Arc<Registry>,
    member: Arc<Member>,
) {
    let reason = loop {
        match source.next_frame().await {
            Some(Ok(frame)) => match serde_json::from_str::<Vec<CallReply>>(&frame) {
                Ok(replies) => {
                    for reply in replies {
                        member.deliver(reply);
                    }
                }
                Err(e) => {
                    warn!(
                        "malformed reply frame from {}/{} dropped: {}",
                        member.group, member.name, e
                    );
                }
            },
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_owned(),
        }
    };

    info!(
        "worker connection {}/{} ended: {}",
        member.group, member.name, reason
    );
    let _ = shutdown.send(reason);
    registry.remove(&member.group, &member.name, &member);
}
