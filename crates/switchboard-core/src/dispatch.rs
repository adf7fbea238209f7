//! Per-call coordination: select a member, submit, await the correlated
//! reply or the deadline.

use crate::ids;
use crate::member::Member;
use crate::registry::Registry;
use crate::wire::{CallReply, CallRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Outcome of one dispatched call. The HTTP layer maps these onto response
/// codes and canned bodies.
#[derive(Debug)]
pub enum Dispatched {
    /// No member matched the caller's selector.
    NotFound,
    /// The worker replied within the deadline; its reply is passed through
    /// verbatim, including worker-reported failures.
    Reply(CallReply),
    /// The deadline elapsed, or the member died before the call could be
    /// written.
    TimedOut,
}

/// Dispatch one call. A selector containing `*` goes through glob
/// selection, anything else through exact lookup. The pending entry and
/// waiting count are reclaimed on every outcome; a reply that arrives after
/// the deadline is dropped by the member's reader.
pub async fn dispatch(
    registry: &Registry,
    group: &str,
    name: &str,
    action: &str,
    param: &str,
    deadline: Duration,
) -> Dispatched {
    let started = Instant::now();

    let member: Option<Arc<Member>> = if name.contains('*') {
        registry.lookup_glob(group, name)
    } else {
        registry.lookup_exact(group, name)
    };
    let Some(member) = member else {
        info!("no worker connection matches {}/{}", group, name);
        return Dispatched::NotFound;
    };

    let id = ids::next_id();
    let (reply_tx, reply_rx) = oneshot::channel();
    let request = CallRequest {
        id: id.clone(),
        action: action.to_owned(),
        param: param.to_owned(),
    };

    if member.submit(request, reply_tx).await.is_err() {
        member.complete(&id);
        warn!(
            "call {} aborted, member {}/{} went away before it was written",
            id,
            group,
            member.name()
        );
        return Dispatched::TimedOut;
    }

    let outcome = tokio::time::timeout(deadline, reply_rx).await;
    member.complete(&id);

    match outcome {
        Ok(Ok(reply)) => {
            info!(
                "call {} {}/{} {}->{} finished in {}ms, status {}",
                id,
                group,
                member.name(),
                action,
                param,
                started.elapsed().as_millis(),
                reply.status
            );
            Dispatched::Reply(reply)
        }
        // Err(_) is the deadline; Ok(Err(_)) means the reply sender was
        // dropped without a send, which only happens when the member is
        // torn down mid-call. Both read as a timeout to the caller.
        Ok(Err(_)) | Err(_) => {
            warn!(
                "call {} {}/{} {}->{} timed out",
                id,
                group,
                member.name(),
                action,
                param
            );
            Dispatched::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testconn::fake_conn;
    use serde_json::json;

    /// Spawn a member whose fake worker echoes `param` back as `data` with
    /// the given status.
    fn echo_worker(registry: &Arc<Registry>, group: &str, name: &str, status: i64) {
        let (sink, source, mut conn) = fake_conn();
        let member = Member::spawn(Arc::clone(registry), group, name, sink, source);
        registry.insert(group, name, member);

        tokio::spawn(async move {
            while let Some(frame) = conn.outbound.recv().await {
                let requests: Vec<CallRequest> = serde_json::from_str(&frame).unwrap();
                let replies: Vec<CallReply> = requests
                    .into_iter()
                    .map(|r| CallReply {
                        id: r.id,
                        status,
                        data: json!(r.param),
                        msg: if status == 0 { String::new() } else { "oops".to_owned() },
                    })
                    .collect();
                conn.inject_frame(serde_json::to_string(&replies).unwrap());
            }
        });
    }

    /// Spawn a member whose worker reads frames but never replies.
    fn silent_worker(registry: &Arc<Registry>, group: &str, name: &str) {
        let (sink, source, mut conn) = fake_conn();
        let member = Member::spawn(Arc::clone(registry), group, name, sink, source);
        registry.insert(group, name, member);

        tokio::spawn(async move {
            while conn.outbound.recv().await.is_some() {}
            drop(conn);
        });
    }

    #[tokio::test]
    async fn test_dispatch_unknown_member() {
        let registry = Arc::new(Registry::new());
        let outcome = dispatch(
            &registry,
            "a",
            "ghost",
            "ping",
            "",
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(outcome, Dispatched::NotFound));
    }

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let registry = Arc::new(Registry::new());
        echo_worker(&registry, "a", "w1", 0);

        let outcome = dispatch(
            &registry,
            "a",
            "w1",
            "ping",
            "x",
            Duration::from_secs(5),
        )
        .await;
        let Dispatched::Reply(reply) = outcome else {
            panic!("expected a reply, got {:?}", outcome);
        };
        assert_eq!(reply.status, 0);
        assert_eq!(reply.data, json!("x"));
        assert!(!reply.id.is_empty());

        let member = registry.lookup_exact("a", "w1").unwrap();
        assert_eq!(member.waiting(), 0);
        assert_eq!(member.send_num(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_glob_selector() {
        let registry = Arc::new(Registry::new());
        echo_worker(&registry, "a", "render-1", 0);

        let outcome = dispatch(
            &registry,
            "a",
            "render-*",
            "ping",
            "y",
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(outcome, Dispatched::Reply(_)));
    }

    #[tokio::test]
    async fn test_dispatch_passes_worker_failure_through() {
        let registry = Arc::new(Registry::new());
        echo_worker(&registry, "a", "w1", 3);

        let outcome = dispatch(
            &registry,
            "a",
            "w1",
            "ping",
            "x",
            Duration::from_secs(5),
        )
        .await;
        let Dispatched::Reply(reply) = outcome else {
            panic!("expected a reply, got {:?}", outcome);
        };
        assert_eq!(reply.status, 3);
        assert_eq!(reply.msg, "oops");
    }

    #[tokio::test]
    async fn test_dispatch_times_out_and_reclaims_state() {
        let registry = Arc::new(Registry::new());
        silent_worker(&registry, "a", "w1");

        let outcome = dispatch(
            &registry,
            "a",
            "w1",
            "ping",
            "x",
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(outcome, Dispatched::TimedOut));

        let member = registry.lookup_exact("a", "w1").unwrap();
        assert_eq!(member.waiting(), 0);
    }
}
