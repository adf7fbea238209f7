//! Endpoint handlers for the bridge surface.
//!
//! Four call-path endpoints plus a liveness probe. Worker replies and
//! dispatch failures are all rendered as the same JSON reply shape; only
//! missing query parameters produce plain-text responses.

use crate::server::AppState;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use switchboard_core::conn::{FrameSink, FrameSource};
use switchboard_core::{
    dispatch, ids, CallReply, DispatchConfig, Dispatched, Member, Registry, ServerConfig,
    SwitchboardError, EXEC_ACTION,
};
use tracing::info;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Liveness probe.
pub async fn handle_index() -> impl IntoResponse {
    "switchboard dispatch bridge"
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub group: Option<String>,
    pub name: Option<String>,
}

/// Upgrade a worker connection and register it as a member. Workers that
/// connect without a name get a generated one.
pub async fn handle_ws(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(group) = params.group.filter(|g| !g.is_empty()) else {
        return missing_param("group");
    };
    let name = match params.name.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            let name = format!("{}{}", ServerConfig::GENERATED_NAME_PREFIX, ids::next_id());
            info!("unnamed worker, assigned name {}", name);
            name
        }
    };
    let registry = Arc::clone(&state.registry);
    ws.on_upgrade(move |socket| register_worker(registry, group, name, socket))
}

async fn register_worker(registry: Arc<Registry>, group: String, name: String, socket: WebSocket) {
    info!("worker connected: {}/{}", group, name);
    let (sink, stream) = socket.split();
    let member = Member::spawn(
        Arc::clone(&registry),
        &group,
        &name,
        Box::new(WsFrameSink(sink)),
        Box::new(WsFrameSource(stream)),
    );
    registry.insert(&group, &name, member);
}

#[derive(Debug, Deserialize)]
pub struct CallParams {
    pub group: Option<String>,
    pub name: Option<String>,
    pub action: Option<String>,
    pub param: Option<String>,
}

/// Dispatch an arbitrary action. `name` may contain a `*` selector.
pub async fn handle_call(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallParams>,
) -> Response {
    let Some(group) = params.group.filter(|v| !v.is_empty()) else {
        return missing_param("group");
    };
    let Some(name) = params.name.filter(|v| !v.is_empty()) else {
        return missing_param("name");
    };
    let Some(action) = params.action.filter(|v| !v.is_empty()) else {
        return missing_param("action");
    };
    let param = params.param.unwrap_or_default();
    do_dispatch(&state, &group, &name, &action, &param).await
}

#[derive(Debug, Deserialize)]
pub struct ExecParams {
    pub group: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
}

/// Shorthand for dispatching the reserved code-evaluation action.
pub async fn handle_exec(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecParams>,
) -> Response {
    let Some(group) = params.group.filter(|v| !v.is_empty()) else {
        return missing_param("group");
    };
    let Some(name) = params.name.filter(|v| !v.is_empty()) else {
        return missing_param("name");
    };
    let code = params.code.unwrap_or_default();
    do_dispatch(&state, &group, &name, EXEC_ACTION, &code).await
}

/// List every connected member with its counters.
pub async fn handle_list(State(state): State<Arc<AppState>>) -> Response {
    json_reply(StatusCode::OK, &state.registry.snapshot())
}

async fn do_dispatch(state: &AppState, group: &str, name: &str, action: &str, param: &str) -> Response {
    match dispatch(
        &state.registry,
        group,
        name,
        action,
        param,
        DispatchConfig::CALL_TIMEOUT,
    )
    .await
    {
        // An unknown member is an in-band failure, not an HTTP error.
        Dispatched::NotFound => json_reply(StatusCode::OK, &CallReply::no_such_connection()),
        Dispatched::TimedOut => {
            json_reply(StatusCode::INTERNAL_SERVER_ERROR, &CallReply::timed_out())
        }
        Dispatched::Reply(reply) => {
            let status = if reply.is_success() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            json_reply(status, &reply)
        }
    }
}

fn json_reply<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], json).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn missing_param(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("missing required parameter: {}", name),
    )
        .into_response()
}

/// Write half of an upgraded worker socket.
struct WsFrameSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_frame(&mut self, frame: String) -> switchboard_core::Result<()> {
        self.0
            .send(Message::Text(frame))
            .await
            .map_err(|e| SwitchboardError::Socket {
                message: e.to_string(),
            })
    }
}

/// Read half of an upgraded worker socket. Text and binary frames both
/// carry reply arrays; pings and pongs are the transport's business.
struct WsFrameSource(SplitStream<WebSocket>);

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Option<switchboard_core::Result<String>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => {
                    return Some(Err(SwitchboardError::Socket {
                        message: e.to_string(),
                    }))
                }
            }
        }
    }
}
