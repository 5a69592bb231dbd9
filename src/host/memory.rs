// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-memory reference host
//!
//! Implements the three host primitives without any networking. The methods
//! on each object play the role of application code and of the platform's
//! native layer, invoking whatever hook is currently installed. Used by the
//! CLI demo and as the fake adapter target in tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{
    EventSourceClass, EventSourceHandle, EventSourceHooks, EventSourceNotice, EventSourceRef,
    HttpPrimitive, PatchSlot, ReadyState, SocketBridgeModule, SocketHooks, SocketMethod, XhrHandle,
    XhrHooks, XhrRef,
};
use crate::network::{BodyContent, Headers, RequestBody, RequestId, SocketId, SseErrorKind};

/// Request primitive of the reference host
pub struct MemoryHttp {
    slot: Arc<PatchSlot<dyn XhrHooks>>,
}

impl MemoryHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Arc::new(PatchSlot::new()),
        })
    }

    /// Construct a request object
    pub fn create(&self) -> Arc<MemoryXhr> {
        Arc::new(MemoryXhr {
            slot: self.slot.clone(),
            state: Mutex::new(XhrState::default()),
            correlation: Mutex::new(None),
        })
    }
}

impl HttpPrimitive for MemoryHttp {
    fn patch(&self, hooks: Arc<dyn XhrHooks>) {
        self.slot.install(hooks);
    }

    fn restore(&self) {
        self.slot.restore();
    }

    fn is_patched(&self) -> bool {
        self.slot.is_installed()
    }
}

#[derive(Default)]
struct XhrState {
    method: String,
    url: String,
    request_headers: Headers,
    ready_state: Option<ReadyState>,
    status: u16,
    status_text: String,
    response_headers: Headers,
    body: Option<BodyContent>,
    readable: bool,
    stack: Option<String>,
    read_delay: Option<Duration>,
}

/// Request object of the reference host
pub struct MemoryXhr {
    slot: Arc<PatchSlot<dyn XhrHooks>>,
    state: Mutex<XhrState>,
    correlation: Mutex<Option<RequestId>>,
}

impl MemoryXhr {
    fn handle(self: &Arc<Self>) -> XhrRef {
        self.clone()
    }

    fn set_ready_state(self: &Arc<Self>, ready_state: ReadyState) {
        self.state.lock().ready_state = Some(ready_state);
        if let Some(hook) = self.slot.current() {
            hook.on_ready_state_change(&self.handle(), ready_state);
        }
    }

    /// Current ready state
    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state.unwrap_or(ReadyState::Unsent)
    }

    pub fn open(self: &Arc<Self>, method: &str, url: &str) {
        {
            let mut state = self.state.lock();
            *state = XhrState {
                method: method.to_uppercase(),
                url: url.to_string(),
                ..Default::default()
            };
        }
        if let Some(hook) = self.slot.current() {
            hook.on_open(&self.handle(), method, url);
        }
        self.set_ready_state(ReadyState::Opened);
    }

    pub fn set_request_header(&self, name: &str, value: &str) {
        self.state.lock().request_headers.append(name, value);
    }

    /// Stack trace the platform would capture at `send`
    pub fn set_initiator_stack(&self, stack: &str) {
        self.state.lock().stack = Some(stack.to_string());
    }

    pub fn send(self: &Arc<Self>, body: Option<RequestBody>) {
        if let Some(hook) = self.slot.current() {
            hook.on_send(&self.handle(), body.as_ref());
        }
    }

    /// Native layer received the status line and headers
    pub fn receive_headers(self: &Arc<Self>, status: u16, status_text: &str, headers: Headers) {
        {
            let mut state = self.state.lock();
            state.status = status;
            state.status_text = status_text.to_string();
            state.response_headers = headers;
        }
        self.set_ready_state(ReadyState::HeadersReceived);
    }

    /// Native layer received part of the body
    pub fn progress(self: &Arc<Self>, loaded: u64, total: Option<u64>) {
        if self.ready_state() != ReadyState::Loading {
            self.set_ready_state(ReadyState::Loading);
        }
        if let Some(hook) = self.slot.current() {
            hook.on_progress(&self.handle(), loaded, total);
        }
    }

    /// Native layer finished the body
    pub fn complete(self: &Arc<Self>, body: BodyContent) {
        {
            let mut state = self.state.lock();
            state.body = Some(body);
            state.readable = true;
        }
        self.set_ready_state(ReadyState::Done);
        if let Some(hook) = self.slot.current() {
            hook.on_load(&self.handle());
        }
    }

    /// Network failure
    pub fn fail(self: &Arc<Self>) {
        self.terminate();
        if let Some(hook) = self.slot.current() {
            hook.on_error(&self.handle());
        }
    }

    pub fn abort(self: &Arc<Self>) {
        self.terminate();
        if let Some(hook) = self.slot.current() {
            hook.on_abort(&self.handle());
        }
    }

    pub fn time_out(self: &Arc<Self>) {
        self.terminate();
        if let Some(hook) = self.slot.current() {
            hook.on_timeout(&self.handle());
        }
    }

    /// Read the body back through a tokio timer, as hosts with async body stores do
    pub fn delay_reads(&self, by: Duration) {
        self.state.lock().read_delay = Some(by);
    }

    /// Make the body unreadable, as after a consuming read
    pub fn discard_body(&self) {
        self.state.lock().readable = false;
    }

    fn terminate(self: &Arc<Self>) {
        self.state.lock().status = 0;
        self.set_ready_state(ReadyState::Done);
    }
}

#[async_trait]
impl XhrHandle for MemoryXhr {
    fn correlation_id(&self) -> Option<RequestId> {
        self.correlation.lock().clone()
    }

    fn set_correlation_id(&self, id: Option<RequestId>) {
        *self.correlation.lock() = id;
    }

    fn method(&self) -> String {
        self.state.lock().method.clone()
    }

    fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    fn request_headers(&self) -> Headers {
        self.state.lock().request_headers.clone()
    }

    fn status(&self) -> u16 {
        self.state.lock().status
    }

    fn status_text(&self) -> String {
        self.state.lock().status_text.clone()
    }

    fn response_headers(&self) -> Headers {
        self.state.lock().response_headers.clone()
    }

    fn response_size(&self) -> Option<u64> {
        let state = self.state.lock();
        match &state.body {
            Some(BodyContent::Text(text)) => Some(text.len() as u64),
            Some(BodyContent::Bytes(bytes)) => Some(bytes.len() as u64),
            Some(BodyContent::Json(value)) => Some(value.to_string().len() as u64),
            None => state
                .response_headers
                .get("content-length")
                .and_then(|v| v.parse().ok()),
        }
    }

    fn initiator_stack(&self) -> Option<String> {
        self.state.lock().stack.clone()
    }

    async fn read_response(&self) -> Option<BodyContent> {
        let delay = self.state.lock().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock();
        if state.readable {
            state.body.clone()
        } else {
            None
        }
    }
}

/// Socket bridge module of the reference host
///
/// `legacy` hosts use the older argument layouts: `connect(url, protocols, id)`
/// and `close(id)`. Current hosts use `connect(url, protocols, options, id)`
/// and `close(code, reason, id)`.
pub struct MemorySocketModule {
    slot: PatchSlot<dyn SocketHooks>,
    legacy: bool,
    next_id: AtomicI64,
}

impl MemorySocketModule {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: PatchSlot::new(),
            legacy: false,
            next_id: AtomicI64::new(0),
        })
    }

    /// Module using the older argument layouts
    pub fn legacy() -> Arc<Self> {
        Arc::new(Self {
            slot: PatchSlot::new(),
            legacy: true,
            next_id: AtomicI64::new(0),
        })
    }

    fn call(&self, method: SocketMethod, args: Vec<Value>) {
        if let Some(hook) = self.slot.current() {
            hook.on_call(method, &args);
        }
    }

    /// Host event from the native side
    pub fn emit(&self, name: &str, payload: Value) {
        if let Some(hook) = self.slot.current() {
            hook.on_event(name, &payload);
        }
    }

    pub fn connect(&self, url: &str, protocols: &[&str]) -> SocketId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let protocols = if protocols.is_empty() {
            Value::Null
        } else {
            json!(protocols)
        };
        let args = if self.legacy {
            vec![json!(url), protocols, json!(id)]
        } else {
            vec![json!(url), protocols, json!({ "headers": {} }), json!(id)]
        };
        self.call(SocketMethod::Connect, args);
        id
    }

    pub fn send(&self, socket_id: SocketId, text: &str) {
        self.call(SocketMethod::Send, vec![json!(text), json!(socket_id)]);
    }

    pub fn send_binary(&self, socket_id: SocketId, data: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        self.call(SocketMethod::SendBinary, vec![json!(encoded), json!(socket_id)]);
    }

    pub fn close(&self, socket_id: SocketId, code: u16, reason: &str) {
        let args = if self.legacy {
            vec![json!(socket_id)]
        } else {
            vec![json!(code), json!(reason), json!(socket_id)]
        };
        self.call(SocketMethod::Close, args);
    }

    pub fn server_open(&self, socket_id: SocketId, protocol: Option<&str>) {
        self.emit("websocketOpen", json!({ "id": socket_id, "protocol": protocol }));
    }

    pub fn server_message(&self, socket_id: SocketId, data: &str) {
        self.emit(
            "websocketMessage",
            json!({ "id": socket_id, "type": "text", "data": data }),
        );
    }

    pub fn server_binary(&self, socket_id: SocketId, data: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        self.emit(
            "websocketMessage",
            json!({ "id": socket_id, "type": "binary", "data": encoded }),
        );
    }

    pub fn server_close(&self, socket_id: SocketId, code: u16, reason: &str) {
        self.emit(
            "websocketClosed",
            json!({ "id": socket_id, "code": code, "reason": reason }),
        );
    }

    pub fn server_fail(&self, socket_id: SocketId, message: &str) {
        self.emit("websocketFailed", json!({ "id": socket_id, "message": message }));
    }
}

impl SocketBridgeModule for MemorySocketModule {
    fn patch(&self, hooks: Arc<dyn SocketHooks>) {
        self.slot.install(hooks);
    }

    fn restore(&self) {
        self.slot.restore();
    }

    fn is_patched(&self) -> bool {
        self.slot.is_installed()
    }
}

/// Event source class of the reference host
pub struct MemoryEventSources {
    slot: Arc<PatchSlot<dyn EventSourceHooks>>,
    http: Arc<MemoryHttp>,
}

impl MemoryEventSources {
    /// Event sources run over `http` request objects
    pub fn new(http: Arc<MemoryHttp>) -> Arc<Self> {
        Arc::new(Self {
            slot: Arc::new(PatchSlot::new()),
            http,
        })
    }

    /// Construct an event source and run its connection-open method
    pub fn open(&self, url: &str) -> Arc<MemoryEventSource> {
        let xhr = self.http.create();
        xhr.open("GET", url);
        xhr.set_request_header("Accept", "text/event-stream");
        xhr.set_request_header("Cache-Control", "no-cache");
        xhr.send(None);

        let source = Arc::new(MemoryEventSource {
            url: url.to_string(),
            xhr,
            slot: self.slot.clone(),
        });
        if let Some(hook) = self.slot.current() {
            let handle: EventSourceRef = source.clone();
            hook.on_connection_open(&handle);
        }
        source
    }
}

impl EventSourceClass for MemoryEventSources {
    fn patch(&self, hooks: Arc<dyn EventSourceHooks>) {
        self.slot.install(hooks);
    }

    fn restore(&self) {
        self.slot.restore();
    }

    fn is_patched(&self) -> bool {
        self.slot.is_installed()
    }
}

/// Event source instance of the reference host
pub struct MemoryEventSource {
    url: String,
    xhr: Arc<MemoryXhr>,
    slot: Arc<PatchSlot<dyn EventSourceHooks>>,
}

impl MemoryEventSource {
    fn notify(self: &Arc<Self>, notice: EventSourceNotice) {
        if let Some(hook) = self.slot.current() {
            let handle: EventSourceRef = self.clone();
            hook.on_notice(&handle, &notice);
        }
    }

    /// Underlying request object
    pub fn xhr(&self) -> &Arc<MemoryXhr> {
        &self.xhr
    }

    /// Server accepted the stream
    pub fn connected(self: &Arc<Self>) {
        let mut headers = Headers::new();
        headers.append("Content-Type", "text/event-stream");
        self.xhr.receive_headers(200, "OK", headers);
        self.notify(EventSourceNotice::Open);
    }

    pub fn message(self: &Arc<Self>, event_type: &str, data: &str, last_event_id: Option<&str>) {
        self.notify(EventSourceNotice::Message {
            event_type: event_type.to_string(),
            data: data.to_string(),
            last_event_id: last_event_id.map(String::from),
        });
    }

    pub fn error(self: &Arc<Self>, kind: SseErrorKind, detail: Option<&str>) {
        self.notify(EventSourceNotice::Error {
            kind,
            detail: detail.map(String::from),
        });
    }

    /// Application closed the source; the underlying request is aborted
    pub fn close(self: &Arc<Self>) {
        self.xhr.abort();
        self.notify(EventSourceNotice::Close);
    }
}

impl EventSourceHandle for MemoryEventSource {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn transport(&self) -> Option<XhrRef> {
        Some(self.xhr.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpatched_xhr_runs_natively() {
        let http = MemoryHttp::new();
        let xhr = http.create();

        xhr.open("get", "https://example.com/a");
        xhr.send(None);
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.complete(BodyContent::Text("ok".into()));

        assert!(!http.is_patched());
        assert_eq!(xhr.method(), "GET");
        assert_eq!(xhr.ready_state(), ReadyState::Done);
        assert_eq!(xhr.response_size(), Some(2));
        assert_eq!(xhr.correlation_id(), None);
    }

    #[tokio::test]
    async fn test_discarded_body_is_unreadable() {
        let http = MemoryHttp::new();
        let xhr = http.create();
        xhr.open("GET", "https://example.com");
        xhr.complete(BodyContent::Text("x".into()));

        xhr.delay_reads(Duration::from_millis(1));
        assert!(xhr.read_response().await.is_some());
        xhr.discard_body();
        assert!(xhr.read_response().await.is_none());
    }

    #[test]
    fn test_socket_ids_increment() {
        let module = MemorySocketModule::new();
        assert_eq!(module.connect("wss://a", &[]), 0);
        assert_eq!(module.connect("wss://b", &["chat"]), 1);
    }
}
