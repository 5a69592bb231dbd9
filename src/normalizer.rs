// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Lifecycle state machine and event normalizer
//!
//! Consumes raw interceptor signals, advances the per-id record through its
//! state machine and emits a [`NetworkEvent`] only when a transition actually
//! happens. Emission is gated on transitions rather than callback arrival, so
//! per-id events are always a prefix of `sent, received, completed|failed`.
//!
//! Every transition runs inside a short registry lock that never calls out.
//! Events are emitted after the lock is released, so a sink may re-enter the
//! host (and thus the normalizer) from inside `emit`.

use std::sync::Arc;

use crate::clock::SharedClock;
use crate::config::InspectorConfig;
use crate::error::{Error, Result, Transport};
use crate::host::XhrRef;
use crate::interceptor::{
    FailureReason, HttpSignal, SignalSink, SocketCall, SocketNotice, SocketSignal, SseSignal,
};
use crate::network::{
    ConnectionRecord, Direction, Headers, NetworkEvent, RequestCompleted, RequestFailed, RequestId,
    RequestPatch, RequestPayload, RequestProgress, RequestRecord, RequestSent, RequestStatus,
    ResourceType, ResponseMeta, ResponsePayload, ResponseReceived, SocketId, SocketMessage,
    SocketStatus, SseClose, SseConnectionRecord, SseError, SseMessage, SseMessageEvent, SseOpen,
    SseStatus, WebsocketClose, WebsocketConnect, WebsocketError, WebsocketMessage, WebsocketOpen,
};
use crate::registry::Registry;

/// HTTP requests with their native handles
pub type RequestRegistry = Registry<RequestId, RequestRecord, XhrRef>;

/// WebSocket connections keyed by host socket id
pub type SocketRegistry = Registry<SocketId, ConnectionRecord>;

/// SSE connections keyed by the underlying request id
pub type StreamRegistry = Registry<RequestId, SseConnectionRecord>;

/// Consumer of normalized events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: NetworkEvent);
}

impl<F> EventSink for F
where
    F: Fn(NetworkEvent) + Send + Sync,
{
    fn emit(&self, event: NetworkEvent) {
        self(event)
    }
}

/// Per-session state machine over the three registries
pub struct Normalizer {
    clock: SharedClock,
    requests: Arc<RequestRegistry>,
    sockets: SocketRegistry,
    streams: StreamRegistry,
    capacity: usize,
    sink: Arc<dyn EventSink>,
}

impl Normalizer {
    pub fn new(config: &InspectorConfig, clock: SharedClock, sink: Arc<dyn EventSink>) -> Self {
        Self {
            requests: Arc::new(Registry::new("requests", config.request_ttl, clock.clone())),
            sockets: Registry::new("sockets", config.connection_ttl, clock.clone()),
            streams: Registry::new("streams", config.connection_ttl, clock.clone()),
            capacity: config.message_log_capacity,
            clock,
            sink,
        }
    }

    /// Request registry, shared with the body resolver
    pub fn requests(&self) -> Arc<RequestRegistry> {
        self.requests.clone()
    }

    /// Snapshot of a tracked request
    pub fn request(&self, id: &str) -> Option<RequestRecord> {
        self.requests
            .get_entry(&id.to_string())
            .map(|entry| entry.metadata)
    }

    /// Snapshot of a tracked WebSocket connection
    pub fn connection(&self, socket_id: SocketId) -> Option<ConnectionRecord> {
        self.sockets.get_entry(&socket_id).map(|entry| entry.metadata)
    }

    /// Snapshot of a tracked SSE connection
    pub fn stream(&self, id: &str) -> Option<SseConnectionRecord> {
        self.streams
            .get_entry(&id.to_string())
            .map(|entry| entry.metadata)
    }

    /// Logged messages of a WebSocket, oldest first
    pub fn websocket_messages(&self, socket_id: SocketId) -> Option<Vec<SocketMessage>> {
        self.sockets
            .with_entry_mut(&socket_id, |entry| entry.metadata.messages.to_vec())
    }

    /// Logged events of an SSE connection, oldest first
    pub fn sse_messages(&self, id: &str) -> Option<Vec<SseMessage>> {
        self.streams
            .with_entry_mut(&id.to_string(), |entry| entry.metadata.messages.to_vec())
    }

    /// Drop all tracked state
    pub fn clear(&self) {
        self.requests.clear();
        self.sockets.clear();
        self.streams.clear();
    }

    fn emit_all(&self, events: Vec<NetworkEvent>) {
        for event in events {
            tracing::trace!(kind = event.kind(), "Emitting event");
            self.sink.emit(event);
        }
    }

    // HTTP

    fn request_sent(&self, id: RequestId, handle: XhrRef, mut record: RequestRecord) {
        let now = self.clock.now_ms();
        record.started_at = now;
        let event = NetworkEvent::RequestSent(RequestSent {
            request_id: id.clone(),
            request: RequestPayload {
                url: record.url.clone(),
                method: record.method.clone(),
                headers: record.headers.clone(),
                post_data: record.post_data.clone(),
            },
            timestamp: now,
            initiator: record.initiator.clone(),
            resource_type: record.resource_type,
        });

        tracing::debug!(request_id = %id, method = %record.method, url = %record.url, "Request sent");
        self.requests.add_entry(id, handle, record);
        self.emit_all(vec![event]);
    }

    fn with_request<R>(&self, id: &RequestId, f: impl FnOnce(&mut RequestRecord) -> R) -> Result<R> {
        self.requests
            .with_entry_mut(id, |entry| f(&mut entry.metadata))
            .ok_or_else(|| Error::correlation_miss(Transport::Http, id))
    }

    fn headers_received(&self, id: RequestId, response: ResponseMeta) -> Result<()> {
        let now = self.clock.now_ms();
        let events = self.with_request(&id, |record| {
            receive_headers(record, response, now)
                .into_iter()
                .collect::<Vec<_>>()
        })?;
        self.emit_all(events);
        Ok(())
    }

    fn progress(&self, id: RequestId, loaded: u64, total: Option<u64>) -> Result<()> {
        let now = self.clock.now_ms();
        let loading = self.with_request(&id, |record| record.status == RequestStatus::Loading)?;
        if loading {
            self.emit_all(vec![NetworkEvent::RequestProgress(RequestProgress {
                request_id: id,
                timestamp: now,
                loaded,
                total,
            })]);
        }
        Ok(())
    }

    fn done(&self, id: RequestId, response: ResponseMeta) -> Result<()> {
        let now = self.clock.now_ms();
        let events = self.with_request(&id, |record| {
            let mut events = Vec::new();
            // Completion seen before headers: synthesize the response first
            if record.status == RequestStatus::Pending {
                events.extend(receive_headers(record, response.clone(), now));
            }
            if record.status.transition(RequestStatus::Finished) {
                record.ended_at = Some(now);
                let size = response.size.unwrap_or(0);
                record.response = Some(response);
                events.push(NetworkEvent::RequestCompleted(RequestCompleted {
                    request_id: record.id.clone(),
                    timestamp: now,
                    duration: record.duration().unwrap_or(0),
                    size,
                    ttfb: record.ttfb(),
                }));
            }
            events
        })?;
        if !events.is_empty() {
            tracing::debug!(request_id = %id, "Request completed");
        }
        self.emit_all(events);
        Ok(())
    }

    fn failed(&self, id: RequestId, reason: FailureReason) -> Result<()> {
        let now = self.clock.now_ms();
        let event = self.with_request(&id, |record| {
            if !record.status.transition(RequestStatus::Failed) {
                return None;
            }
            record.ended_at = Some(now);
            record.canceled = reason.is_cancel();
            Some(NetworkEvent::RequestFailed(RequestFailed {
                request_id: record.id.clone(),
                timestamp: now,
                resource_type: record.resource_type,
                error: reason.message().to_string(),
                canceled: reason.is_cancel(),
            }))
        })?;
        if let Some(event) = event {
            let failure = Error::transport_failure(&id, reason.message());
            tracing::debug!(request_id = %id, error = %failure, "Request failed");
            self.emit_all(vec![event]);
        }
        Ok(())
    }

    // WebSocket

    fn with_socket<R>(
        &self,
        socket_id: SocketId,
        f: impl FnOnce(&mut ConnectionRecord) -> R,
    ) -> Result<R> {
        self.sockets
            .with_entry_mut(&socket_id, |entry| f(&mut entry.metadata))
            .ok_or_else(|| Error::correlation_miss(Transport::WebSocket, socket_id))
    }

    fn socket_call(&self, call: SocketCall) -> Result<()> {
        let now = self.clock.now_ms();
        match call {
            SocketCall::Connect {
                socket_id,
                url,
                protocols,
            } => {
                let record =
                    ConnectionRecord::new(socket_id, url.clone(), protocols.clone(), now, self.capacity);
                self.sockets.add_entry(socket_id, (), record);
                tracing::debug!(socket_id, %url, "WebSocket connecting");
                self.emit_all(vec![NetworkEvent::WebsocketConnect(WebsocketConnect {
                    socket_id,
                    url,
                    protocols,
                    timestamp: now,
                })]);
            }
            SocketCall::Send {
                socket_id,
                data,
                message_type,
            } => {
                let logged = self.with_socket(socket_id, |record| {
                    if record.status.is_terminal() {
                        return false;
                    }
                    record.messages.push(SocketMessage {
                        direction: Direction::Sent,
                        payload: data.clone(),
                        message_type,
                        timestamp: now,
                    });
                    true
                })?;
                if logged {
                    self.emit_all(vec![NetworkEvent::WebsocketMessageSent(WebsocketMessage {
                        socket_id,
                        data,
                        message_type,
                        timestamp: now,
                    })]);
                }
            }
            SocketCall::Close {
                socket_id,
                code,
                reason,
            } => {
                // The close event follows from the host once the socket is down
                self.with_socket(socket_id, |record| {
                    if record.status.transition(SocketStatus::Closing) {
                        record.close_code = code;
                        record.close_reason = reason;
                    }
                })?;
            }
        }
        Ok(())
    }

    fn socket_notice(&self, notice: SocketNotice) -> Result<()> {
        let now = self.clock.now_ms();
        let event = match notice {
            SocketNotice::Opened {
                socket_id,
                protocol,
            } => self.with_socket(socket_id, |record| {
                if !record.status.transition(SocketStatus::Open) {
                    return None;
                }
                record.opened_at = Some(now);
                record.protocol = protocol.clone();
                Some(NetworkEvent::WebsocketOpen(WebsocketOpen {
                    socket_id,
                    url: record.url.clone(),
                    protocol,
                    timestamp: now,
                }))
            })?,
            SocketNotice::Message {
                socket_id,
                data,
                message_type,
            } => self.with_socket(socket_id, |record| {
                if record.status.is_terminal() {
                    return None;
                }
                record.messages.push(SocketMessage {
                    direction: Direction::Received,
                    payload: data.clone(),
                    message_type,
                    timestamp: now,
                });
                Some(NetworkEvent::WebsocketMessageReceived(WebsocketMessage {
                    socket_id,
                    data,
                    message_type,
                    timestamp: now,
                }))
            })?,
            SocketNotice::Closed {
                socket_id,
                code,
                reason,
            } => self.with_socket(socket_id, |record| {
                if !record.status.transition(SocketStatus::Closed) {
                    return None;
                }
                record.closed_at = Some(now);
                if code.is_some() {
                    record.close_code = code;
                }
                if reason.is_some() {
                    record.close_reason = reason;
                }
                Some(NetworkEvent::WebsocketClose(WebsocketClose {
                    socket_id,
                    url: record.url.clone(),
                    code: record.close_code,
                    reason: record.close_reason.clone(),
                    duration: record.duration(),
                    timestamp: now,
                }))
            })?,
            SocketNotice::Failed { socket_id, message } => {
                let failure = Error::transport_failure(socket_id, &message);
                tracing::debug!(socket_id, error = %failure, "WebSocket failed");
                self.with_socket(socket_id, |record| {
                    if !record.status.transition(SocketStatus::Error) {
                        return None;
                    }
                    record.closed_at = Some(now);
                    Some(NetworkEvent::WebsocketError(WebsocketError {
                        socket_id,
                        url: record.url.clone(),
                        error: message,
                        timestamp: now,
                    }))
                })?
            }
        };
        self.emit_all(event.into_iter().collect());
        Ok(())
    }

    // SSE

    fn with_stream<R>(
        &self,
        id: &RequestId,
        f: impl FnOnce(&mut SseConnectionRecord) -> R,
    ) -> Result<R> {
        self.streams
            .with_entry_mut(id, |entry| f(&mut entry.metadata))
            .ok_or_else(|| Error::correlation_miss(Transport::Sse, id))
    }

    fn sse(&self, signal: SseSignal) -> Result<()> {
        let now = self.clock.now_ms();
        let event = match signal {
            SseSignal::Connecting { id, url } => {
                self.requests.update_entry(
                    &id,
                    RequestPatch {
                        resource_type: Some(ResourceType::EventSource),
                        ..Default::default()
                    },
                );
                let record = SseConnectionRecord::new(id.clone(), url.clone(), now, self.capacity);
                self.streams.add_entry(id.clone(), (), record);
                tracing::debug!(request_id = %id, %url, "SSE connecting");
                None
            }
            SseSignal::Open { id, response } => self.with_stream(&id, |record| {
                if !record.status.transition(SseStatus::Open) {
                    return None;
                }
                record.opened_at = Some(now);
                Some(NetworkEvent::SseOpen(SseOpen {
                    request_id: id.clone(),
                    url: record.url.clone(),
                    timestamp: now,
                    response: response.map(|meta| ResponsePayload::from_meta(&meta, now)),
                }))
            })?,
            SseSignal::Message {
                id,
                event_type,
                data,
                last_event_id,
            } => self.with_stream(&id, |record| {
                if record.status.is_terminal() {
                    return None;
                }
                record.messages.push(SseMessage {
                    event_type: event_type.clone(),
                    payload: data.clone(),
                    last_event_id: last_event_id.clone(),
                    timestamp: now,
                });
                Some(NetworkEvent::SseMessage(SseMessageEvent {
                    request_id: id.clone(),
                    event_type,
                    data,
                    last_event_id,
                    timestamp: now,
                }))
            })?,
            SseSignal::Error { id, kind, detail } => self.with_stream(&id, |record| {
                if !record.status.transition(SseStatus::Error) {
                    return None;
                }
                record.closed_at = Some(now);
                Some(NetworkEvent::SseError(SseError {
                    request_id: id.clone(),
                    error_type: kind,
                    message: kind.message().to_string(),
                    detail,
                    timestamp: now,
                }))
            })?,
            SseSignal::Close { id } => self.with_stream(&id, |record| {
                if !record.status.transition(SseStatus::Closed) {
                    return None;
                }
                record.closed_at = Some(now);
                Some(NetworkEvent::SseClose(SseClose {
                    request_id: id.clone(),
                    timestamp: now,
                }))
            })?,
        };
        self.emit_all(event.into_iter().collect());
        Ok(())
    }
}

/// Pending to loading, capturing the response metadata
fn receive_headers(
    record: &mut RequestRecord,
    response: ResponseMeta,
    now: u64,
) -> Option<NetworkEvent> {
    if !record.status.transition(RequestStatus::Loading) {
        return None;
    }
    record.headers_at = Some(now);
    let payload = ResponsePayload::from_meta(&response, now);
    record.response = Some(response);
    Some(NetworkEvent::ResponseReceived(ResponseReceived {
        request_id: record.id.clone(),
        timestamp: now,
        resource_type: record.resource_type,
        response: payload,
    }))
}

impl SignalSink<HttpSignal> for Normalizer {
    fn deliver(&self, signal: HttpSignal) -> Result<()> {
        match signal {
            HttpSignal::Sent {
                id,
                handle,
                method,
                url,
                headers,
                post_data,
                initiator,
            } => {
                let mut record = RequestRecord::new(id.clone(), method, url, 0);
                record.headers = headers;
                record.post_data = post_data;
                record.initiator = initiator;
                if accepts_event_stream(&record.headers) {
                    record.resource_type = ResourceType::EventSource;
                }
                self.request_sent(id, handle, record);
                Ok(())
            }
            HttpSignal::HeadersReceived { id, response } => self.headers_received(id, response),
            HttpSignal::Progress { id, loaded, total } => self.progress(id, loaded, total),
            HttpSignal::Done { id, response } => self.done(id, response),
            HttpSignal::Failed { id, reason } => self.failed(id, reason),
        }
    }
}

/// Event source transports announce themselves before the source hook runs
fn accepts_event_stream(headers: &Headers) -> bool {
    headers
        .get_all("accept")
        .iter()
        .any(|value| value.to_ascii_lowercase().contains("text/event-stream"))
}

impl SignalSink<SocketSignal> for Normalizer {
    fn deliver(&self, signal: SocketSignal) -> Result<()> {
        match signal {
            SocketSignal::Call(call) => self.socket_call(call),
            SocketSignal::Notice(notice) => self.socket_notice(notice),
        }
    }
}

impl SignalSink<SseSignal> for Normalizer {
    fn deliver(&self, signal: SseSignal) -> Result<()> {
        self.sse(signal)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::host::{MemoryHttp, MemorySocketModule, MemoryXhr};
    use crate::interceptor::{HttpInterceptor, Interceptor, WebSocketInterceptor};
    use crate::network::{BodyContent, Headers, SseErrorKind};

    type Events = Arc<Mutex<Vec<NetworkEvent>>>;

    struct Harness {
        clock: ManualClock,
        http: Arc<MemoryHttp>,
        sockets: Arc<MemorySocketModule>,
        normalizer: Arc<Normalizer>,
        events: Events,
        _interceptors: (HttpInterceptor, WebSocketInterceptor),
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(1_000);
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let collected = events.clone();
        let normalizer = Arc::new(Normalizer::new(
            &InspectorConfig::default(),
            Arc::new(clock.clone()),
            Arc::new(move |event: NetworkEvent| collected.lock().push(event)),
        ));

        let http = MemoryHttp::new();
        let http_interceptor = HttpInterceptor::new(http.clone());
        http_interceptor.set_sink(normalizer.clone());
        http_interceptor.enable().unwrap();

        let sockets = MemorySocketModule::new();
        let socket_interceptor = WebSocketInterceptor::new(sockets.clone());
        socket_interceptor.set_sink(normalizer.clone());
        socket_interceptor.enable().unwrap();

        Harness {
            clock,
            http,
            sockets,
            normalizer,
            events,
            _interceptors: (http_interceptor, socket_interceptor),
        }
    }

    fn kinds(events: &Events) -> Vec<&'static str> {
        events.lock().iter().map(NetworkEvent::kind).collect()
    }

    fn started(h: &Harness, url: &str) -> Arc<MemoryXhr> {
        let xhr = h.http.create();
        xhr.open("GET", url);
        xhr.send(None);
        xhr
    }

    #[test]
    fn test_xhr_success_sequence() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/items");
        h.clock.advance(Duration::from_millis(40));
        xhr.receive_headers(200, "OK", Headers::new());
        h.clock.advance(Duration::from_millis(10));
        xhr.complete(BodyContent::Text("ok".into()));

        assert_eq!(
            kinds(&h.events),
            vec!["request-sent", "response-received", "request-completed"]
        );

        let events = h.events.lock();
        let ids: Vec<_> = events.iter().filter_map(NetworkEvent::request_id).collect();
        assert!(ids.iter().all(|id| *id == "req_1"));
        match &events[0] {
            NetworkEvent::RequestSent(sent) => assert_eq!(sent.request.method, "GET"),
            other => panic!("unexpected {:?}", other),
        }
        match &events[1] {
            NetworkEvent::ResponseReceived(received) => assert_eq!(received.response.status, 200),
            other => panic!("unexpected {:?}", other),
        }
        match &events[2] {
            NetworkEvent::RequestCompleted(completed) => {
                assert_eq!(completed.size, 2);
                assert_eq!(completed.duration, 50);
                assert_eq!(completed.ttfb, Some(40));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_before_load_fails_once() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/items");
        xhr.fail();
        xhr.complete(BodyContent::Text("late".into()));

        assert_eq!(kinds(&h.events), vec!["request-sent", "request-failed"]);
        let events = h.events.lock();
        match &events[1] {
            NetworkEvent::RequestFailed(failed) => {
                assert!(!failed.canceled);
                assert_eq!(failed.error, "Network request failed");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_timeout_fails_without_cancel() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/slow");
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.time_out();

        assert_eq!(
            kinds(&h.events),
            vec!["request-sent", "response-received", "request-failed"]
        );
        let events = h.events.lock();
        match &events[2] {
            NetworkEvent::RequestFailed(failed) => {
                assert!(!failed.canceled);
                assert_eq!(failed.error, "Request timed out");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_abort_is_canceled() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/items");
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.abort();
        xhr.abort();

        assert_eq!(
            kinds(&h.events),
            vec!["request-sent", "response-received", "request-failed"]
        );
        assert!(h.normalizer.request("req_1").unwrap().canceled);
    }

    #[test]
    fn test_repeated_headers_stage_is_idempotent() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/items");
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.receive_headers(200, "OK", Headers::new());

        assert_eq!(kinds(&h.events), vec!["request-sent", "response-received"]);
    }

    #[test]
    fn test_completion_from_pending_synthesizes_response() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/items");
        xhr.complete(BodyContent::Text("{}".into()));

        assert_eq!(
            kinds(&h.events),
            vec!["request-sent", "response-received", "request-completed"]
        );
    }

    #[test]
    fn test_progress_only_while_loading() {
        let h = harness();
        let xhr = started(&h, "https://api.example.com/big");
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.progress(10, Some(20));
        xhr.complete(BodyContent::Text("x".repeat(20)));
        xhr.progress(20, Some(20));

        assert_eq!(
            kinds(&h.events),
            vec![
                "request-sent",
                "response-received",
                "request-progress",
                "request-completed"
            ]
        );
    }

    #[test]
    fn test_signal_after_eviction_is_dropped() {
        let h = harness();
        let stale = started(&h, "https://api.example.com/slow");
        h.clock.advance(Duration::from_secs(301));
        started(&h, "https://api.example.com/fresh");

        stale.receive_headers(200, "OK", Headers::new());

        assert_eq!(kinds(&h.events), vec!["request-sent", "request-sent"]);
        assert!(h.normalizer.request("req_1").is_none());
        assert!(h.normalizer.request("req_2").is_some());
    }

    #[test]
    fn test_reentrant_sink() {
        let clock = ManualClock::new(0);
        let http = MemoryHttp::new();
        let interceptor = HttpInterceptor::new(http.clone());
        let events: Events = Arc::new(Mutex::new(Vec::new()));

        let collected = events.clone();
        let host = http.clone();
        let normalizer = Arc::new(Normalizer::new(
            &InspectorConfig::default(),
            Arc::new(clock),
            Arc::new(move |event: NetworkEvent| {
                let first = collected.lock().is_empty();
                collected.lock().push(event);
                // Application code issuing a request from inside a callback
                if first {
                    let xhr = host.create();
                    xhr.open("GET", "https://api.example.com/nested");
                    xhr.send(None);
                    xhr.complete(BodyContent::Text("n".into()));
                }
            }),
        ));
        interceptor.set_sink(normalizer.clone());
        interceptor.enable().unwrap();

        let outer = http.create();
        outer.open("GET", "https://api.example.com/outer");
        outer.send(None);

        assert_eq!(
            kinds(&events),
            vec![
                "request-sent",
                "request-sent",
                "response-received",
                "request-completed"
            ]
        );
        assert_eq!(normalizer.requests().len(), 2);
    }

    #[test]
    fn test_websocket_log_keeps_latest_messages() {
        let h = harness();
        let id = h.sockets.connect("wss://chat.example.com", &[]);
        h.sockets.server_open(id, None);
        for n in 1..=40 {
            h.sockets.send(id, &n.to_string());
        }

        let log = h.normalizer.websocket_messages(id).unwrap();
        let payloads: Vec<String> = log.iter().map(|m| m.payload.clone()).collect();
        let expected: Vec<String> = (9..=40).map(|n: i32| n.to_string()).collect();
        assert_eq!(payloads, expected);
        assert!(log.iter().all(|m| m.direction == Direction::Sent));
    }

    #[test]
    fn test_websocket_close_duration_and_locking() {
        let h = harness();
        let id = h.sockets.connect("wss://chat.example.com", &["chat"]);
        h.sockets.server_open(id, Some("chat"));
        h.clock.advance(Duration::from_millis(2_500));
        h.sockets.close(id, 1000, "bye");
        h.sockets.server_close(id, 1000, "bye");
        h.sockets.server_message(id, "late");
        h.sockets.server_fail(id, "late failure");

        assert_eq!(
            kinds(&h.events),
            vec!["websocket-connect", "websocket-open", "websocket-close"]
        );
        let events = h.events.lock();
        match &events[2] {
            NetworkEvent::WebsocketClose(close) => {
                assert_eq!(close.duration, Some(2_500));
                assert_eq!(close.code, Some(1000));
                assert_eq!(close.reason.as_deref(), Some("bye"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_websocket_failure() {
        let h = harness();
        let id = h.sockets.connect("wss://down.example.com", &[]);
        h.sockets.server_fail(id, "connection refused");

        assert_eq!(kinds(&h.events), vec!["websocket-connect", "websocket-error"]);
        assert_eq!(
            h.normalizer.connection(id).unwrap().status,
            SocketStatus::Error
        );
    }

    #[test]
    fn test_sse_lifecycle() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let collected = events.clone();
        let normalizer = Normalizer::new(
            &InspectorConfig::default(),
            Arc::new(ManualClock::new(0)),
            Arc::new(move |event: NetworkEvent| collected.lock().push(event)),
        );
        let id = "req_7".to_string();

        normalizer
            .deliver(SseSignal::Connecting {
                id: id.clone(),
                url: "https://example.com/stream".into(),
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Open {
                id: id.clone(),
                response: None,
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Message {
                id: id.clone(),
                event_type: "message".into(),
                data: "hello".into(),
                last_event_id: None,
            })
            .unwrap();
        normalizer.deliver(SseSignal::Close { id: id.clone() }).unwrap();
        normalizer
            .deliver(SseSignal::Message {
                id: id.clone(),
                event_type: "message".into(),
                data: "late".into(),
                last_event_id: None,
            })
            .unwrap();

        assert_eq!(kinds(&events), vec!["sse-open", "sse-message", "sse-close"]);
        assert_eq!(normalizer.sse_messages(&id).unwrap().len(), 1);

        let err = normalizer
            .deliver(SseSignal::Close {
                id: "req_404".into(),
            })
            .unwrap_err();
        assert!(err.is_correlation_miss());
    }

    #[test]
    fn test_sse_error_is_terminal() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let collected = events.clone();
        let normalizer = Normalizer::new(
            &InspectorConfig::default(),
            Arc::new(ManualClock::new(0)),
            Arc::new(move |event: NetworkEvent| collected.lock().push(event)),
        );
        let id = "req_3".to_string();

        normalizer
            .deliver(SseSignal::Connecting {
                id: id.clone(),
                url: "https://example.com/prices".into(),
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Open {
                id: id.clone(),
                response: None,
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Error {
                id: id.clone(),
                kind: SseErrorKind::Exception,
                detail: Some("parse failure".into()),
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Message {
                id: id.clone(),
                event_type: "price".into(),
                data: "1.08".into(),
                last_event_id: None,
            })
            .unwrap();
        normalizer
            .deliver(SseSignal::Error {
                id: id.clone(),
                kind: SseErrorKind::Timeout,
                detail: None,
            })
            .unwrap();

        assert_eq!(kinds(&events), vec!["sse-open", "sse-error"]);
        let events = events.lock();
        match &events[1] {
            NetworkEvent::SseError(error) => {
                assert_eq!(error.request_id, "req_3");
                assert_eq!(error.error_type, SseErrorKind::Exception);
                assert_eq!(error.message, SseErrorKind::Exception.message());
                assert_eq!(error.detail.as_deref(), Some("parse failure"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let payload = events[1].to_payload().unwrap();
        assert_eq!(payload["errorType"], "exception");
        assert!(normalizer.sse_messages(&id).unwrap().is_empty());
        assert_eq!(normalizer.stream(&id).unwrap().status, SseStatus::Error);
    }

    #[test]
    fn test_event_stream_request_is_typed_at_send() {
        let h = harness();
        let xhr = h.http.create();
        xhr.open("GET", "https://example.com/events");
        xhr.set_request_header("Accept", "text/event-stream");
        xhr.send(None);

        let events = h.events.lock();
        match &events[0] {
            NetworkEvent::RequestSent(sent) => {
                assert_eq!(sent.resource_type, ResourceType::EventSource)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
