// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Network inspector
//!
//! Wires the host seams, interceptors, normalizer, body resolver and bridge
//! together, and answers the inspector's control messages.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::bridge::{BridgeClient, BridgeSink, ControlMessage, Subscription};
use crate::clock::SharedClock;
use crate::config::{InspectorConfig, UrlFilter};
use crate::error::{Error, Result};
use crate::host::HostSeams;
use crate::interceptor::{HttpInterceptor, Interceptor, SseInterceptor, WebSocketInterceptor};
use crate::network::{
    ConnectionRecord, NetworkEvent, RequestId, RequestRecord, ResolvedBody, ResponseBody, SocketId,
    SocketMessage, SseMessage,
};
use crate::normalizer::{EventSink, Normalizer};
use crate::resolver::BodyResolver;

/// State of one enable/disable session
struct Session {
    normalizer: Arc<Normalizer>,
    resolver: BodyResolver,
}

/// Network activity inspector
pub struct NetworkInspector {
    /// Active configuration
    config: RwLock<InspectorConfig>,
    /// Bridge to the remote inspector
    bridge: Arc<dyn BridgeClient>,
    /// Time source for timestamps and TTLs
    clock: SharedClock,
    /// Interceptors for the seams the host provides
    http: Option<Arc<HttpInterceptor>>,
    websocket: Option<WebSocketInterceptor>,
    sse: Option<SseInterceptor>,
    /// Current session, if enabled
    session: RwLock<Option<Session>>,
    /// Control message handlers registered on the bridge
    subscriptions: Mutex<Vec<Subscription>>,
}

impl NetworkInspector {
    /// Create an inspector over the given host seams. Nothing is patched until
    /// [`NetworkInspector::enable`].
    pub fn new(
        config: InspectorConfig,
        seams: HostSeams,
        bridge: Arc<dyn BridgeClient>,
        clock: SharedClock,
    ) -> Arc<Self> {
        let http = seams.http.map(|primitive| Arc::new(HttpInterceptor::new(primitive)));
        let websocket = seams.sockets.map(WebSocketInterceptor::new);
        let sse = match (seams.event_sources, &http) {
            (Some(class), Some(http)) => Some(SseInterceptor::new(class, http.clone())),
            _ => None,
        };

        Arc::new(Self {
            config: RwLock::new(config),
            bridge,
            clock,
            http,
            websocket,
            sse,
            session: RwLock::new(None),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Current configuration
    pub fn config(&self) -> InspectorConfig {
        self.config.read().clone()
    }

    /// Listen for control messages on the bridge. Idempotent.
    pub fn attach(self: &Arc<Self>) {
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            return;
        }
        for event in ControlMessage::EVENTS {
            let inspector: Weak<Self> = Arc::downgrade(self);
            let subscription = self.bridge.on_message(
                event,
                Arc::new(move |payload: Value| {
                    if let Some(inspector) = inspector.upgrade() {
                        inspector.handle_message(event, &payload);
                    }
                }),
            );
            subscriptions.push(subscription);
        }
        tracing::debug!("Attached to inspector bridge");
    }

    /// Stop listening for control messages
    pub fn detach(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in subscriptions {
            subscription.remove();
        }
    }

    /// Validate the configuration and arm the configured interceptors
    ///
    /// Validation happens before anything is patched. If any interceptor
    /// fails to arm, those already armed are restored. Idempotent.
    pub fn enable(&self) -> Result<()> {
        let config = self.config.read().clone();
        config.validate()?;

        let mut session = self.session.write();
        if session.is_some() {
            return Ok(());
        }
        self.check_seams(&config)?;
        let filter = config.url_filter()?;

        let sink: Arc<dyn EventSink> = Arc::new(BridgeSink::new(self.bridge.clone()));
        let normalizer = Arc::new(Normalizer::new(&config, self.clock.clone(), sink));
        let resolver = BodyResolver::new(normalizer.requests());

        let mut armed: Vec<&dyn Interceptor> = Vec::new();
        let result = self.arm(&config, &normalizer, &filter, &mut armed);

        if let Err(e) = result {
            for interceptor in armed.iter().rev() {
                interceptor.disable();
            }
            tracing::warn!(error = %e, "Failed to enable network inspection");
            return Err(e);
        }

        *session = Some(Session {
            normalizer,
            resolver,
        });
        tracing::info!(
            http = config.http,
            websocket = config.websocket,
            sse = config.sse,
            "Network inspection enabled"
        );
        Ok(())
    }

    fn arm<'a>(
        &'a self,
        config: &InspectorConfig,
        normalizer: &Arc<Normalizer>,
        filter: &UrlFilter,
        armed: &mut Vec<&'a dyn Interceptor>,
    ) -> Result<()> {
        if let (true, Some(http)) = (config.http, &self.http) {
            http.set_sink(normalizer.clone());
            http.set_filter(filter.clone());
            http.enable()?;
            armed.push(http.as_ref());
        }
        if let (true, Some(websocket)) = (config.websocket, &self.websocket) {
            websocket.set_sink(normalizer.clone());
            websocket.set_filter(filter.clone());
            websocket.enable()?;
            armed.push(websocket);
        }
        if let (true, Some(sse)) = (config.sse, &self.sse) {
            sse.set_sink(normalizer.clone());
            sse.set_filter(filter.clone());
            sse.enable()?;
            armed.push(sse);
        }
        Ok(())
    }

    fn check_seams(&self, config: &InspectorConfig) -> Result<()> {
        if config.http && self.http.is_none() {
            return Err(Error::configuration(
                "HTTP interception requested but the host has no request primitive",
            ));
        }
        if config.websocket && self.websocket.is_none() {
            return Err(Error::configuration(
                "WebSocket interception requested but the host has no socket bridge module",
            ));
        }
        if config.sse && self.sse.is_none() {
            return Err(Error::configuration(
                "SSE interception requested but the host has no event source class",
            ));
        }
        Ok(())
    }

    /// Restore every host primitive and drop all tracked state. Idempotent.
    pub fn disable(&self) {
        let Some(session) = self.session.write().take() else {
            return;
        };

        // SSE rides on HTTP, so it goes first
        if let Some(sse) = &self.sse {
            sse.disable();
        }
        if let Some(websocket) = &self.websocket {
            websocket.disable();
        }
        if let Some(http) = &self.http {
            http.disable();
        }
        session.normalizer.clear();
        tracing::info!("Network inspection disabled");
    }

    /// Check if inspection is armed
    pub fn is_enabled(&self) -> bool {
        self.session.read().is_some()
    }

    /// Replace the configuration
    ///
    /// The new configuration is validated first. If inspection is enabled it
    /// is re-armed under the new configuration.
    pub fn configure(&self, config: InspectorConfig) -> Result<()> {
        config.validate()?;
        let was_enabled = self.is_enabled();
        if was_enabled {
            self.disable();
        }
        *self.config.write() = config;
        if was_enabled {
            self.enable()?;
        }
        Ok(())
    }

    /// Drop all tracked records without disarming
    pub fn clear(&self) {
        if let Some(session) = self.session.read().as_ref() {
            session.normalizer.clear();
        }
    }

    fn normalizer(&self) -> Option<Arc<Normalizer>> {
        self.session
            .read()
            .as_ref()
            .map(|session| session.normalizer.clone())
    }

    fn resolver(&self) -> Option<BodyResolver> {
        self.session
            .read()
            .as_ref()
            .map(|session| session.resolver.clone())
    }

    /// Snapshot of a tracked request
    pub fn request(&self, request_id: &str) -> Option<RequestRecord> {
        self.normalizer()?.request(request_id)
    }

    /// Snapshot of a tracked WebSocket connection
    pub fn connection(&self, socket_id: SocketId) -> Option<ConnectionRecord> {
        self.normalizer()?.connection(socket_id)
    }

    /// Logged messages of a WebSocket, oldest first
    pub fn websocket_messages(&self, socket_id: SocketId) -> Option<Vec<SocketMessage>> {
        self.normalizer()?.websocket_messages(socket_id)
    }

    /// Logged events of an SSE connection, oldest first
    pub fn sse_messages(&self, request_id: &str) -> Option<Vec<SseMessage>> {
        self.normalizer()?.sse_messages(request_id)
    }

    /// Read back the body of a tracked request
    pub async fn get_response_body(&self, request_id: &str) -> Result<ResolvedBody> {
        match self.resolver() {
            Some(resolver) => resolver.get_response_body(request_id).await,
            None => Err(Error::body_unavailable(request_id, "inspection is disabled")),
        }
    }

    /// Resolve a body and send it as `response-body`
    pub async fn send_response_body(&self, request_id: &str) {
        let body = match self.resolver() {
            Some(resolver) => resolver.resolve(request_id).await,
            None => unavailable_body(request_id),
        };
        self.send_body(body);
    }

    fn send_body(&self, body: ResponseBody) {
        BridgeSink::new(self.bridge.clone()).emit(NetworkEvent::ResponseBody(body));
    }

    /// Answer `get-response-body`
    ///
    /// Inside a tokio runtime the read is spawned. Without one it runs on
    /// the calling thread. Either way a panicking host read still gets a
    /// `null` reply.
    fn reply_with_body(self: &Arc<Self>, request_id: RequestId) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inspector = self.clone();
                let id = request_id.clone();
                let read = runtime.spawn(async move { inspector.send_response_body(&id).await });

                let inspector = self.clone();
                runtime.spawn(async move {
                    if let Err(e) = read.await {
                        tracing::warn!(%request_id, error = %e, "Response body read failed");
                        inspector.send_body(unavailable_body(&request_id));
                    }
                });
            }
            Err(_) => {
                let read = catch_unwind(AssertUnwindSafe(|| {
                    futures::executor::block_on(self.send_response_body(&request_id))
                }));
                if read.is_err() {
                    tracing::warn!(%request_id, "Response body read panicked outside a runtime");
                    self.send_body(unavailable_body(&request_id));
                }
            }
        }
    }

    fn handle_message(self: &Arc<Self>, event: &str, payload: &Value) {
        match ControlMessage::parse(event, payload) {
            Ok(message) => self.handle_control(message),
            Err(e) => tracing::warn!(event, error = %e, "Ignoring malformed control message"),
        }
    }

    /// Act on a control message from the inspector
    pub fn handle_control(self: &Arc<Self>, message: ControlMessage) {
        tracing::debug!(event = message.event(), "Control message");
        match message {
            ControlMessage::NetworkEnable => {
                if let Err(e) = self.enable() {
                    tracing::warn!(error = %e, "network-enable rejected");
                }
            }
            ControlMessage::NetworkDisable => self.disable(),
            ControlMessage::GetResponseBody { request_id } => self.reply_with_body(request_id),
        }
    }
}

fn unavailable_body(request_id: &str) -> ResponseBody {
    ResponseBody {
        request_id: request_id.to_string(),
        body: None,
        base64_encoded: false,
    }
}

impl Drop for NetworkInspector {
    fn drop(&mut self) {
        self.detach();
        self.disable();
    }
}
