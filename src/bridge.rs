// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Bridge to the remote inspector
//!
//! The bridge is a named, bidirectional message channel. The real transport
//! belongs to the embedder; this module defines the client contract, the
//! control messages the inspector sends, and two in-process clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::network::{NetworkEvent, RequestId};
use crate::normalizer::EventSink;

/// Callback for an incoming bridge message
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Client side of the inspector bridge
pub trait BridgeClient: Send + Sync {
    /// Send a named message. Delivery is assumed reliable and in order.
    fn send(&self, event: &str, payload: Value) -> Result<()>;

    /// Register a handler for a named message
    fn on_message(&self, event: &str, handler: MessageHandler) -> Subscription;
}

/// Handle returned by [`BridgeClient::on_message`]
///
/// Dropping it keeps the handler registered; call [`Subscription::remove`].
#[must_use = "the handler stays registered until `remove` is called"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Subscription with nothing to remove
    pub fn noop() -> Self {
        Self { remove: None }
    }

    /// Unregister the handler
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

/// Named handler table shared by the in-process clients
#[derive(Default)]
struct HandlerTable {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<String, Vec<(u64, MessageHandler)>>>,
}

impl HandlerTable {
    fn subscribe(self: &Arc<Self>, event: &str, handler: MessageHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));

        let table: Weak<Self> = Arc::downgrade(self);
        let event = event.to_string();
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                let mut handlers = table.handlers.write();
                if let Some(list) = handlers.get_mut(&event) {
                    list.retain(|(handler_id, _)| *handler_id != id);
                    if list.is_empty() {
                        handlers.remove(&event);
                    }
                }
            }
        })
    }

    /// Call every handler for `event`. Handlers run without the table locked.
    fn dispatch(&self, event: &str, payload: Value) -> usize {
        let handlers: Vec<MessageHandler> = self
            .handlers
            .read()
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }

    fn count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map(Vec::len).unwrap_or(0)
    }
}

/// A message on the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub event: String,
    pub payload: Value,
}

/// In-memory bridge that records outgoing messages
#[derive(Default)]
pub struct MemoryBridge {
    sent: Mutex<Vec<BridgeMessage>>,
    handlers: Arc<HandlerTable>,
}

impl MemoryBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver a message from the inspector side. Returns the number of handlers run.
    pub fn deliver(&self, event: &str, payload: Value) -> usize {
        self.handlers.dispatch(event, payload)
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<BridgeMessage> {
        self.sent.lock().clone()
    }

    /// Take and clear the sent messages
    pub fn take_sent(&self) -> Vec<BridgeMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Names of sent messages, in order
    pub fn sent_events(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.event.clone()).collect()
    }

    /// Handlers registered for `event`
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.count(event)
    }
}

impl BridgeClient for MemoryBridge {
    fn send(&self, event: &str, payload: Value) -> Result<()> {
        self.sent.lock().push(BridgeMessage {
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    fn on_message(&self, event: &str, handler: MessageHandler) -> Subscription {
        self.handlers.subscribe(event, handler)
    }
}

/// Bridge that forwards outgoing messages into a tokio channel
///
/// The receiving half is handed to whatever task owns the real transport.
pub struct ChannelBridge {
    outgoing: mpsc::UnboundedSender<BridgeMessage>,
    handlers: Arc<HandlerTable>,
}

impl ChannelBridge {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (outgoing, incoming) = mpsc::unbounded_channel();
        let bridge = Arc::new(Self {
            outgoing,
            handlers: Arc::new(HandlerTable::default()),
        });
        (bridge, incoming)
    }

    /// Deliver a message received from the inspector
    pub fn deliver(&self, event: &str, payload: Value) -> usize {
        self.handlers.dispatch(event, payload)
    }
}

impl BridgeClient for ChannelBridge {
    fn send(&self, event: &str, payload: Value) -> Result<()> {
        self.outgoing
            .send(BridgeMessage {
                event: event.to_string(),
                payload,
            })
            .map_err(|_| Error::bridge("inspector channel closed"))
    }

    fn on_message(&self, event: &str, handler: MessageHandler) -> Subscription {
        self.handlers.subscribe(event, handler)
    }
}

/// Control messages sent by the inspector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    NetworkEnable,
    NetworkDisable,
    GetResponseBody { request_id: RequestId },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetResponseBodyParams {
    request_id: RequestId,
}

impl ControlMessage {
    /// Bridge names of all control messages
    pub const EVENTS: [&'static str; 3] = ["network-enable", "network-disable", "get-response-body"];

    /// Parse a named control message
    pub fn parse(event: &str, payload: &Value) -> Result<Self> {
        match event {
            "network-enable" => Ok(ControlMessage::NetworkEnable),
            "network-disable" => Ok(ControlMessage::NetworkDisable),
            "get-response-body" => {
                let params: GetResponseBodyParams = serde_json::from_value(payload.clone())?;
                Ok(ControlMessage::GetResponseBody {
                    request_id: params.request_id,
                })
            }
            other => Err(Error::bridge(format!("unknown control message `{}`", other))),
        }
    }

    pub fn event(&self) -> &'static str {
        match self {
            ControlMessage::NetworkEnable => "network-enable",
            ControlMessage::NetworkDisable => "network-disable",
            ControlMessage::GetResponseBody { .. } => "get-response-body",
        }
    }
}

/// Event sink that forwards normalized events over a bridge
pub struct BridgeSink {
    client: Arc<dyn BridgeClient>,
}

impl BridgeSink {
    pub fn new(client: Arc<dyn BridgeClient>) -> Self {
        Self { client }
    }
}

impl EventSink for BridgeSink {
    fn emit(&self, event: NetworkEvent) {
        let kind = event.kind();
        let result = event
            .to_payload()
            .and_then(|payload| self.client.send(kind, payload));
        if let Err(e) = result {
            tracing::warn!(kind, error = %e, "Failed to send event to inspector");
        }
    }
}
