// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host platform seams
//!
//! The host owns three patchable primitives: a request object (XHR-like), a
//! socket bridge module addressed by integer ids, and an event-source class.
//! netscope never drives them; it only installs hooks at their override
//! points. Each primitive stores the installed hook in a [`PatchSlot`] and
//! invokes it around its native behavior.

mod memory;

pub use memory::{MemoryEventSource, MemoryEventSources, MemoryHttp, MemorySocketModule, MemoryXhr};

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::network::{BodyContent, Headers, RequestBody, RequestId, SseErrorKind};

/// Override point of a host primitive
///
/// Holds at most one hook. Restoring empties the slot, after which the
/// primitive behaves exactly as unpatched.
pub struct PatchSlot<H: ?Sized> {
    hook: RwLock<Option<Arc<H>>>,
}

impl<H: ?Sized> PatchSlot<H> {
    pub fn new() -> Self {
        Self {
            hook: RwLock::new(None),
        }
    }

    /// Install a hook, replacing any previous one
    pub fn install(&self, hook: Arc<H>) {
        *self.hook.write() = Some(hook);
    }

    /// Remove the hook
    pub fn restore(&self) {
        *self.hook.write() = None;
    }

    /// Currently installed hook. The lock is released before the caller runs it.
    pub fn current(&self) -> Option<Arc<H>> {
        self.hook.read().clone()
    }

    pub fn is_installed(&self) -> bool {
        self.hook.read().is_some()
    }
}

impl<H: ?Sized> Default for PatchSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// XHR ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

/// Native request object
///
/// The host has no id for these objects, so the interceptor attaches one
/// out-of-band through [`XhrHandle::set_correlation_id`].
#[async_trait]
pub trait XhrHandle: Send + Sync {
    /// Attached correlation id
    fn correlation_id(&self) -> Option<RequestId>;

    /// Attach or clear the correlation id
    fn set_correlation_id(&self, id: Option<RequestId>);

    fn method(&self) -> String;

    fn url(&self) -> String;

    fn request_headers(&self) -> Headers;

    /// HTTP status, 0 until headers arrive or on network failure
    fn status(&self) -> u16;

    fn status_text(&self) -> String;

    /// Final URL after redirects
    fn response_url(&self) -> Option<String> {
        None
    }

    fn response_headers(&self) -> Headers;

    /// Body size in bytes once known
    fn response_size(&self) -> Option<u64>;

    /// Stack captured when `send` was called
    fn initiator_stack(&self) -> Option<String> {
        None
    }

    /// Re-read the response body. `None` if the handle cannot be read again.
    async fn read_response(&self) -> Option<BodyContent>;
}

/// Shared request handle
pub type XhrRef = Arc<dyn XhrHandle>;

/// Hooks a patched request primitive calls
pub trait XhrHooks: Send + Sync {
    /// `open` was called (the object may be reused for a new request)
    fn on_open(&self, xhr: &XhrRef, method: &str, url: &str);

    /// `send` was called
    fn on_send(&self, xhr: &XhrRef, body: Option<&RequestBody>);

    fn on_ready_state_change(&self, xhr: &XhrRef, state: ReadyState);

    fn on_progress(&self, xhr: &XhrRef, loaded: u64, total: Option<u64>);

    fn on_load(&self, xhr: &XhrRef);

    fn on_error(&self, xhr: &XhrRef);

    fn on_abort(&self, xhr: &XhrRef);

    fn on_timeout(&self, xhr: &XhrRef);
}

/// Patchable request primitive
pub trait HttpPrimitive: Send + Sync {
    fn patch(&self, hooks: Arc<dyn XhrHooks>);

    fn restore(&self);

    fn is_patched(&self) -> bool;
}

/// Methods of the socket bridge module that can be wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketMethod {
    Connect,
    Send,
    SendBinary,
    Close,
}

/// Hooks a patched socket bridge calls
///
/// Arguments arrive exactly as the host passed them; their order differs
/// between host versions.
pub trait SocketHooks: Send + Sync {
    /// A bridge method was called
    fn on_call(&self, method: SocketMethod, args: &[Value]);

    /// The host emitted a socket event (`websocketOpen`, `websocketMessage`,
    /// `websocketClosed`, `websocketFailed`)
    fn on_event(&self, name: &str, payload: &Value);
}

/// Patchable socket bridge module
pub trait SocketBridgeModule: Send + Sync {
    fn patch(&self, hooks: Arc<dyn SocketHooks>);

    fn restore(&self);

    fn is_patched(&self) -> bool;
}

/// Native event source object
pub trait EventSourceHandle: Send + Sync {
    fn url(&self) -> String;

    /// Request handle the stream runs over
    fn transport(&self) -> Option<XhrRef>;
}

/// Shared event source handle
pub type EventSourceRef = Arc<dyn EventSourceHandle>;

/// Sub-events of an event source
#[derive(Debug, Clone, PartialEq)]
pub enum EventSourceNotice {
    Open,
    Message {
        event_type: String,
        data: String,
        last_event_id: Option<String>,
    },
    Error {
        kind: SseErrorKind,
        detail: Option<String>,
    },
    Close,
}

/// Hooks a patched event source class calls
pub trait EventSourceHooks: Send + Sync {
    /// The connection-open method ran and created its transport
    fn on_connection_open(&self, source: &EventSourceRef);

    fn on_notice(&self, source: &EventSourceRef, notice: &EventSourceNotice);
}

/// Patchable event source class
pub trait EventSourceClass: Send + Sync {
    fn patch(&self, hooks: Arc<dyn EventSourceHooks>);

    fn restore(&self);

    fn is_patched(&self) -> bool;
}

/// The host primitives available to an inspector
#[derive(Clone, Default)]
pub struct HostSeams {
    pub http: Option<Arc<dyn HttpPrimitive>>,
    pub sockets: Option<Arc<dyn SocketBridgeModule>>,
    pub event_sources: Option<Arc<dyn EventSourceClass>>,
}

impl HostSeams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http(mut self, primitive: Arc<dyn HttpPrimitive>) -> Self {
        self.http = Some(primitive);
        self
    }

    pub fn sockets(mut self, module: Arc<dyn SocketBridgeModule>) -> Self {
        self.sockets = Some(module);
        self
    }

    pub fn event_sources(mut self, class: Arc<dyn EventSourceClass>) -> Self {
        self.event_sources = Some(class);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_patch_slot_install_restore() {
        let slot: PatchSlot<dyn Greeter> = PatchSlot::new();
        assert!(slot.current().is_none());

        slot.install(Arc::new(Hello));
        assert!(slot.is_installed());
        assert_eq!(slot.current().unwrap().greet(), "hello");

        slot.restore();
        assert!(!slot.is_installed());
    }

    #[test]
    fn test_ready_state_order() {
        assert!(ReadyState::HeadersReceived < ReadyState::Done);
        assert_eq!(ReadyState::Done as u8, 4);
    }
}
