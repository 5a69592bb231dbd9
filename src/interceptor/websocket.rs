// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! WebSocket interceptor
//!
//! Wraps the socket bridge methods and listens to its native events. Sockets
//! are addressed by the integer id the host assigns at `connect`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::shim::{CompatShim, SocketCall, SocketNotice};
use super::{guard, Arming, Interceptor, SignalSink};
use crate::config::UrlFilter;
use crate::error::{Result, Transport};
use crate::host::{SocketBridgeModule, SocketHooks, SocketMethod};
use crate::network::SocketId;

/// Raw WebSocket signal
#[derive(Debug, Clone, PartialEq)]
pub enum SocketSignal {
    /// Application called a bridge method
    Call(SocketCall),
    /// Host emitted a socket event
    Notice(SocketNotice),
}

impl SocketSignal {
    pub fn socket_id(&self) -> SocketId {
        match self {
            SocketSignal::Call(SocketCall::Connect { socket_id, .. })
            | SocketSignal::Call(SocketCall::Send { socket_id, .. })
            | SocketSignal::Call(SocketCall::Close { socket_id, .. })
            | SocketSignal::Notice(SocketNotice::Opened { socket_id, .. })
            | SocketSignal::Notice(SocketNotice::Message { socket_id, .. })
            | SocketSignal::Notice(SocketNotice::Closed { socket_id, .. })
            | SocketSignal::Notice(SocketNotice::Failed { socket_id, .. }) => *socket_id,
        }
    }
}

/// Interceptor for the host socket bridge module
pub struct WebSocketInterceptor {
    module: Arc<dyn SocketBridgeModule>,
    arming: Arc<Arming<SocketSignal>>,
    shim: CompatShim,
    ignored: Arc<Mutex<HashSet<SocketId>>>,
}

impl WebSocketInterceptor {
    pub fn new(module: Arc<dyn SocketBridgeModule>) -> Self {
        Self {
            module,
            arming: Arc::new(Arming::new()),
            shim: CompatShim::new(),
            ignored: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Use a fixed argument layout instead of detecting it per call
    pub fn with_shim(mut self, shim: CompatShim) -> Self {
        self.shim = shim;
        self
    }

    pub fn set_sink(&self, sink: Arc<dyn SignalSink<SocketSignal>>) {
        self.arming.set_sink(sink);
    }

    /// Connect URLs whose sockets are not tracked
    pub fn set_filter(&self, filter: UrlFilter) {
        self.arming.set_filter(filter);
    }
}

impl Interceptor for WebSocketInterceptor {
    fn transport(&self) -> Transport {
        Transport::WebSocket
    }

    fn enable(&self) -> Result<()> {
        if let Some(session) = self.arming.arm() {
            self.ignored.lock().clear();
            self.module.patch(Arc::new(SocketHookSet {
                session,
                arming: self.arming.clone(),
                shim: self.shim,
                ignored: self.ignored.clone(),
            }));
            tracing::info!(session, "WebSocket interception enabled");
        }
        Ok(())
    }

    fn disable(&self) {
        if self.arming.disarm() {
            self.module.restore();
            self.ignored.lock().clear();
            tracing::info!("WebSocket interception disabled");
        }
    }

    fn is_enabled(&self) -> bool {
        self.arming.is_enabled()
    }
}

struct SocketHookSet {
    session: u64,
    arming: Arc<Arming<SocketSignal>>,
    shim: CompatShim,
    ignored: Arc<Mutex<HashSet<SocketId>>>,
}

impl SocketHookSet {
    fn deliver(&self, signal: SocketSignal) -> Result<()> {
        let socket_id = signal.socket_id();
        if self.ignored.lock().contains(&socket_id) {
            tracing::trace!(socket_id, "Ignored socket");
            return Ok(());
        }
        match self.arming.sink_for(self.session) {
            Some(sink) => sink.deliver(signal),
            None => Ok(()),
        }
    }

    fn call(&self, method: SocketMethod, args: &[Value]) -> Result<()> {
        let call = self.shim.call(method, args)?;
        if let SocketCall::Connect { socket_id, url, .. } = &call {
            let mut ignored = self.ignored.lock();
            if self.arming.is_ignored(url) {
                ignored.insert(*socket_id);
                return Ok(());
            }
            // Host ids may be reused after a disconnect
            ignored.remove(socket_id);
        }
        self.deliver(SocketSignal::Call(call))
    }

    fn event(&self, name: &str, payload: &Value) -> Result<()> {
        match self.shim.notice(name, payload)? {
            Some(notice) => self.deliver(SocketSignal::Notice(notice)),
            None => Ok(()),
        }
    }
}

impl SocketHooks for SocketHookSet {
    fn on_call(&self, method: SocketMethod, args: &[Value]) {
        guard(Transport::WebSocket, "call", || self.call(method, args));
    }

    fn on_event(&self, name: &str, payload: &Value) {
        guard(Transport::WebSocket, "event", || self.event(name, payload));
    }
}
