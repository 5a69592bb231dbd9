// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # netscope - Network Activity Inspection Core
//!
//! Intercepts the three transport primitives of a host runtime (request/response
//! HTTP, socket-style WebSocket and event-stream SSE), gives every request or
//! connection a stable logical id, drives it through a lifecycle state machine
//! and streams one normalized, CDP-shaped event type to a remote inspector.
//!
//! ## Features
//!
//! - Patch/restore interception: disabling restores the host primitive exactly
//! - Causal per-id ordering: sent, received, then completed or failed
//! - TTL registry with lazy eviction; bounded message logs for sockets and streams
//! - Response bodies resolved on demand, never captured eagerly
//! - Argument-order shim for socket bridge version skew
//! - Faults inside hooks never reach the host
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netscope::{
//!     HostSeams, InspectorConfig, MemoryBridge, MemoryHttp, NetworkInspector, SystemClock,
//! };
//!
//! let http = MemoryHttp::new();
//! let bridge = MemoryBridge::new();
//! let inspector = NetworkInspector::new(
//!     InspectorConfig::default().websocket(false),
//!     HostSeams::new().http(http.clone()),
//!     bridge.clone(),
//!     Arc::new(SystemClock),
//! );
//!
//! inspector.attach();
//! inspector.enable()?;
//!
//! let xhr = http.create();
//! xhr.open("GET", "https://example.com/api");
//! xhr.send(None);
//!
//! for message in bridge.sent() {
//!     println!("{} {}", message.event, message.payload);
//! }
//! # Ok::<(), netscope::Error>(())
//! ```

pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod inspector;
pub mod interceptor;
pub mod network;
pub mod normalizer;
pub mod registry;
pub mod resolver;

// Re-exports for convenience

// Inspector
pub use inspector::NetworkInspector;

// Configuration
pub use config::{
    InspectorConfig, UrlFilter, DEFAULT_MESSAGE_LOG_CAPACITY, DEFAULT_TTL, DEV_SERVER_PATTERN,
};

// Errors
pub use error::{Error, Result, Transport};

// Time
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};

// Bridge
pub use bridge::{
    BridgeClient, BridgeMessage, BridgeSink, ChannelBridge, ControlMessage, MemoryBridge,
    MessageHandler, Subscription,
};

// Host seams and the reference host
pub use host::{
    EventSourceClass, HostSeams, HttpPrimitive, MemoryEventSource, MemoryEventSources,
    MemoryHttp, MemorySocketModule, MemoryXhr, PatchSlot, ReadyState, SocketBridgeModule,
    XhrHandle,
};

// Interceptors
pub use interceptor::{
    CompatShim, HttpInterceptor, Interceptor, SignalSink, SseInterceptor, WebSocketInterceptor,
};

// Pipeline
pub use normalizer::{EventSink, Normalizer};
pub use registry::{Registry, RingBuffer};
pub use resolver::BodyResolver;

// Data model
pub use network::{
    BodyContent, ConnectionRecord, Headers, NetworkEvent, PostData, RequestBody, RequestId,
    RequestRecord, ResolvedBody, SocketId, SocketMessage, SseMessage,
};
