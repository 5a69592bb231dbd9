// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Per-transport records and their lifecycle state machines
//!
//! Every status type exposes `transition`, which applies a move only when it
//! is legal. Terminal states accept nothing.

use serde::{Deserialize, Serialize};

use super::body::{PostData, ResolvedBody};
use super::headers::Headers;
use super::initiator::Initiator;
use crate::registry::{Merge, RingBuffer};

/// Logical id of an HTTP request (shared with SSE connections)
pub type RequestId = String;

/// Host-assigned WebSocket id
pub type SocketId = i64;

/// HTTP request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Loading,
    Finished,
    Failed,
}

impl RequestStatus {
    /// Finished or failed
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Finished | RequestStatus::Failed)
    }

    fn allows(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Loading) | (Pending, Failed) | (Loading, Finished) | (Loading, Failed)
        )
    }

    /// Apply `next` if legal
    pub fn transition(&mut self, next: RequestStatus) -> bool {
        if self.allows(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Response metadata captured when headers arrive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

/// Where a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    XHR,
    EventSource,
}

/// Tracked HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub id: RequestId,
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub post_data: Option<PostData>,
    pub status: RequestStatus,
    pub resource_type: ResourceType,
    pub started_at: u64,
    pub headers_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub response: Option<ResponseMeta>,
    pub response_body: Option<ResolvedBody>,
    pub initiator: Initiator,
    pub canceled: bool,
}

impl RequestRecord {
    /// New pending record
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, url: impl Into<String>, started_at: u64) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            post_data: None,
            status: RequestStatus::Pending,
            resource_type: ResourceType::XHR,
            started_at,
            headers_at: None,
            ended_at: None,
            response: None,
            response_body: None,
            initiator: Initiator::other(),
            canceled: false,
        }
    }

    /// Wall time from send to terminal signal
    pub fn duration(&self) -> Option<u64> {
        self.ended_at.map(|end| end.saturating_sub(self.started_at))
    }

    /// Time from send to headers
    pub fn ttfb(&self) -> Option<u64> {
        self.headers_at.map(|at| at.saturating_sub(self.started_at))
    }
}

/// Partial update for a [`RequestRecord`]
#[derive(Debug, Clone, Default)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub resource_type: Option<ResourceType>,
    pub headers_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub response: Option<ResponseMeta>,
    pub response_body: Option<ResolvedBody>,
    pub canceled: Option<bool>,
}

impl Merge for RequestRecord {
    type Patch = RequestPatch;

    fn merge(&mut self, patch: RequestPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(resource_type) = patch.resource_type {
            self.resource_type = resource_type;
        }
        if let Some(at) = patch.headers_at {
            self.headers_at = Some(at);
        }
        if let Some(at) = patch.ended_at {
            self.ended_at = Some(at);
        }
        if let Some(response) = patch.response {
            self.response = Some(response);
        }
        if let Some(body) = patch.response_body {
            self.response_body = Some(body);
        }
        if let Some(canceled) = patch.canceled {
            self.canceled = canceled;
        }
    }
}

/// WebSocket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketStatus {
    Connecting,
    Open,
    Closing,
    Closed,
    Error,
}

impl SocketStatus {
    /// Closed or errored
    pub fn is_terminal(self) -> bool {
        matches!(self, SocketStatus::Closed | SocketStatus::Error)
    }

    fn allows(self, next: SocketStatus) -> bool {
        use SocketStatus::*;
        match self {
            Connecting => matches!(next, Open | Closing | Closed | Error),
            Open => matches!(next, Closing | Closed | Error),
            Closing => matches!(next, Closed | Error),
            Closed | Error => false,
        }
    }

    /// Apply `next` if legal
    pub fn transition(&mut self, next: SocketStatus) -> bool {
        if self.allows(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Message direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// Frame payload type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Binary,
}

/// Logged WebSocket message. Binary payloads are base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketMessage {
    pub direction: Direction,
    pub payload: String,
    pub message_type: MessageType,
    pub timestamp: u64,
}

/// Tracked WebSocket connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub socket_id: SocketId,
    pub url: String,
    pub protocols: Vec<String>,
    pub protocol: Option<String>,
    pub status: SocketStatus,
    pub connected_at: u64,
    pub opened_at: Option<u64>,
    pub closed_at: Option<u64>,
    pub close_code: Option<u16>,
    pub close_reason: Option<String>,
    pub messages: RingBuffer<SocketMessage>,
}

impl ConnectionRecord {
    pub fn new(
        socket_id: SocketId,
        url: impl Into<String>,
        protocols: Vec<String>,
        connected_at: u64,
        capacity: usize,
    ) -> Self {
        Self {
            socket_id,
            url: url.into(),
            protocols,
            protocol: None,
            status: SocketStatus::Connecting,
            connected_at,
            opened_at: None,
            closed_at: None,
            close_code: None,
            close_reason: None,
            messages: RingBuffer::new(capacity),
        }
    }

    /// Close time minus open time
    pub fn duration(&self) -> Option<u64> {
        match (self.opened_at, self.closed_at) {
            (Some(open), Some(close)) => Some(close.saturating_sub(open)),
            _ => None,
        }
    }
}

/// Event source lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SseStatus {
    Connecting,
    Open,
    Closed,
    Error,
}

impl SseStatus {
    /// Closed or errored. A reconnecting source opens a new request and record.
    pub fn is_terminal(self) -> bool {
        matches!(self, SseStatus::Closed | SseStatus::Error)
    }

    fn allows(self, next: SseStatus) -> bool {
        use SseStatus::*;
        match self {
            Connecting => matches!(next, Open | Closed | Error),
            Open => matches!(next, Closed | Error),
            Closed | Error => false,
        }
    }

    /// Apply `next` if legal
    pub fn transition(&mut self, next: SseStatus) -> bool {
        if self.allows(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Logged server-sent event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseMessage {
    pub event_type: String,
    pub payload: String,
    pub last_event_id: Option<String>,
    pub timestamp: u64,
}

/// Tracked SSE connection
#[derive(Debug, Clone, PartialEq)]
pub struct SseConnectionRecord {
    pub request_id: RequestId,
    pub url: String,
    pub status: SseStatus,
    pub connected_at: u64,
    pub opened_at: Option<u64>,
    pub closed_at: Option<u64>,
    pub messages: RingBuffer<SseMessage>,
}

impl SseConnectionRecord {
    pub fn new(
        request_id: impl Into<RequestId>,
        url: impl Into<String>,
        connected_at: u64,
        capacity: usize,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            status: SseStatus::Connecting,
            connected_at,
            opened_at: None,
            closed_at: None,
            messages: RingBuffer::new(capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_transitions() {
        let mut status = RequestStatus::Pending;

        assert!(!status.transition(RequestStatus::Finished));
        assert!(status.transition(RequestStatus::Loading));
        assert!(status.transition(RequestStatus::Finished));
        assert!(status.is_terminal());
        assert!(!status.transition(RequestStatus::Failed));
        assert_eq!(status, RequestStatus::Finished);
    }

    #[test]
    fn test_request_fails_from_pending() {
        let mut status = RequestStatus::Pending;
        assert!(status.transition(RequestStatus::Failed));
        assert!(!status.transition(RequestStatus::Loading));
    }

    #[test]
    fn test_socket_terminal_locking() {
        let mut status = SocketStatus::Connecting;

        assert!(status.transition(SocketStatus::Open));
        assert!(!status.transition(SocketStatus::Connecting));
        assert!(status.transition(SocketStatus::Closing));
        assert!(!status.transition(SocketStatus::Open));
        assert!(status.transition(SocketStatus::Closed));
        assert!(!status.transition(SocketStatus::Error));
    }

    #[test]
    fn test_sse_terminal_locking() {
        let mut status = SseStatus::Connecting;
        assert!(status.transition(SseStatus::Open));
        assert!(status.transition(SseStatus::Error));
        assert!(!status.transition(SseStatus::Open));
        assert!(!status.transition(SseStatus::Closed));
    }

    #[test]
    fn test_request_patch_is_last_write_wins() {
        let mut record = RequestRecord::new("req_1", "GET", "https://example.com", 100);
        record.merge(RequestPatch {
            ended_at: Some(150),
            canceled: Some(true),
            ..Default::default()
        });
        record.merge(RequestPatch {
            canceled: Some(false),
            ..Default::default()
        });

        assert_eq!(record.duration(), Some(50));
        assert!(!record.canceled);
        assert_eq!(record.status, RequestStatus::Pending);
    }

    #[test]
    fn test_connection_duration() {
        let mut record = ConnectionRecord::new(1, "wss://example.com", vec![], 0, 32);
        assert_eq!(record.duration(), None);

        record.opened_at = Some(1_000);
        record.closed_at = Some(4_500);
        assert_eq!(record.duration(), Some(3_500));
    }
}
