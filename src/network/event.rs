// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Normalized network event taxonomy
//!
//! One discriminated type for all transports. Serialized with a `kind` tag
//! and camelCase fields, a compatible subset of the CDP Network domain shape.

use serde::{Deserialize, Serialize};

use super::body::PostData;
use super::headers::Headers;
use super::initiator::Initiator;
use super::record::{MessageType, RequestId, ResourceType, ResponseMeta, SocketId};
use crate::error::Result;

/// Normalized event sent to the inspector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NetworkEvent {
    RequestSent(RequestSent),
    ResponseReceived(ResponseReceived),
    RequestProgress(RequestProgress),
    RequestCompleted(RequestCompleted),
    RequestFailed(RequestFailed),
    ResponseBody(ResponseBody),
    WebsocketConnect(WebsocketConnect),
    WebsocketOpen(WebsocketOpen),
    WebsocketClose(WebsocketClose),
    WebsocketMessageSent(WebsocketMessage),
    WebsocketMessageReceived(WebsocketMessage),
    WebsocketError(WebsocketError),
    SseOpen(SseOpen),
    SseMessage(SseMessageEvent),
    SseError(SseError),
    SseClose(SseClose),
}

impl NetworkEvent {
    /// Bridge event name
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkEvent::RequestSent(_) => "request-sent",
            NetworkEvent::ResponseReceived(_) => "response-received",
            NetworkEvent::RequestProgress(_) => "request-progress",
            NetworkEvent::RequestCompleted(_) => "request-completed",
            NetworkEvent::RequestFailed(_) => "request-failed",
            NetworkEvent::ResponseBody(_) => "response-body",
            NetworkEvent::WebsocketConnect(_) => "websocket-connect",
            NetworkEvent::WebsocketOpen(_) => "websocket-open",
            NetworkEvent::WebsocketClose(_) => "websocket-close",
            NetworkEvent::WebsocketMessageSent(_) => "websocket-message-sent",
            NetworkEvent::WebsocketMessageReceived(_) => "websocket-message-received",
            NetworkEvent::WebsocketError(_) => "websocket-error",
            NetworkEvent::SseOpen(_) => "sse-open",
            NetworkEvent::SseMessage(_) => "sse-message",
            NetworkEvent::SseError(_) => "sse-error",
            NetworkEvent::SseClose(_) => "sse-close",
        }
    }

    /// Request id for HTTP and SSE events
    pub fn request_id(&self) -> Option<&str> {
        match self {
            NetworkEvent::RequestSent(e) => Some(&e.request_id),
            NetworkEvent::ResponseReceived(e) => Some(&e.request_id),
            NetworkEvent::RequestProgress(e) => Some(&e.request_id),
            NetworkEvent::RequestCompleted(e) => Some(&e.request_id),
            NetworkEvent::RequestFailed(e) => Some(&e.request_id),
            NetworkEvent::ResponseBody(e) => Some(&e.request_id),
            NetworkEvent::SseOpen(e) => Some(&e.request_id),
            NetworkEvent::SseMessage(e) => Some(&e.request_id),
            NetworkEvent::SseError(e) => Some(&e.request_id),
            NetworkEvent::SseClose(e) => Some(&e.request_id),
            _ => None,
        }
    }

    /// Socket id for WebSocket events
    pub fn socket_id(&self) -> Option<SocketId> {
        match self {
            NetworkEvent::WebsocketConnect(e) => Some(e.socket_id),
            NetworkEvent::WebsocketOpen(e) => Some(e.socket_id),
            NetworkEvent::WebsocketClose(e) => Some(e.socket_id),
            NetworkEvent::WebsocketMessageSent(e) | NetworkEvent::WebsocketMessageReceived(e) => {
                Some(e.socket_id)
            }
            NetworkEvent::WebsocketError(e) => Some(e.socket_id),
            _ => None,
        }
    }

    /// JSON payload for the bridge (includes the `kind` tag)
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Request as sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub post_data: Option<PostData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSent {
    pub request_id: RequestId,
    pub request: RequestPayload,
    pub timestamp: u64,
    pub initiator: Initiator,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// Response metadata as reported to the inspector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub response_time: u64,
}

impl ResponsePayload {
    pub fn from_meta(meta: &ResponseMeta, response_time: u64) -> Self {
        Self {
            url: meta.url.clone(),
            status: meta.status,
            status_text: meta.status_text.clone(),
            headers: meta.headers.clone(),
            content_type: meta.mime_type.clone(),
            size: meta.size,
            response_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub request_id: RequestId,
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub response: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestProgress {
    pub request_id: RequestId,
    pub timestamp: u64,
    pub loaded: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCompleted {
    pub request_id: RequestId,
    pub timestamp: u64,
    pub duration: u64,
    pub size: u64,
    pub ttfb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailed {
    pub request_id: RequestId,
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub error: String,
    pub canceled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub request_id: RequestId,
    pub body: Option<String>,
    pub base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketConnect {
    pub socket_id: SocketId,
    pub url: String,
    pub protocols: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketOpen {
    pub socket_id: SocketId,
    pub url: String,
    pub protocol: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketClose {
    pub socket_id: SocketId,
    pub url: String,
    pub code: Option<u16>,
    pub reason: Option<String>,
    pub duration: Option<u64>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketMessage {
    pub socket_id: SocketId,
    pub data: String,
    pub message_type: MessageType,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketError {
    pub socket_id: SocketId,
    pub url: String,
    pub error: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseOpen {
    pub request_id: RequestId,
    pub url: String,
    pub timestamp: u64,
    pub response: Option<ResponsePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseMessageEvent {
    pub request_id: RequestId,
    pub event_type: String,
    pub data: String,
    pub last_event_id: Option<String>,
    pub timestamp: u64,
}

/// SSE failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SseErrorKind {
    Error,
    Timeout,
    Exception,
}

impl SseErrorKind {
    /// Stable message per kind
    pub fn message(self) -> &'static str {
        match self {
            SseErrorKind::Error => "Event stream connection error",
            SseErrorKind::Timeout => "Event stream connection timed out",
            SseErrorKind::Exception => "Event stream raised an exception",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseError {
    pub request_id: RequestId,
    pub error_type: SseErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseClose {
    pub request_id: RequestId,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_serde_tag() {
        let event = NetworkEvent::WebsocketMessageSent(WebsocketMessage {
            socket_id: 3,
            data: "hi".into(),
            message_type: MessageType::Text,
            timestamp: 1,
        });

        let payload = event.to_payload().unwrap();
        assert_eq!(payload["kind"], event.kind());
        assert_eq!(payload["socketId"], 3);
        assert_eq!(payload["messageType"], "text");
        assert_eq!(event.socket_id(), Some(3));
        assert_eq!(event.request_id(), None);
    }

    #[test]
    fn test_request_failed_shape() {
        let event = NetworkEvent::RequestFailed(RequestFailed {
            request_id: "req_1".into(),
            timestamp: 10,
            resource_type: ResourceType::XHR,
            error: "Request aborted".into(),
            canceled: true,
        });

        let payload = event.to_payload().unwrap();
        assert_eq!(payload["kind"], "request-failed");
        assert_eq!(payload["requestId"], "req_1");
        assert_eq!(payload["type"], "XHR");
        assert_eq!(payload["canceled"], true);
    }

    #[test]
    fn test_response_body_null() {
        let event = NetworkEvent::ResponseBody(ResponseBody {
            request_id: "req_9".into(),
            body: None,
            base64_encoded: false,
        });

        let payload = event.to_payload().unwrap();
        assert!(payload["body"].is_null());
        assert_eq!(payload["base64Encoded"], false);
    }

    #[test]
    fn test_sse_error_messages_are_distinct() {
        let kinds = [SseErrorKind::Error, SseErrorKind::Timeout, SseErrorKind::Exception];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.message(), b.message());
            }
        }
    }
}
