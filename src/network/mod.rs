// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Network data model
//!
//! Records, their lifecycle state machines, and the normalized event
//! taxonomy emitted to the inspector.

mod body;
mod event;
mod headers;
mod initiator;
mod record;

pub use body::{
    infer_content_type, BlobInfo, BodyContent, FormPart, FormValue, PostData, PostField,
    RequestBody, ResolvedBody,
};
pub use event::{
    NetworkEvent, RequestCompleted, RequestFailed, RequestPayload, RequestProgress, RequestSent,
    ResponseBody, ResponsePayload, ResponseReceived, SseClose, SseError, SseErrorKind,
    SseMessageEvent, SseOpen, WebsocketClose, WebsocketConnect, WebsocketError, WebsocketMessage,
    WebsocketOpen,
};
pub use headers::Headers;
pub use initiator::{Initiator, InitiatorType};
pub use record::{
    ConnectionRecord, Direction, MessageType, RequestId, RequestPatch, RequestRecord,
    RequestStatus, ResourceType, ResponseMeta, SocketId, SocketMessage, SocketStatus,
    SseConnectionRecord, SseMessage, SseStatus,
};
