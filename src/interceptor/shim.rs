// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Socket bridge argument-order compatibility
//!
//! Host versions disagree on the argument layout of `connect` and `close`:
//!
//! | method  | legacy                     | current                             |
//! |---------|----------------------------|-------------------------------------|
//! | connect | `(url, protocols, id)`     | `(url, protocols, options, id)`     |
//! | close   | `(id)`                     | `(code, reason, id)`                |
//!
//! `send` and `sendBinary` are `(data, id)` everywhere. The shim detects the
//! layout from each call and produces one canonical form.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::host::SocketMethod;
use crate::network::{MessageType, SocketId};

/// Argument layout of a host call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentLayout {
    Legacy,
    Current,
}

/// Canonical socket bridge call
#[derive(Debug, Clone, PartialEq)]
pub enum SocketCall {
    Connect {
        socket_id: SocketId,
        url: String,
        protocols: Vec<String>,
    },
    Send {
        socket_id: SocketId,
        data: String,
        message_type: MessageType,
    },
    Close {
        socket_id: SocketId,
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// Canonical native socket event
#[derive(Debug, Clone, PartialEq)]
pub enum SocketNotice {
    Opened {
        socket_id: SocketId,
        protocol: Option<String>,
    },
    Message {
        socket_id: SocketId,
        data: String,
        message_type: MessageType,
    },
    Closed {
        socket_id: SocketId,
        code: Option<u16>,
        reason: Option<String>,
    },
    Failed {
        socket_id: SocketId,
        message: String,
    },
}

/// Version-detection adapter for the socket bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatShim {
    pinned: Option<ArgumentLayout>,
}

impl CompatShim {
    /// Detect the layout per call
    pub fn new() -> Self {
        Self::default()
    }

    /// Always assume `layout`
    pub fn pinned(layout: ArgumentLayout) -> Self {
        Self {
            pinned: Some(layout),
        }
    }

    /// Layout of a call, from the pin or the argument count
    pub fn detect(&self, method: SocketMethod, args: &[Value]) -> ArgumentLayout {
        if let Some(layout) = self.pinned {
            return layout;
        }
        match (method, args.len()) {
            (SocketMethod::Connect, 3) | (SocketMethod::Close, 1) => ArgumentLayout::Legacy,
            _ => ArgumentLayout::Current,
        }
    }

    /// Canonical form of a bridge call
    pub fn call(&self, method: SocketMethod, args: &[Value]) -> Result<SocketCall> {
        let layout = self.detect(method, args);
        match (method, layout) {
            (SocketMethod::Connect, ArgumentLayout::Legacy) => Ok(SocketCall::Connect {
                url: string_arg(args, 0, "url")?,
                protocols: protocols_arg(args.get(1)),
                socket_id: id_arg(args, 2)?,
            }),
            (SocketMethod::Connect, ArgumentLayout::Current) => Ok(SocketCall::Connect {
                url: string_arg(args, 0, "url")?,
                protocols: protocols_arg(args.get(1)),
                socket_id: id_arg(args, 3)?,
            }),
            (SocketMethod::Send, _) => Ok(SocketCall::Send {
                data: string_arg(args, 0, "data")?,
                socket_id: id_arg(args, 1)?,
                message_type: MessageType::Text,
            }),
            (SocketMethod::SendBinary, _) => Ok(SocketCall::Send {
                data: string_arg(args, 0, "data")?,
                socket_id: id_arg(args, 1)?,
                message_type: MessageType::Binary,
            }),
            (SocketMethod::Close, ArgumentLayout::Legacy) => Ok(SocketCall::Close {
                socket_id: id_arg(args, 0)?,
                code: None,
                reason: None,
            }),
            (SocketMethod::Close, ArgumentLayout::Current) => Ok(SocketCall::Close {
                code: args.first().and_then(Value::as_u64).map(|c| c as u16),
                reason: args.get(1).and_then(Value::as_str).map(String::from),
                socket_id: id_arg(args, 2)?,
            }),
        }
    }

    /// Canonical form of a native socket event. `None` for events that are
    /// not socket lifecycle events.
    pub fn notice(&self, name: &str, payload: &Value) -> Result<Option<SocketNotice>> {
        let socket_id = || {
            payload
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::other(format!("{} payload without socket id", name)))
        };
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(String::from);

        let notice = match name {
            "websocketOpen" => SocketNotice::Opened {
                socket_id: socket_id()?,
                protocol: text("protocol").filter(|p| !p.is_empty()),
            },
            "websocketMessage" => SocketNotice::Message {
                socket_id: socket_id()?,
                data: text("data").unwrap_or_default(),
                message_type: match payload.get("type").and_then(Value::as_str) {
                    Some("binary") | Some("blob") => MessageType::Binary,
                    _ => MessageType::Text,
                },
            },
            "websocketClosed" => SocketNotice::Closed {
                socket_id: socket_id()?,
                code: payload.get("code").and_then(Value::as_u64).map(|c| c as u16),
                reason: text("reason"),
            },
            "websocketFailed" => SocketNotice::Failed {
                socket_id: socket_id()?,
                message: text("message").unwrap_or_else(|| "WebSocket failed".to_string()),
            },
            _ => return Ok(None),
        };
        Ok(Some(notice))
    }
}

fn string_arg(args: &[Value], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::other(format!("missing string argument `{}` at {}", name, index)))
}

fn id_arg(args: &[Value], index: usize) -> Result<SocketId> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::other(format!("missing socket id at argument {}", index)))
}

fn protocols_arg(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_connect_layouts_agree() {
        let shim = CompatShim::new();
        let current = shim
            .call(
                SocketMethod::Connect,
                &[json!("wss://a"), json!(["chat"]), json!({}), json!(4)],
            )
            .unwrap();
        let legacy = shim
            .call(SocketMethod::Connect, &[json!("wss://a"), json!(["chat"]), json!(4)])
            .unwrap();

        assert_eq!(current, legacy);
        assert_eq!(
            current,
            SocketCall::Connect {
                socket_id: 4,
                url: "wss://a".into(),
                protocols: vec!["chat".into()],
            }
        );
    }

    #[test]
    fn test_close_layouts() {
        let shim = CompatShim::new();

        assert_eq!(
            shim.call(SocketMethod::Close, &[json!(7)]).unwrap(),
            SocketCall::Close {
                socket_id: 7,
                code: None,
                reason: None
            }
        );
        assert_eq!(
            shim.call(SocketMethod::Close, &[json!(1000), json!("bye"), json!(7)])
                .unwrap(),
            SocketCall::Close {
                socket_id: 7,
                code: Some(1000),
                reason: Some("bye".into())
            }
        );
    }

    #[test]
    fn test_pinned_layout_overrides_detection() {
        let shim = CompatShim::pinned(ArgumentLayout::Current);
        assert_eq!(
            shim.detect(SocketMethod::Close, &[json!(1)]),
            ArgumentLayout::Current
        );
        assert!(shim.call(SocketMethod::Close, &[json!(1)]).is_err());
    }

    #[test]
    fn test_send_binary() {
        let call = CompatShim::new()
            .call(SocketMethod::SendBinary, &[json!("AAE="), json!(2)])
            .unwrap();
        assert!(matches!(
            call,
            SocketCall::Send {
                socket_id: 2,
                message_type: MessageType::Binary,
                ..
            }
        ));
    }

    #[test]
    fn test_notices() {
        let shim = CompatShim::new();

        assert_eq!(
            shim.notice("websocketOpen", &json!({"id": 1, "protocol": ""}))
                .unwrap(),
            Some(SocketNotice::Opened {
                socket_id: 1,
                protocol: None
            })
        );
        assert!(shim.notice("didReceiveNetworkData", &json!({})).unwrap().is_none());
        assert!(shim.notice("websocketClosed", &json!({})).is_err());
    }
}
