// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! On-demand response body resolver
//!
//! Bodies are never captured eagerly. A body is read back from the native
//! handle only when the inspector asks for it, then cached on the record.

use std::sync::Arc;

use base64::Engine;

use crate::error::{Error, Result};
use crate::network::{BodyContent, RequestPatch, ResolvedBody, ResponseBody};
use crate::normalizer::RequestRegistry;

/// Body returned for content that claims no binary type but is not valid UTF-8
pub const UNDECODABLE_BODY: &str = "[netscope] Response body could not be decoded as text";

/// How a body is encoded for the inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Text,
    Base64,
    /// Try UTF-8, fall back to the marker
    Sniff,
}

fn encoding_for(mime_type: Option<&str>) -> Encoding {
    let Some(mime) = mime_type.map(|m| m.trim().to_ascii_lowercase()) else {
        return Encoding::Sniff;
    };

    if mime.starts_with("text/")
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
        || mime.contains("json")
        || mime.contains("xml")
        || mime.contains("javascript")
        || mime == "application/x-www-form-urlencoded"
    {
        Encoding::Text
    } else if mime.starts_with("image/")
        || mime.starts_with("audio/")
        || mime.starts_with("video/")
        || mime.starts_with("font/")
        || mime == "application/octet-stream"
        || mime == "application/pdf"
        || mime == "application/zip"
        || mime == "application/gzip"
        || mime == "application/wasm"
    {
        Encoding::Base64
    } else {
        Encoding::Sniff
    }
}

/// Encode read-back content according to its content type
pub fn encode_body(content: BodyContent, mime_type: Option<&str>) -> ResolvedBody {
    let text = |body: String| ResolvedBody {
        body,
        base64_encoded: false,
    };

    match content {
        BodyContent::Text(body) => text(body),
        BodyContent::Json(value) => text(value.to_string()),
        BodyContent::Bytes(bytes) => match encoding_for(mime_type) {
            Encoding::Base64 => ResolvedBody {
                body: base64::engine::general_purpose::STANDARD.encode(&bytes),
                base64_encoded: true,
            },
            Encoding::Text => text(String::from_utf8_lossy(&bytes).into_owned()),
            Encoding::Sniff => match std::str::from_utf8(&bytes) {
                Ok(body) => text(body.to_string()),
                Err(_) => text(UNDECODABLE_BODY.to_string()),
            },
        },
    }
}

/// Reads response bodies back from tracked request handles
#[derive(Clone)]
pub struct BodyResolver {
    requests: Arc<RequestRegistry>,
}

impl BodyResolver {
    pub fn new(requests: Arc<RequestRegistry>) -> Self {
        Self { requests }
    }

    /// Body of a tracked request
    ///
    /// Fails with [`Error::BodyUnavailable`] if the id was never tracked or
    /// has been evicted, or if the handle cannot be read again.
    pub async fn get_response_body(&self, request_id: &str) -> Result<ResolvedBody> {
        let key = request_id.to_string();
        let entry = self
            .requests
            .get_entry(&key)
            .ok_or_else(|| Error::body_unavailable(request_id, "request not tracked or evicted"))?;

        if let Some(cached) = entry.metadata.response_body {
            return Ok(cached);
        }

        let mime_type = entry
            .metadata
            .response
            .as_ref()
            .and_then(|response| response.mime_type.clone());

        // No registry lock is held across the read
        let content = entry
            .handle
            .read_response()
            .await
            .ok_or_else(|| Error::body_unavailable(request_id, "handle cannot be read again"))?;

        let resolved = encode_body(content, mime_type.as_deref());
        self.requests.update_entry(
            &key,
            RequestPatch {
                response_body: Some(resolved.clone()),
                ..Default::default()
            },
        );
        Ok(resolved)
    }

    /// `response-body` payload for a request. Never fails; a missing body is `null`.
    pub async fn resolve(&self, request_id: &str) -> ResponseBody {
        match self.get_response_body(request_id).await {
            Ok(resolved) => ResponseBody {
                request_id: request_id.to_string(),
                body: Some(resolved.body),
                base64_encoded: resolved.base64_encoded,
            },
            Err(e) => {
                tracing::debug!(request_id, error = %e, "Response body unavailable");
                ResponseBody {
                    request_id: request_id.to_string(),
                    body: None,
                    base64_encoded: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::clock::ManualClock;
    use crate::host::{MemoryHttp, MemoryXhr, XhrRef};
    use crate::network::{Headers, RequestRecord, ResponseMeta};
    use crate::registry::Registry;

    fn tracked(
        registry: &RequestRegistry,
        id: &str,
        mime_type: Option<&str>,
        body: BodyContent,
    ) -> Arc<MemoryXhr> {
        let xhr = MemoryHttp::new().create();
        xhr.open("GET", "https://example.com/resource");
        xhr.receive_headers(200, "OK", Headers::new());
        xhr.complete(body);

        let mut record = RequestRecord::new(id, "GET", "https://example.com/resource", 0);
        record.response = Some(ResponseMeta {
            status: 200,
            mime_type: mime_type.map(String::from),
            ..Default::default()
        });
        let handle: XhrRef = xhr.clone();
        registry.add_entry(id.to_string(), handle, record);
        xhr
    }

    fn setup() -> (ManualClock, Arc<RequestRegistry>, BodyResolver) {
        let clock = ManualClock::new(0);
        let registry = Arc::new(Registry::new(
            "requests",
            Duration::from_secs(300),
            Arc::new(clock.clone()),
        ));
        let resolver = BodyResolver::new(registry.clone());
        (clock, registry, resolver)
    }

    #[tokio::test]
    async fn test_json_body_is_text() {
        let (_clock, registry, resolver) = setup();
        tracked(
            &registry,
            "req_1",
            Some("application/json"),
            BodyContent::Bytes(Bytes::from_static(b"{\"ok\":true}")),
        );

        let body = resolver.get_response_body("req_1").await.unwrap();
        assert_eq!(body.body, "{\"ok\":true}");
        assert!(!body.base64_encoded);
    }

    #[tokio::test]
    async fn test_binary_body_is_base64() {
        let (_clock, registry, resolver) = setup();
        tracked(
            &registry,
            "req_1",
            Some("image/png"),
            BodyContent::Bytes(Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47])),
        );

        let body = resolver.resolve("req_1").await;
        assert_eq!(body.body.as_deref(), Some("iVBORw=="));
        assert!(body.base64_encoded);
    }

    #[tokio::test]
    async fn test_ambiguous_invalid_utf8_gets_marker() {
        let (_clock, registry, resolver) = setup();
        tracked(
            &registry,
            "req_1",
            Some("application/x-custom"),
            BodyContent::Bytes(Bytes::from_static(&[0xff, 0xfe, 0x00])),
        );

        let body = resolver.get_response_body("req_1").await.unwrap();
        assert_eq!(body.body, UNDECODABLE_BODY);
        assert!(!body.base64_encoded);
    }

    #[tokio::test]
    async fn test_evicted_request_resolves_to_null() {
        let (clock, registry, resolver) = setup();
        tracked(&registry, "req_1", Some("text/plain"), BodyContent::Text("hi".into()));
        clock.advance(Duration::from_secs(6 * 60));

        let body = resolver.resolve("req_1").await;
        assert_eq!(body.body, None);
        assert!(!body.base64_encoded);

        let err = resolver.get_response_body("req_1").await.unwrap_err();
        assert!(matches!(err, Error::BodyUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_resolved_body_is_cached() {
        let (_clock, registry, resolver) = setup();
        let xhr = tracked(&registry, "req_1", Some("text/plain"), BodyContent::Text("hi".into()));

        resolver.get_response_body("req_1").await.unwrap();
        xhr.discard_body();

        let body = resolver.get_response_body("req_1").await.unwrap();
        assert_eq!(body.body, "hi");
    }

    #[tokio::test]
    async fn test_consumed_handle_is_unavailable() {
        let (_clock, registry, resolver) = setup();
        let xhr = tracked(&registry, "req_1", None, BodyContent::Text("hi".into()));
        xhr.discard_body();

        assert_eq!(resolver.resolve("req_1").await.body, None);
    }

    #[test]
    fn test_untracked_id_resolves_to_null() {
        let (_clock, _registry, resolver) = setup();
        let body = tokio_test::block_on(resolver.resolve("req_404"));
        assert_eq!(body.request_id, "req_404");
        assert_eq!(body.body, None);
    }

    #[test]
    fn test_encoding_policy() {
        assert_eq!(encoding_for(Some("text/html")), Encoding::Text);
        assert_eq!(encoding_for(Some("application/vnd.api+json")), Encoding::Text);
        assert_eq!(encoding_for(Some("font/woff2")), Encoding::Base64);
        assert_eq!(encoding_for(None), Encoding::Sniff);
    }
}
