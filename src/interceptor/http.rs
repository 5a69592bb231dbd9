// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request/response (XHR) interceptor

use std::sync::Arc;

use super::{guard, Arming, Interceptor, SignalSink};
use crate::config::UrlFilter;
use crate::error::{Error, Result, Transport};
use crate::host::{HttpPrimitive, ReadyState, XhrHooks, XhrRef};
use crate::network::{
    infer_content_type, Headers, Initiator, PostData, RequestBody, RequestId, ResponseMeta,
};
use crate::registry::IdGenerator;

/// Stack frames belonging to instrumentation rather than the application
const INSTRUMENTATION_FRAMES: &[&str] = &["netscope", "XMLHttpRequest.send"];

/// Why a request ended without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Error,
    Abort,
    Timeout,
}

impl FailureReason {
    pub fn message(self) -> &'static str {
        match self {
            FailureReason::Error => "Network request failed",
            FailureReason::Abort => "Request aborted",
            FailureReason::Timeout => "Request timed out",
        }
    }

    /// Only an abort counts as a cancellation
    pub fn is_cancel(self) -> bool {
        self == FailureReason::Abort
    }
}

/// Raw HTTP signal
pub enum HttpSignal {
    Sent {
        id: RequestId,
        handle: XhrRef,
        method: String,
        url: String,
        headers: Headers,
        post_data: Option<PostData>,
        initiator: Initiator,
    },
    HeadersReceived {
        id: RequestId,
        response: ResponseMeta,
    },
    Progress {
        id: RequestId,
        loaded: u64,
        total: Option<u64>,
    },
    Done {
        id: RequestId,
        response: ResponseMeta,
    },
    Failed {
        id: RequestId,
        reason: FailureReason,
    },
}

/// Interceptor for the host request primitive
pub struct HttpInterceptor {
    primitive: Arc<dyn HttpPrimitive>,
    arming: Arc<Arming<HttpSignal>>,
    ids: Arc<IdGenerator>,
}

impl HttpInterceptor {
    pub fn new(primitive: Arc<dyn HttpPrimitive>) -> Self {
        Self {
            primitive,
            arming: Arc::new(Arming::new()),
            ids: Arc::new(IdGenerator::new("req_")),
        }
    }

    /// Register the raw callback consumer
    pub fn set_sink(&self, sink: Arc<dyn SignalSink<HttpSignal>>) {
        self.arming.set_sink(sink);
    }

    /// URLs that are never assigned an id
    pub fn set_filter(&self, filter: UrlFilter) {
        self.arming.set_filter(filter);
    }
}

impl Interceptor for HttpInterceptor {
    fn transport(&self) -> Transport {
        Transport::Http
    }

    fn enable(&self) -> Result<()> {
        if let Some(session) = self.arming.arm() {
            self.primitive.patch(Arc::new(XhrHookSet {
                session,
                arming: self.arming.clone(),
                ids: self.ids.clone(),
            }));
            tracing::info!(session, "HTTP interception enabled");
        }
        Ok(())
    }

    fn disable(&self) {
        if self.arming.disarm() {
            self.primitive.restore();
            tracing::info!("HTTP interception disabled");
        }
    }

    fn is_enabled(&self) -> bool {
        self.arming.is_enabled()
    }
}

/// Hooks installed into the request primitive for one session
struct XhrHookSet {
    session: u64,
    arming: Arc<Arming<HttpSignal>>,
    ids: Arc<IdGenerator>,
}

impl XhrHookSet {
    fn deliver(&self, signal: HttpSignal) -> Result<()> {
        match self.arming.sink_for(self.session) {
            Some(sink) => sink.deliver(signal),
            None => Ok(()),
        }
    }

    fn id_of(&self, xhr: &XhrRef) -> Result<RequestId> {
        xhr.correlation_id()
            .ok_or_else(|| Error::correlation_miss(Transport::Http, xhr.url()))
    }

    fn send(&self, xhr: &XhrRef, body: Option<&RequestBody>) -> Result<()> {
        let url = xhr.url();
        if self.arming.is_ignored(&url) {
            tracing::trace!(%url, "Ignored request");
            return Ok(());
        }
        if self.arming.sink_for(self.session).is_none() {
            return Ok(());
        }

        let id = self.ids.next_id();
        xhr.set_correlation_id(Some(id.clone()));

        let mut headers = xhr.request_headers();
        if let Some(body) = body {
            if !headers.contains("content-type") {
                headers.set("Content-Type", infer_content_type(body));
            }
        }

        let initiator = xhr
            .initiator_stack()
            .map(|stack| Initiator::from_stack(&stack, INSTRUMENTATION_FRAMES))
            .unwrap_or_default();

        self.deliver(HttpSignal::Sent {
            id,
            handle: xhr.clone(),
            method: xhr.method(),
            url,
            headers,
            post_data: body.map(PostData::classify),
            initiator,
        })
    }
}

/// Snapshot of the response metadata a request handle exposes
pub(super) fn response_meta(xhr: &XhrRef) -> ResponseMeta {
    let headers = xhr.response_headers();
    let mime_type = headers
        .content_type()
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
        .filter(|essence| !essence.is_empty());

    ResponseMeta {
        url: xhr.response_url().unwrap_or_else(|| xhr.url()),
        status: xhr.status(),
        status_text: xhr.status_text(),
        mime_type,
        size: xhr.response_size(),
        headers,
    }
}

impl XhrHooks for XhrHookSet {
    fn on_open(&self, xhr: &XhrRef, _method: &str, _url: &str) {
        // A reused object starts a new logical request
        guard(Transport::Http, "open", || {
            xhr.set_correlation_id(None);
            Ok(())
        });
    }

    fn on_send(&self, xhr: &XhrRef, body: Option<&RequestBody>) {
        guard(Transport::Http, "send", || self.send(xhr, body));
    }

    fn on_ready_state_change(&self, xhr: &XhrRef, state: ReadyState) {
        guard(Transport::Http, "readystatechange", || match state {
            ReadyState::HeadersReceived => self.deliver(HttpSignal::HeadersReceived {
                id: self.id_of(xhr)?,
                response: response_meta(xhr),
            }),
            // Done with status 0 is a failure; error/abort/timeout follows
            ReadyState::Done if xhr.status() != 0 => self.deliver(HttpSignal::Done {
                id: self.id_of(xhr)?,
                response: response_meta(xhr),
            }),
            _ => Ok(()),
        });
    }

    fn on_progress(&self, xhr: &XhrRef, loaded: u64, total: Option<u64>) {
        guard(Transport::Http, "progress", || {
            self.deliver(HttpSignal::Progress {
                id: self.id_of(xhr)?,
                loaded,
                total,
            })
        });
    }

    fn on_load(&self, xhr: &XhrRef) {
        guard(Transport::Http, "load", || {
            self.deliver(HttpSignal::Done {
                id: self.id_of(xhr)?,
                response: response_meta(xhr),
            })
        });
    }

    fn on_error(&self, xhr: &XhrRef) {
        guard(Transport::Http, "error", || {
            self.deliver(HttpSignal::Failed {
                id: self.id_of(xhr)?,
                reason: FailureReason::Error,
            })
        });
    }

    fn on_abort(&self, xhr: &XhrRef) {
        guard(Transport::Http, "abort", || {
            self.deliver(HttpSignal::Failed {
                id: self.id_of(xhr)?,
                reason: FailureReason::Abort,
            })
        });
    }

    fn on_timeout(&self, xhr: &XhrRef) {
        guard(Transport::Http, "timeout", || {
            self.deliver(HttpSignal::Failed {
                id: self.id_of(xhr)?,
                reason: FailureReason::Timeout,
            })
        });
    }
}
