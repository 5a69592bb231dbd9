// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Server-sent events interceptor
//!
//! An event source runs over the host request primitive, so its correlation
//! id is the one the HTTP interceptor attached to the underlying handle.
//! This adapter only works while HTTP interception is active.

use std::sync::Arc;

use super::http::response_meta;
use super::{guard, Arming, HttpInterceptor, Interceptor, SignalSink};
use crate::config::UrlFilter;
use crate::error::{Error, Result, Transport};
use crate::host::{EventSourceClass, EventSourceHooks, EventSourceNotice, EventSourceRef};
use crate::network::{RequestId, ResponseMeta, SseErrorKind};

/// Raw SSE signal
#[derive(Debug, Clone, PartialEq)]
pub enum SseSignal {
    Connecting {
        id: RequestId,
        url: String,
    },
    Open {
        id: RequestId,
        response: Option<ResponseMeta>,
    },
    Message {
        id: RequestId,
        event_type: String,
        data: String,
        last_event_id: Option<String>,
    },
    Error {
        id: RequestId,
        kind: SseErrorKind,
        detail: Option<String>,
    },
    Close {
        id: RequestId,
    },
}

/// Interceptor for the host event source class
pub struct SseInterceptor {
    class: Arc<dyn EventSourceClass>,
    http: Arc<HttpInterceptor>,
    arming: Arc<Arming<SseSignal>>,
}

impl SseInterceptor {
    pub fn new(class: Arc<dyn EventSourceClass>, http: Arc<HttpInterceptor>) -> Self {
        Self {
            class,
            http,
            arming: Arc::new(Arming::new()),
        }
    }

    pub fn set_sink(&self, sink: Arc<dyn SignalSink<SseSignal>>) {
        self.arming.set_sink(sink);
    }

    pub fn set_filter(&self, filter: UrlFilter) {
        self.arming.set_filter(filter);
    }
}

impl Interceptor for SseInterceptor {
    fn transport(&self) -> Transport {
        Transport::Sse
    }

    /// Fails with a configuration error unless HTTP interception is active
    fn enable(&self) -> Result<()> {
        if !self.http.is_enabled() {
            return Err(Error::configuration(
                "SSE interception requires HTTP interception to be enabled",
            ));
        }
        if let Some(session) = self.arming.arm() {
            self.class.patch(Arc::new(SseHookSet {
                session,
                arming: self.arming.clone(),
            }));
            tracing::info!(session, "SSE interception enabled");
        }
        Ok(())
    }

    fn disable(&self) {
        if self.arming.disarm() {
            self.class.restore();
            tracing::info!("SSE interception disabled");
        }
    }

    fn is_enabled(&self) -> bool {
        self.arming.is_enabled()
    }
}

struct SseHookSet {
    session: u64,
    arming: Arc<Arming<SseSignal>>,
}

impl SseHookSet {
    fn deliver(&self, signal: SseSignal) -> Result<()> {
        match self.arming.sink_for(self.session) {
            Some(sink) => sink.deliver(signal),
            None => Ok(()),
        }
    }

    fn id_of(&self, source: &EventSourceRef) -> Result<RequestId> {
        source
            .transport()
            .and_then(|xhr| xhr.correlation_id())
            .ok_or_else(|| Error::correlation_miss(Transport::Sse, source.url()))
    }

    fn connection_open(&self, source: &EventSourceRef) -> Result<()> {
        let url = source.url();
        if self.arming.is_ignored(&url) {
            return Ok(());
        }
        self.deliver(SseSignal::Connecting {
            id: self.id_of(source)?,
            url,
        })
    }

    fn notice(&self, source: &EventSourceRef, notice: &EventSourceNotice) -> Result<()> {
        let id = self.id_of(source)?;
        let signal = match notice {
            EventSourceNotice::Open => SseSignal::Open {
                id,
                response: source.transport().map(|xhr| response_meta(&xhr)),
            },
            EventSourceNotice::Message {
                event_type,
                data,
                last_event_id,
            } => SseSignal::Message {
                id,
                event_type: event_type.clone(),
                data: data.clone(),
                last_event_id: last_event_id.clone(),
            },
            EventSourceNotice::Error { kind, detail } => SseSignal::Error {
                id,
                kind: *kind,
                detail: detail.clone(),
            },
            EventSourceNotice::Close => SseSignal::Close { id },
        };
        self.deliver(signal)
    }
}

impl EventSourceHooks for SseHookSet {
    fn on_connection_open(&self, source: &EventSourceRef) {
        guard(Transport::Sse, "open", || self.connection_open(source));
    }

    fn on_notice(&self, source: &EventSourceRef, notice: &EventSourceNotice) {
        guard(Transport::Sse, "notice", || self.notice(source, notice));
    }
}
