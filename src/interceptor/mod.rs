// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport interceptors
//!
//! One adapter per host primitive. Each adapter knows the exact shape of its
//! host API and turns native callbacks into transport-neutral raw signals
//! for a registered [`SignalSink`]. Nothing here keeps lifecycle state.

mod http;
mod shim;
mod sse;
mod websocket;

pub use http::{FailureReason, HttpInterceptor, HttpSignal};
pub use shim::{ArgumentLayout, CompatShim, SocketCall, SocketNotice};
pub use sse::{SseInterceptor, SseSignal};
pub use websocket::{SocketSignal, WebSocketInterceptor};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::UrlFilter;
use crate::error::{Result, Transport};

/// Enable/disable capability shared by all interceptors
pub trait Interceptor: Send + Sync {
    /// Transport this interceptor patches
    fn transport(&self) -> Transport;

    /// Patch the host primitive. Idempotent.
    fn enable(&self) -> Result<()>;

    /// Restore the host primitive and drop callbacks. Idempotent.
    fn disable(&self);

    fn is_enabled(&self) -> bool;
}

/// Consumer of raw interceptor signals
pub trait SignalSink<S>: Send + Sync {
    fn deliver(&self, signal: S) -> Result<()>;
}

/// Enable state of one interceptor
///
/// Every enable starts a new session. Hooks remember the session they were
/// created for and go inert once it ends, so a hook the host kept a stale
/// reference to can never deliver into a later session.
pub(crate) struct Arming<S> {
    state: RwLock<ArmState<S>>,
}

struct ArmState<S> {
    enabled: bool,
    session: u64,
    sink: Option<Arc<dyn SignalSink<S>>>,
    filter: UrlFilter,
}

impl<S> Arming<S> {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(ArmState {
                enabled: false,
                session: 0,
                sink: None,
                filter: UrlFilter::default(),
            }),
        }
    }

    pub(crate) fn set_sink(&self, sink: Arc<dyn SignalSink<S>>) {
        self.state.write().sink = Some(sink);
    }

    pub(crate) fn set_filter(&self, filter: UrlFilter) {
        self.state.write().filter = filter;
    }

    /// Start a session. `None` if already enabled.
    pub(crate) fn arm(&self) -> Option<u64> {
        let mut state = self.state.write();
        if state.enabled {
            return None;
        }
        state.enabled = true;
        state.session += 1;
        Some(state.session)
    }

    /// End the session and drop the sink. `false` if already disabled.
    pub(crate) fn disarm(&self) -> bool {
        let mut state = self.state.write();
        if !state.enabled {
            return false;
        }
        state.enabled = false;
        state.sink = None;
        true
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// Sink for a hook of `session`, if that session is still live
    pub(crate) fn sink_for(&self, session: u64) -> Option<Arc<dyn SignalSink<S>>> {
        let state = self.state.read();
        if state.enabled && state.session == session {
            state.sink.clone()
        } else {
            None
        }
    }

    pub(crate) fn is_ignored(&self, url: &str) -> bool {
        self.state.read().filter.is_ignored(url)
    }
}

/// Run a hook body without letting errors or panics cross into the host
pub(crate) fn guard<F>(transport: Transport, hook: &'static str, f: F)
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_correlation_miss() => {
            tracing::debug!(%transport, hook, error = %e, "Dropped signal");
        }
        Ok(Err(e)) => {
            tracing::warn!(%transport, hook, error = %e, "Interceptor fault, event not emitted");
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%transport, hook, panic = %message, "Interceptor panicked, event not emitted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Discard;

    impl SignalSink<u32> for Discard {
        fn deliver(&self, _signal: u32) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_arming_sessions() {
        let arming: Arming<u32> = Arming::new();
        arming.set_sink(Arc::new(Discard));

        let first = arming.arm().unwrap();
        assert!(arming.arm().is_none());
        assert!(arming.sink_for(first).is_some());

        assert!(arming.disarm());
        assert!(!arming.disarm());
        assert!(arming.sink_for(first).is_none());

        arming.set_sink(Arc::new(Discard));
        let second = arming.arm().unwrap();
        assert_ne!(first, second);
        assert!(arming.sink_for(first).is_none());
        assert!(arming.sink_for(second).is_some());
    }

    #[test]
    fn test_guard_swallows_errors_and_panics() {
        guard(Transport::Http, "test", || Err(Error::other("boom")));
        guard(Transport::Http, "test", || panic!("hook exploded"));
        guard(Transport::Http, "test", || {
            Err(Error::correlation_miss(Transport::Http, "req_1"))
        });
    }
}
