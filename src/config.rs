// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Inspector configuration

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default registry TTL (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default per-connection message log capacity
pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 32;

/// Dev-server symbolication and log streaming endpoints
pub const DEV_SERVER_PATTERN: &str =
    r"^(https?|wss?)://(localhost|127\.0\.0\.1|10\.0\.2\.2)(:\d+)?/(symbolicate|logs)$";

/// Inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InspectorConfig {
    /// Intercept the request/response primitive
    pub http: bool,
    /// Intercept the socket bridge
    pub websocket: bool,
    /// Intercept event sources (needs `http`)
    pub sse: bool,
    /// Residency of HTTP request records
    #[serde(with = "duration_secs")]
    pub request_ttl: Duration,
    /// Residency of WebSocket and SSE connection records
    #[serde(with = "duration_secs")]
    pub connection_ttl: Duration,
    /// Ring buffer capacity for connection message logs
    pub message_log_capacity: usize,
    /// URL patterns (regex) that are never tracked
    pub ignored_urls: Vec<String>,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            http: true,
            websocket: true,
            sse: false,
            request_ttl: DEFAULT_TTL,
            connection_ttl: DEFAULT_TTL,
            message_log_capacity: DEFAULT_MESSAGE_LOG_CAPACITY,
            ignored_urls: vec![DEV_SERVER_PATTERN.to_string()],
        }
    }
}

impl InspectorConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable HTTP interception
    pub fn http(mut self, enabled: bool) -> Self {
        self.http = enabled;
        self
    }

    /// Enable/disable WebSocket interception
    pub fn websocket(mut self, enabled: bool) -> Self {
        self.websocket = enabled;
        self
    }

    /// Enable/disable SSE interception
    pub fn sse(mut self, enabled: bool) -> Self {
        self.sse = enabled;
        self
    }

    /// Set request TTL
    pub fn request_ttl(mut self, ttl: Duration) -> Self {
        self.request_ttl = ttl;
        self
    }

    /// Set connection TTL
    pub fn connection_ttl(mut self, ttl: Duration) -> Self {
        self.connection_ttl = ttl;
        self
    }

    /// Set message log capacity
    pub fn message_log_capacity(mut self, capacity: usize) -> Self {
        self.message_log_capacity = capacity;
        self
    }

    /// Add an ignored URL pattern
    pub fn ignore_url(mut self, pattern: impl Into<String>) -> Self {
        self.ignored_urls.push(pattern.into());
        self
    }

    /// Drop all ignored URL patterns, including the defaults
    pub fn track_all_urls(mut self) -> Self {
        self.ignored_urls.clear();
        self
    }

    /// Parse a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check feature combinations and limits
    pub fn validate(&self) -> Result<()> {
        if self.sse && !self.http {
            return Err(Error::configuration(
                "SSE interception requires HTTP interception: event sources run over the \
                 HTTP primitive and share its correlation id; enable `http` or disable `sse`",
            ));
        }

        if self.message_log_capacity == 0 {
            return Err(Error::configuration(
                "message_log_capacity must be at least 1",
            ));
        }

        if self.request_ttl.is_zero() || self.connection_ttl.is_zero() {
            return Err(Error::configuration("registry TTLs must be non-zero"));
        }

        self.url_filter().map(|_| ())
    }

    /// Compile the ignored URL patterns
    pub fn url_filter(&self) -> Result<UrlFilter> {
        UrlFilter::new(&self.ignored_urls)
    }
}

/// Compiled set of ignored URL patterns
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    patterns: Vec<Regex>,
}

impl UrlFilter {
    /// Compile patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    Error::configuration(format!("invalid ignored URL pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Check if a URL should not be tracked
    pub fn is_ignored(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
