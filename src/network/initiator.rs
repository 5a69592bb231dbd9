// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request initiator derived from a captured stack trace

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `url:line:column` inside a stack frame. Covers V8 (`at fn (url:l:c)`),
    /// Hermes (`at fn (address at url:l:c)`) and JSC (`fn@url:l:c`).
    static ref FRAME_LOCATION: Regex = Regex::new(
        r"(?P<url>[A-Za-z][A-Za-z0-9+.-]*://[^\s()]+?|/[^\s():]+):(?P<line>\d+):(?P<column>\d+)"
    )
    .unwrap();
}

/// Initiator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiatorType {
    Script,
    Other,
}

/// Origin of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    #[serde(rename = "type")]
    pub kind: InitiatorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

impl Initiator {
    /// Initiator with no known origin
    pub fn other() -> Self {
        Self {
            kind: InitiatorType::Other,
            url: None,
            line_number: None,
            column_number: None,
        }
    }

    /// First stack frame not belonging to an instrumentation layer.
    ///
    /// `skip` holds substrings identifying frames to pass over (the
    /// interceptor's own frames sit on top of every captured stack).
    pub fn from_stack(stack: &str, skip: &[&str]) -> Self {
        stack
            .lines()
            .filter(|line| !skip.iter().any(|s| line.contains(s)))
            .find_map(|line| {
                let caps = FRAME_LOCATION.captures(line)?;
                let url = caps.name("url")?.as_str();
                if url.contains("://") && url::Url::parse(url).is_err() {
                    return None;
                }
                Some(Self {
                    kind: InitiatorType::Script,
                    url: Some(url.to_string()),
                    line_number: caps.name("line")?.as_str().parse().ok(),
                    column_number: caps.name("column")?.as_str().parse().ok(),
                })
            })
            .unwrap_or_else(Self::other)
    }
}

impl Default for Initiator {
    fn default() -> Self {
        Self::other()
    }
}
