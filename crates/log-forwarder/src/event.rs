// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use std::fmt;

/// A single decoded log line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        LogEvent {
            timestamp,
            message: message.into(),
        }
    }
}

/// Opaque token the sink hands back after each successful append.
///
/// The forwarder never makes one up: a token only ever comes from a
/// successful response or from the sink's own rejection message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceToken(String);

impl SequenceToken {
    pub fn new(token: impl Into<String>) -> Self {
        SequenceToken(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SequenceToken {
    fn from(token: String) -> Self {
        SequenceToken(token)
    }
}

impl From<&str> for SequenceToken {
    fn from(token: &str) -> Self {
        SequenceToken(token.to_string())
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a batch is appended: a log group and a stream inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetIdentity {
    pub group_name: String,
    pub stream_name: String,
}

impl TargetIdentity {
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        TargetIdentity {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_name, self.stream_name)
    }
}
