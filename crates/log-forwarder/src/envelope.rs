// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoding of CloudWatch Logs subscription deliveries.
//!
//! A subscription filter delivers log events as
//!
//! ```json
//! {"awslogs": {"data": "<base64 of gzipped JSON>"}}
//! ```
//!
//! where the gzipped JSON is a [`LogsData`] document.

use base64::Engine;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

use crate::constants;
use crate::error::EnvelopeError;
use crate::event::LogEvent;

/// The invocation payload handed over by the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloudWatchLogsEvent {
    pub awslogs: AwsLogs,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AwsLogs {
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MessageType {
    #[serde(rename = "DATA_MESSAGE")]
    Data,
    /// Sent once when the subscription is created, to check the destination
    /// is reachable.
    #[serde(rename = "CONTROL_MESSAGE")]
    Control,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Data => "DATA_MESSAGE",
            MessageType::Control => "CONTROL_MESSAGE",
            MessageType::Unknown => "UNKNOWN_MESSAGE",
        };
        f.write_str(name)
    }
}

/// The decoded payload of a subscription delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsData {
    pub message_type: MessageType,
    /// Account id of the source log group.
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    #[serde(default)]
    pub log_events: Vec<LogEvent>,
}

impl LogsData {
    /// Name of the stream the events are forwarded to.
    ///
    /// The source account id is prepended so that identically named streams
    /// from different accounts do not interleave, and the result is cut to
    /// the sink's stream name limit.
    #[must_use]
    pub fn destination_stream_name(&self) -> String {
        format!("{}-{}", self.owner, self.log_stream)
            .chars()
            .take(constants::MAX_LOG_STREAM_NAME_LENGTH)
            .collect()
    }
}

impl CloudWatchLogsEvent {
    /// Decodes base64, gunzips and parses the payload.
    pub fn decode(&self) -> Result<LogsData, EnvelopeError> {
        let compressed = base64::engine::general_purpose::STANDARD.decode(self.awslogs.data.trim())?;

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        Ok(serde_json::from_slice(&decompressed)?)
    }
}
