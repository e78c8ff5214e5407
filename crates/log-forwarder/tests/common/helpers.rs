// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use log_forwarder::envelope::{AwsLogs, CloudWatchLogsEvent};
use log_forwarder::event::LogEvent;
use serde_json::json;
use std::io::Write;

pub const GROUP_NAME: &str = "/apg/logs-from-spokes";
pub const OWNER: &str = "123456789012";
pub const SOURCE_STREAM: &str = "2024/01/01/[$LATEST]0123456789abcdef";

/// Wrap a JSON document the way a subscription filter delivers it
pub fn envelope(payload: &serde_json::Value) -> CloudWatchLogsEvent {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(payload.to_string().as_bytes())
        .expect("failed to compress payload");
    let compressed = encoder.finish().expect("failed to finish compression");
    CloudWatchLogsEvent {
        awslogs: AwsLogs {
            data: base64::engine::general_purpose::STANDARD.encode(compressed),
        },
    }
}

/// Build a DATA_MESSAGE delivery carrying `events`
pub fn data_message(events: &[LogEvent]) -> CloudWatchLogsEvent {
    let log_events = events
        .iter()
        .enumerate()
        .map(|(i, e)| json!({"id": i.to_string(), "timestamp": e.timestamp, "message": e.message}))
        .collect::<Vec<_>>();
    envelope(&json!({
        "messageType": "DATA_MESSAGE",
        "owner": OWNER,
        "logGroup": "/aws/lambda/spoke-function",
        "logStream": SOURCE_STREAM,
        "subscriptionFilters": ["SpokeLogsDestination"],
        "logEvents": log_events,
    }))
}

/// `count` small events one millisecond apart
pub fn small_events(count: usize) -> Vec<LogEvent> {
    (0..count)
        .map(|i| LogEvent::new(1_700_000_000_000 + i as i64, format!("event {i}")))
        .collect()
}

pub fn destination_stream() -> String {
    format!("{OWNER}-{SOURCE_STREAM}")
}
