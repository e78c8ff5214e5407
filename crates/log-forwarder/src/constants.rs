// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hard limits imposed by the CloudWatch Logs `PutLogEvents` API.
//!
//! A request is rejected outright when any of these is exceeded, so every
//! batch handed to the sink must satisfy all of them at once.

/// Maximum encoded size of one `PutLogEvents` request, in bytes.
///
/// A batch is only accepted while its encoded size stays strictly below this
/// value.
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Bytes the sink charges for each event on top of its message length.
pub const FIXED_OVERHEAD: usize = 26;

/// Maximum number of events in one request (inclusive).
pub const MAX_EVENTS_PER_BATCH: usize = 10_000;

/// Maximum distance between the first and last event of a request.
///
/// The sink allows 24 hours. One hour of headroom is kept.
pub const MAX_TIME_SPAN_MS: i64 = 23 * 60 * 60 * 1000;

/// Number of append attempts made for a single batch before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Log stream names are limited to 512 characters.
pub const MAX_LOG_STREAM_NAME_LENGTH: usize = 512;
