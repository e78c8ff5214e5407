// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits an ordered run of log events into sink-sized batches.
//!
//! The scan is greedy and left to right. An event joins the open batch only if
//! the batch would still satisfy every limit afterwards:
//!
//! - encoded size `< max_batch_bytes`, where each event costs its message
//!   length plus a fixed overhead
//! - event count `<= max_events_per_batch`
//! - `timestamp - first_timestamp < max_time_span_ms`, measured from the first
//!   event of the open batch
//!
//! Otherwise the open batch is emitted and the event starts a new one. A
//! single event that breaks the size or span limit on its own still becomes a
//! one-event batch; the sink decides what to do with it.

use crate::constants;
use crate::event::LogEvent;

/// Per-request limits enforced on every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_bytes: usize,
    pub per_event_overhead: usize,
    pub max_events_per_batch: usize,
    pub max_time_span_ms: i64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            max_batch_bytes: constants::MAX_BATCH_BYTES,
            per_event_overhead: constants::FIXED_OVERHEAD,
            max_events_per_batch: constants::MAX_EVENTS_PER_BATCH,
            max_time_span_ms: constants::MAX_TIME_SPAN_MS,
        }
    }
}

impl BatchLimits {
    /// Bytes the sink charges for `event`.
    #[must_use]
    pub fn encoded_size(&self, event: &LogEvent) -> usize {
        event.message.len() + self.per_event_overhead
    }

    fn admits(&self, size: usize, count: usize, span: i64) -> bool {
        size < self.max_batch_bytes && count <= self.max_events_per_batch && span < self.max_time_span_ms
    }
}

/// A contiguous, non-empty run of the input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    events: &'a [LogEvent],
    encoded_size: usize,
}

impl<'a> Batch<'a> {
    #[must_use]
    pub fn events(&self) -> &'a [LogEvent] {
        self.events
    }

    /// Sum of message lengths plus the per-event overhead.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        self.encoded_size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distance between the last and the first event.
    #[must_use]
    pub fn time_span_ms(&self) -> i64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => 0,
        }
    }
}

/// Partitions `events` into the longest batches that satisfy `limits`.
///
/// Order is preserved and every event lands in exactly one batch. An empty
/// input yields no batches.
#[must_use]
pub fn partition<'a>(events: &'a [LogEvent], limits: &BatchLimits) -> Vec<Batch<'a>> {
    let Some(first) = events.first() else {
        return Vec::new();
    };

    let mut batches = Vec::new();
    let mut start = 0;
    let mut size = limits.encoded_size(first);
    let mut first_timestamp = first.timestamp;

    for (index, candidate) in events.iter().enumerate().skip(1) {
        let candidate_size = limits.encoded_size(candidate);
        let next_size = size + candidate_size;
        let next_count = index - start + 1;
        let next_span = candidate.timestamp.saturating_sub(first_timestamp);

        if limits.admits(next_size, next_count, next_span) {
            size = next_size;
            continue;
        }

        batches.push(Batch {
            events: &events[start..index],
            encoded_size: size,
        });
        start = index;
        size = candidate_size;
        first_timestamp = candidate.timestamp;
    }

    batches.push(Batch {
        events: &events[start..],
        encoded_size: size,
    });
    batches
}
