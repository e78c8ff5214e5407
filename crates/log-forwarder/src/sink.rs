// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::error::SinkError;
use crate::event::{LogEvent, SequenceToken, TargetIdentity};

/// An append-only log destination with optimistic sequencing.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Appends `events` to `target`, presenting `token` as the last token the
    /// caller saw. Returns the token to present on the next append.
    async fn put_log_events(
        &self,
        target: &TargetIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> Result<Option<SequenceToken>, SinkError>;

    /// Creates the stream named by `target`. Fails with
    /// [`SinkError::ResourceAlreadyExists`] if it is already there.
    async fn create_log_stream(&self, target: &TargetIdentity) -> Result<(), SinkError>;
}
