// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of one batch to the sink with bounded retry.
//!
//! Each attempt appends the batch with the current sequence token and
//! classifies the result:
//!
//! | Result                       | Reaction                                       |
//! |------------------------------|------------------------------------------------|
//! | success                      | return the sink's next token                   |
//! | stale token                  | adopt the token named in the error, retry      |
//! | stale token, unparseable     | fail immediately                               |
//! | stream missing               | create the stream, retry with the same token   |
//! | stream missing, create fails | fail immediately with the create error         |
//! | anything else                | log it, retry unchanged                        |
//!
//! Attempts run back to back with no delay. After the last attempt the final
//! error is returned.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::constants;
use crate::error::{DeliveryError, SinkError};
use crate::event::{SequenceToken, TargetIdentity};
use crate::partitioner::Batch;
use crate::sink::LogSink;
use crate::token::{ExpectedTokenExtractor, PatternTokenExtractor};

/// Why an attempt failed in a way that is worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The sink rejected the token and named the one it expects.
    Resync {
        expected: Option<SequenceToken>,
        cause: SinkError,
    },
    /// The stream does not exist yet.
    TargetMissing(SinkError),
    /// Any other failure. Retrying cannot fix it but may outlast it.
    Unclassified(SinkError),
}

impl RetryReason {
    #[must_use]
    pub fn cause(&self) -> &SinkError {
        match self {
            RetryReason::Resync { cause, .. } => cause,
            RetryReason::TargetMissing(cause) | RetryReason::Unclassified(cause) => cause,
        }
    }

    fn into_cause(self) -> SinkError {
        match self {
            RetryReason::Resync { cause, .. } => cause,
            RetryReason::TargetMissing(cause) | RetryReason::Unclassified(cause) => cause,
        }
    }
}

/// Classification of a single append attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered(Option<SequenceToken>),
    RetryableFailure(RetryReason),
    FatalFailure(DeliveryError),
}

#[derive(Clone)]
pub struct Deliverer {
    sink: Arc<dyn LogSink>,
    extractor: Arc<dyn ExpectedTokenExtractor>,
    max_attempts: u32,
}

impl Deliverer {
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Deliverer {
            sink,
            extractor: Arc::new(PatternTokenExtractor::default()),
            max_attempts: constants::MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ExpectedTokenExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Overrides the attempt budget. At least one attempt is always made.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sorts the result of one append into delivered, retryable or fatal.
    #[must_use]
    pub fn classify(&self, result: Result<Option<SequenceToken>, SinkError>) -> DeliveryOutcome {
        let err = match result {
            Ok(next_token) => return DeliveryOutcome::Delivered(next_token),
            Err(err) => err,
        };

        match err {
            SinkError::InvalidSequenceToken { message } => {
                match self.extractor.extract(&message) {
                    Ok(expected) => DeliveryOutcome::RetryableFailure(RetryReason::Resync {
                        expected,
                        cause: SinkError::InvalidSequenceToken { message },
                    }),
                    Err(parse_err) => DeliveryOutcome::FatalFailure(parse_err.into()),
                }
            }
            missing @ SinkError::ResourceNotFound { .. } => {
                DeliveryOutcome::RetryableFailure(RetryReason::TargetMissing(missing))
            }
            other => DeliveryOutcome::RetryableFailure(RetryReason::Unclassified(other)),
        }
    }

    /// Delivers `batch` to `target`, starting from `token`.
    ///
    /// Returns the token for the next batch. Callers must not run two sends
    /// against the same target concurrently.
    pub async fn send(
        &self,
        batch: &Batch<'_>,
        target: &TargetIdentity,
        token: Option<SequenceToken>,
    ) -> Result<Option<SequenceToken>, DeliveryError> {
        let mut token = token;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self
                .sink
                .put_log_events(target, batch.events(), token.as_ref())
                .await;

            let reason = match self.classify(result) {
                DeliveryOutcome::Delivered(next_token) => {
                    debug!(
                        "Delivered {} events to {target} on attempt {attempt}",
                        batch.len()
                    );
                    return Ok(next_token);
                }
                DeliveryOutcome::FatalFailure(err) => {
                    error!("Aborting delivery to {target}: {err}");
                    return Err(err);
                }
                DeliveryOutcome::RetryableFailure(reason) => reason,
            };

            match &reason {
                RetryReason::Resync { expected, .. } => {
                    match expected {
                        Some(expected) => info!("Caught and parsed sequence token: {expected}"),
                        None => info!("Caught sequence token reset, retrying without a token"),
                    }
                    token = expected.clone();
                }
                RetryReason::TargetMissing(_) => {
                    info!("Creating log stream {target}");
                    if let Err(err) = self.ensure_target(target).await {
                        error!("Failed to create log stream {target}: {err}");
                        return Err(DeliveryError::CreateTargetFailed(err));
                    }
                }
                RetryReason::Unclassified(err) => {
                    warn!("Attempt {attempt} to deliver to {target} failed: {err}");
                }
            }

            if attempt >= self.max_attempts {
                let source = reason.into_cause();
                error!(
                    "Failed to deliver {} events to {target} after {attempt} attempts: {source}",
                    batch.len()
                );
                return Err(DeliveryError::RetriesExhausted {
                    attempts: attempt,
                    source,
                });
            }
        }
    }

    /// Creates the target stream. A stream that already exists counts as
    /// created.
    pub async fn ensure_target(&self, target: &TargetIdentity) -> Result<(), SinkError> {
        match self.sink.create_log_stream(target).await {
            Ok(()) => debug!("Created log stream {target}"),
            Err(SinkError::ResourceAlreadyExists { .. }) => {
                debug!("Log stream {target} already exists");
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}
