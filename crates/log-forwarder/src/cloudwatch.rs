// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`LogSink`] backed by Amazon CloudWatch Logs.

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatchlogs::operation::create_log_stream::CreateLogStreamError;
use aws_sdk_cloudwatchlogs::operation::put_log_events::PutLogEventsError;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::event::{LogEvent, SequenceToken, TargetIdentity};
use crate::sink::LogSink;

#[derive(Debug, Clone)]
pub struct CloudWatchLogsSink {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogsSink {
    #[must_use]
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        CloudWatchLogsSink { client }
    }

    /// Builds a client from the ambient AWS configuration (region and
    /// credentials from the environment or the execution role).
    ///
    /// `endpoint_url` points the client at a local stack instead of the
    /// regional endpoint.
    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let mut builder = aws_sdk_cloudwatchlogs::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_url {
            debug!("Using CloudWatch Logs endpoint override {url}");
            builder = builder.endpoint_url(url);
        }

        CloudWatchLogsSink::new(aws_sdk_cloudwatchlogs::Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl LogSink for CloudWatchLogsSink {
    async fn put_log_events(
        &self,
        target: &TargetIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> Result<Option<SequenceToken>, SinkError> {
        let log_events = events
            .iter()
            .map(|event| {
                InputLogEvent::builder()
                    .timestamp(event.timestamp)
                    .message(event.message.as_str())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SinkError::Other {
                code: None,
                message: format!("failed to build log event: {e}"),
            })?;

        let output = self
            .client
            .put_log_events()
            .log_group_name(target.group_name.as_str())
            .log_stream_name(target.stream_name.as_str())
            .set_log_events(Some(log_events))
            .set_sequence_token(token.map(|t| t.as_str().to_string()))
            .send()
            .await
            .map_err(map_put_err)?;

        if let Some(rejected) = output.rejected_log_events_info() {
            warn!(
                "Sink rejected part of the batch for {target}: too_new_start={:?} too_old_end={:?} expired_end={:?}",
                rejected.too_new_log_event_start_index(),
                rejected.too_old_log_event_end_index(),
                rejected.expired_log_event_end_index()
            );
        }

        Ok(output.next_sequence_token().map(SequenceToken::from))
    }

    async fn create_log_stream(&self, target: &TargetIdentity) -> Result<(), SinkError> {
        self.client
            .create_log_stream()
            .log_group_name(target.group_name.as_str())
            .log_stream_name(target.stream_name.as_str())
            .send()
            .await
            .map_err(map_create_err)?;
        Ok(())
    }
}

fn error_message<E: ProvideErrorMetadata>(err: &E) -> String {
    err.message().unwrap_or_default().to_string()
}

fn other_service_error<E: ProvideErrorMetadata>(err: &E) -> SinkError {
    SinkError::Other {
        code: err.code().map(str::to_string),
        message: error_message(err),
    }
}

fn map_put_err(err: SdkError<PutLogEventsError>) -> SinkError {
    match err {
        SdkError::ServiceError(ref se) => {
            let e = se.err();
            if e.is_invalid_sequence_token_exception() {
                SinkError::InvalidSequenceToken {
                    message: error_message(e),
                }
            } else if e.is_resource_not_found_exception() {
                SinkError::ResourceNotFound {
                    message: error_message(e),
                }
            } else {
                other_service_error(e)
            }
        }
        other => SinkError::Other {
            code: None,
            message: format!("put_log_events failed: {}", DisplayErrorContext(&other)),
        },
    }
}

fn map_create_err(err: SdkError<CreateLogStreamError>) -> SinkError {
    match err {
        SdkError::ServiceError(ref se) => {
            let e = se.err();
            if e.is_resource_already_exists_exception() {
                SinkError::ResourceAlreadyExists {
                    message: error_message(e),
                }
            } else if e.is_resource_not_found_exception() {
                SinkError::ResourceNotFound {
                    message: error_message(e),
                }
            } else {
                other_service_error(e)
            }
        }
        other => SinkError::Other {
            code: None,
            message: format!("create_log_stream failed: {}", DisplayErrorContext(&other)),
        },
    }
}
