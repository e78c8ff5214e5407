// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod logger;
mod runtime;

use std::{env, sync::Arc};
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use log_forwarder::{
    cloudwatch::CloudWatchLogsSink,
    config::{ForwarderConfig, LOG_LEVEL_VAR},
    deliverer::Deliverer,
    envelope::CloudWatchLogsEvent,
    forwarder::Forwarder,
};

use crate::runtime::{Invocation, RuntimeClient, RuntimeError};

#[tokio::main]
pub async fn main() {
    let log_level = env::var(LOG_LEVEL_VAR)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!(
        "h2=off,hyper=off,rustls=off,aws_smithy_runtime=warn,aws_config=warn,{log_level}"
    );

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .event_format(logger::Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let runtime = match RuntimeClient::from_env() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Unable to reach the Lambda Runtime API: {e}");
            return;
        }
    };

    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating forwarder config: {e}");
            if let Err(report_err) = runtime.send_init_error("ConfigError", &e.to_string()).await {
                error!("Failed to report init error: {report_err}");
            }
            return;
        }
    };

    let sink = Arc::new(CloudWatchLogsSink::from_env(config.endpoint_url.as_deref()).await);
    let forwarder = Forwarder::new(Deliverer::new(sink), config.aggregation_group_name.as_str());
    info!(
        "Forwarding subscription deliveries to {}",
        config.aggregation_group_name
    );

    loop {
        let invocation = match runtime.next_invocation().await {
            Ok(invocation) => invocation,
            Err(e) => {
                error!("Failed to fetch next invocation, shutting down: {e}");
                return;
            }
        };

        let span = info_span!("invocation", request_id = %invocation.request_id);
        if let Err(e) = handle_invocation(&runtime, &forwarder, invocation)
            .instrument(span)
            .await
        {
            error!("Failed to report invocation result: {e}");
        }
    }
}

/// Forwards one delivery and reports the outcome. A forwarding failure is
/// reported as an invocation error so the trigger redelivers the batch.
async fn handle_invocation(
    runtime: &RuntimeClient,
    forwarder: &Forwarder,
    invocation: Invocation,
) -> Result<(), RuntimeError> {
    let event: CloudWatchLogsEvent = match serde_json::from_slice(&invocation.payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Invocation payload is not a CloudWatch Logs event: {e}");
            return runtime
                .send_error(&invocation.request_id, "InvalidEvent", &e.to_string())
                .await;
        }
    };

    match forwarder.process(&event).await {
        Ok(()) => runtime.send_response(&invocation.request_id).await,
        Err(e) => {
            error!("Failed to forward logs: {e}");
            runtime
                .send_error(&invocation.request_id, "ForwarderError", &e.to_string())
                .await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use flate2::{write::GzEncoder, Compression};
    use log_forwarder::error::SinkError;
    use log_forwarder::event::{LogEvent, SequenceToken, TargetIdentity};
    use log_forwarder::sink::LogSink;
    use mockito::Server;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSink {
        events: Mutex<usize>,
        fail: bool,
    }

    #[async_trait]
    impl LogSink for CountingSink {
        async fn put_log_events(
            &self,
            _target: &TargetIdentity,
            events: &[LogEvent],
            _token: Option<&SequenceToken>,
        ) -> Result<Option<SequenceToken>, SinkError> {
            if self.fail {
                return Err(SinkError::Other {
                    code: Some("AccessDeniedException".to_string()),
                    message: "not authorized".to_string(),
                });
            }
            *self.events.lock().unwrap() += events.len();
            Ok(Some(SequenceToken::from("next")))
        }

        async fn create_log_stream(&self, _target: &TargetIdentity) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn payload(log_events: &str) -> Vec<u8> {
        let document = format!(
            r#"{{"messageType":"DATA_MESSAGE","owner":"123456789012","logGroup":"/aws/lambda/app","logStream":"s","subscriptionFilters":[],"logEvents":{log_events}}}"#
        );
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(document.as_bytes()).unwrap();
        let data = base64::engine::general_purpose::STANDARD.encode(encoder.finish().unwrap());
        format!(r#"{{"awslogs":{{"data":"{data}"}}}}"#).into_bytes()
    }

    fn invocation(payload: Vec<u8>) -> Invocation {
        Invocation {
            request_id: "req-1".to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn test_successful_invocation_is_acknowledged() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/2018-06-01/runtime/invocation/req-1/response")
            .with_status(202)
            .create_async()
            .await;
        let sink = Arc::new(CountingSink::default());
        let forwarder = Forwarder::new(Deliverer::new(sink.clone()), "/apg/logs-from-spokes");

        handle_invocation(
            &RuntimeClient::new(server.url()),
            &forwarder,
            invocation(payload(
                r#"[{"id":"1","timestamp":1,"message":"a"},{"id":"2","timestamp":2,"message":"b"}]"#,
            )),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(*sink.events.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_reported_as_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/2018-06-01/runtime/invocation/req-1/error")
            .match_header("Lambda-Runtime-Function-Error-Type", "ForwarderError")
            .with_status(202)
            .create_async()
            .await;
        let sink = Arc::new(CountingSink {
            fail: true,
            ..Default::default()
        });
        let forwarder = Forwarder::new(Deliverer::new(sink), "/apg/logs-from-spokes");

        handle_invocation(
            &RuntimeClient::new(server.url()),
            &forwarder,
            invocation(payload(r#"[{"id":"1","timestamp":1,"message":"a"}]"#)),
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reported_as_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/2018-06-01/runtime/invocation/req-1/error")
            .match_header("Lambda-Runtime-Function-Error-Type", "InvalidEvent")
            .with_status(202)
            .create_async()
            .await;
        let forwarder = Forwarder::new(
            Deliverer::new(Arc::new(CountingSink::default())),
            "/apg/logs-from-spokes",
        );

        handle_invocation(
            &RuntimeClient::new(server.url()),
            &forwarder,
            invocation(b"{\"detail\":{}}".to_vec()),
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }
}
