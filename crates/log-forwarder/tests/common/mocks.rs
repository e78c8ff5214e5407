// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory sink that enforces sequencing like CloudWatch Logs

use async_trait::async_trait;
use log_forwarder::error::SinkError;
use log_forwarder::event::{LogEvent, SequenceToken, TargetIdentity};
use log_forwarder::sink::LogSink;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Stream {
    events: Vec<LogEvent>,
    appends: u64,
}

impl Stream {
    fn expected_token(&self) -> Option<SequenceToken> {
        (self.appends > 0).then(|| SequenceToken::new(format!("token-{}", self.appends)))
    }
}

#[derive(Debug, Clone)]
pub struct PutCall {
    pub target: TargetIdentity,
    pub event_count: usize,
    pub token: Option<SequenceToken>,
}

/// Mock sink keeping one stream per target and rejecting stale tokens
#[derive(Debug, Default)]
pub struct InMemorySink {
    streams: Mutex<HashMap<TargetIdentity, Stream>>,
    injected_failures: Mutex<VecDeque<SinkError>>,
    failures_by_call: Mutex<HashMap<usize, SinkError>>,
    puts: Mutex<Vec<PutCall>>,
    creates: Mutex<Vec<TargetIdentity>>,
}

#[allow(dead_code)]
impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing stream that has already seen `appends` appends
    pub fn with_stream(self, target: &TargetIdentity, appends: u64) -> Self {
        self.streams.lock().unwrap().insert(
            target.clone(),
            Stream {
                events: Vec::new(),
                appends,
            },
        );
        self
    }

    /// Fail the next puts with these errors, in order, before any other check
    pub fn fail_next(self, failures: Vec<SinkError>) -> Self {
        self.injected_failures.lock().unwrap().extend(failures);
        self
    }

    /// Fail the put with this zero-based call index
    pub fn fail_put(self, call_index: usize, failure: SinkError) -> Self {
        self.failures_by_call
            .lock()
            .unwrap()
            .insert(call_index, failure);
        self
    }

    pub fn events(&self, target: &TargetIdentity) -> Vec<LogEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(target)
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<TargetIdentity> {
        self.creates.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for InMemorySink {
    async fn put_log_events(
        &self,
        target: &TargetIdentity,
        events: &[LogEvent],
        token: Option<&SequenceToken>,
    ) -> Result<Option<SequenceToken>, SinkError> {
        let call_index = {
            let mut puts = self.puts.lock().unwrap();
            puts.push(PutCall {
                target: target.clone(),
                event_count: events.len(),
                token: token.cloned(),
            });
            puts.len() - 1
        };

        if let Some(failure) = self.injected_failures.lock().unwrap().pop_front() {
            return Err(failure);
        }
        if let Some(failure) = self.failures_by_call.lock().unwrap().remove(&call_index) {
            return Err(failure);
        }

        let mut streams = self.streams.lock().unwrap();
        let Some(stream) = streams.get_mut(target) else {
            return Err(SinkError::ResourceNotFound {
                message: "The specified log stream does not exist.".to_string(),
            });
        };

        let expected = stream.expected_token();
        if expected.as_ref() != token {
            let expected = expected.map_or_else(|| "null".to_string(), |t| t.to_string());
            return Err(SinkError::InvalidSequenceToken {
                message: format!(
                    "The given sequenceToken is invalid. The next expected sequenceToken is: {expected}"
                ),
            });
        }

        stream.events.extend_from_slice(events);
        stream.appends += 1;
        Ok(stream.expected_token())
    }

    async fn create_log_stream(&self, target: &TargetIdentity) -> Result<(), SinkError> {
        self.creates.lock().unwrap().push(target.clone());
        let mut streams = self.streams.lock().unwrap();
        if streams.contains_key(target) {
            return Err(SinkError::ResourceAlreadyExists {
                message: "The specified log stream already exists".to_string(),
            });
        }
        streams.insert(target.clone(), Stream::default());
        Ok(())
    }
}
