// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One invocation end to end: decode, partition, deliver in order.

use tracing::{debug, info};

use crate::deliverer::Deliverer;
use crate::envelope::{CloudWatchLogsEvent, MessageType};
use crate::error::ForwarderError;
use crate::event::{LogEvent, SequenceToken, TargetIdentity};
use crate::partitioner::{partition, BatchLimits};

#[derive(Clone)]
pub struct Forwarder {
    deliverer: Deliverer,
    group_name: String,
    limits: BatchLimits,
}

impl Forwarder {
    #[must_use]
    pub fn new(deliverer: Deliverer, group_name: impl Into<String>) -> Self {
        Forwarder {
            deliverer,
            group_name: group_name.into(),
            limits: BatchLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Handles one subscription delivery.
    ///
    /// Control messages and empty deliveries are acknowledged without
    /// touching the sink. The first batch that cannot be delivered aborts the
    /// invocation; batches delivered before it stay delivered.
    pub async fn process(&self, event: &CloudWatchLogsEvent) -> Result<(), ForwarderError> {
        let data = event.decode()?;

        if data.message_type != MessageType::Data {
            info!("Received {}. Expected DATA_MESSAGE", data.message_type);
            return Ok(());
        }

        info!(
            "Received {} log events for {} in {}",
            data.log_events.len(),
            data.log_stream,
            data.log_group
        );
        if data.log_events.is_empty() {
            return Ok(());
        }

        let target = TargetIdentity::new(self.group_name.as_str(), data.destination_stream_name());
        self.forward(&target, &data.log_events, None).await?;
        Ok(())
    }

    /// Partitions `events` and delivers every batch to `target` in order,
    /// threading the sequence token from one batch to the next.
    ///
    /// Returns the token left by the last batch.
    pub async fn forward(
        &self,
        target: &TargetIdentity,
        events: &[LogEvent],
        token: Option<SequenceToken>,
    ) -> Result<Option<SequenceToken>, ForwarderError> {
        let batches = partition(events, &self.limits);
        debug!("Split {} events into {} batches", events.len(), batches.len());

        let mut token = token;
        for (index, batch) in batches.iter().enumerate() {
            info!(
                "Writing count of {} size of {}",
                batch.len(),
                batch.encoded_size()
            );
            token = self
                .deliverer
                .send(batch, target, token)
                .await
                .map_err(|source| ForwarderError::Delivery {
                    batch: index,
                    source,
                })?;
        }
        Ok(token)
    }
}
