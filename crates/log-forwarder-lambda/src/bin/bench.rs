// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Load generator: writes fixed-size batches of synthetic events straight to
//! a CloudWatch Logs stream, threading the sequence token between calls.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{bail, Context, Result};
use std::env;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use log_forwarder::{
    cloudwatch::CloudWatchLogsSink,
    config::{ENDPOINT_URL_VAR, LOG_LEVEL_VAR},
    error::SinkError,
    event::{LogEvent, SequenceToken, TargetIdentity},
    sink::LogSink,
};

const GROUP_NAME_VAR: &str = "BENCH_GROUP_NAME";
const STREAM_NAME_VAR: &str = "BENCH_STREAM_NAME";
const TOTAL_EVENTS_VAR: &str = "BENCH_EVENTS";
const BATCH_SIZE_VAR: &str = "BENCH_BATCH_SIZE";

const DEFAULT_GROUP_NAME: &str = "/apg/spoke-group";
const DEFAULT_TOTAL_EVENTS: usize = 100_000;
const DEFAULT_BATCH_SIZE: usize = 1_000;

#[derive(Debug)]
struct BenchConfig {
    target: TargetIdentity,
    total_events: usize,
    batch_size: usize,
}

impl BenchConfig {
    fn from_env() -> Result<Self> {
        let group_name =
            env::var(GROUP_NAME_VAR).unwrap_or_else(|_| DEFAULT_GROUP_NAME.to_string());
        let stream_name = env::var(STREAM_NAME_VAR)
            .unwrap_or_else(|_| format!("testing-{}", now_millis() % 1_000_000));
        let total_events = parse_var(TOTAL_EVENTS_VAR, DEFAULT_TOTAL_EVENTS)?;
        let batch_size = parse_var(BATCH_SIZE_VAR, DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            bail!("{BATCH_SIZE_VAR} must be greater than zero");
        }

        Ok(BenchConfig {
            target: TargetIdentity::new(group_name, stream_name),
            total_events,
            batch_size,
        })
    }
}

fn parse_var(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a positive integer, got {val:?}")),
        Err(_) => Ok(default),
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn synthetic_batch(first: usize, len: usize) -> Vec<LogEvent> {
    let timestamp = now_millis();
    (first..first + len)
        .map(|i| LogEvent::new(timestamp, format!("Testing message #{i}")))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(format!("aws_smithy_runtime=warn,aws_config=warn,{log_level}"))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BenchConfig::from_env()?;
    let sink = CloudWatchLogsSink::from_env(env::var(ENDPOINT_URL_VAR).ok().as_deref()).await;
    let target = &config.target;

    match sink.create_log_stream(target).await {
        Ok(()) => info!("Created log stream {target}"),
        Err(SinkError::ResourceAlreadyExists { .. }) => info!("Log stream {target} already exists"),
        Err(e) => return Err(e).with_context(|| format!("Failed to create log stream {target}")),
    }

    let started = Instant::now();
    let mut token: Option<SequenceToken> = None;
    let mut written = 0;
    let mut failed_batches = 0;

    while written < config.total_events {
        let len = config.batch_size.min(config.total_events - written);
        let events = synthetic_batch(written, len);

        match sink.put_log_events(target, &events, token.as_ref()).await {
            Ok(next) => token = next,
            Err(e) => {
                error!("Failed to write events {written}..{}: {e}", written + len);
                failed_batches += 1;
            }
        }
        written += len;
    }

    info!(
        "Wrote {written} events to {target} in {:?} ({failed_batches} failed batches)",
        started.elapsed()
    );
    Ok(())
}
