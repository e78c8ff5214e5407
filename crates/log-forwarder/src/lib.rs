// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards CloudWatch Logs subscription deliveries into a central log group.
//!
//! ```text
//!   subscription delivery
//!            │
//!            v
//!     ┌─────────────┐
//!     │  envelope   │  base64 → gunzip → JSON
//!     └──────┬──────┘
//!            v
//!     ┌─────────────┐
//!     │ partitioner │  size / count / time span limits
//!     └──────┬──────┘
//!            v
//!     ┌─────────────┐
//!     │  deliverer  │  retry, token resync, stream creation
//!     └──────┬──────┘
//!            v
//!        LogSink (CloudWatch Logs)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod cloudwatch;
pub mod config;
pub mod constants;
pub mod deliverer;
pub mod envelope;
pub mod error;
pub mod event;
pub mod forwarder;
pub mod partitioner;
pub mod sink;
pub mod token;
