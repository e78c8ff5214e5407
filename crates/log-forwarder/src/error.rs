// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while reading configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be defined")]
    MissingVar(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while decoding a subscription envelope
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Envelope data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Envelope data could not be decompressed: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("Envelope payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a log sink, classified by how the deliverer reacts to them
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The sequence token was stale. The message names the expected token.
    #[error("InvalidSequenceTokenException: {message}")]
    InvalidSequenceToken { message: String },

    #[error("ResourceNotFoundException: {message}")]
    ResourceNotFound { message: String },

    #[error("ResourceAlreadyExistsException: {message}")]
    ResourceAlreadyExists { message: String },

    #[error("{}: {message}", .code.as_deref().unwrap_or("UnknownError"))]
    Other {
        code: Option<String>,
        message: String,
    },
}

/// The expected token could not be read out of a rejection message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not parse sequence token from error message: {message}")]
pub struct TokenParseError {
    pub message: String,
}

/// Fatal outcome of delivering one batch
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    UnparseableSequenceToken(#[from] TokenParseError),

    #[error("Failed to create log stream: {0}")]
    CreateTargetFailed(#[source] SinkError),

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: SinkError,
    },
}

/// Errors that abort a whole invocation
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Failed to deliver batch {batch}: {source}")]
    Delivery {
        batch: usize,
        #[source]
        source: DeliveryError,
    },
}
