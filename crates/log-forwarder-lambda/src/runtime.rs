// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Minimal client for the Lambda Runtime API.
//!
//! The function polls `invocation/next` for work, then reports either a
//! response or an error for that request id. Errors make the trigger apply its
//! own redelivery policy to the subscription delivery.

use reqwest::StatusCode;
use serde::Serialize;
use std::env;
use thiserror::Error as ThisError;
use tracing::debug;

const RUNTIME_API_VAR: &str = "AWS_LAMBDA_RUNTIME_API";
const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

#[derive(Debug, ThisError)]
pub enum RuntimeError {
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    MissingEndpoint,

    #[error("Runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Runtime API returned {status} for {path}")]
    UnexpectedStatus { status: StatusCode, path: String },

    #[error("Invocation is missing the Lambda-Runtime-Aws-Request-Id header")]
    MissingRequestId,
}

/// One unit of work handed out by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub request_id: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorRequest<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        RuntimeClient {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Result<Self, RuntimeError> {
        let host = env::var(RUNTIME_API_VAR).map_err(|_| RuntimeError::MissingEndpoint)?;
        Ok(RuntimeClient::new(format!("http://{host}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/runtime/{path}", self.base_url)
    }

    /// Blocks until the runtime hands out the next invocation.
    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let path = "invocation/next";
        let resp = self.client.get(self.url(path)).send().await?;
        if !resp.status().is_success() {
            return Err(RuntimeError::UnexpectedStatus {
                status: resp.status(),
                path: path.to_string(),
            });
        }

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeError::MissingRequestId)?;
        let payload = resp.bytes().await?.to_vec();
        debug!("Received invocation {request_id} ({} bytes)", payload.len());

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    pub async fn send_response(&self, request_id: &str) -> Result<(), RuntimeError> {
        let path = format!("invocation/{request_id}/response");
        let resp = self
            .client
            .post(self.url(&path))
            .body("null")
            .send()
            .await?;
        Self::check(resp.status(), path)
    }

    pub async fn send_error(
        &self,
        request_id: &str,
        error_type: &str,
        error_message: &str,
    ) -> Result<(), RuntimeError> {
        self.post_error(format!("invocation/{request_id}/error"), error_type, error_message)
            .await
    }

    /// Reports a failure that happened before the first invocation.
    pub async fn send_init_error(
        &self,
        error_type: &str,
        error_message: &str,
    ) -> Result<(), RuntimeError> {
        self.post_error("init/error".to_string(), error_type, error_message)
            .await
    }

    async fn post_error(
        &self,
        path: String,
        error_type: &str,
        error_message: &str,
    ) -> Result<(), RuntimeError> {
        let resp = self
            .client
            .post(self.url(&path))
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&ErrorRequest {
                error_message,
                error_type,
            })
            .send()
            .await?;
        Self::check(resp.status(), path)
    }

    fn check(status: StatusCode, path: String) -> Result<(), RuntimeError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(RuntimeError::UnexpectedStatus { status, path })
        }
    }
}
