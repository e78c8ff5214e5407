// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Recovery of the expected sequence token from a stale-token rejection.
//!
//! The sink does not return the expected token as a structured field that all
//! clients can rely on; it embeds it in the error message:
//!
//! ```text
//! The given sequenceToken is invalid. The next expected sequenceToken is: 4959030211...
//! ```
//!
//! The pattern lives behind [`ExpectedTokenExtractor`] so it can be swapped or
//! tested without a network.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::TokenParseError;
use crate::event::SequenceToken;

/// Default pattern. The first capture group holds the token.
pub const EXPECTED_TOKEN_PATTERN: &str =
    r"The given sequenceToken is invalid\. The next expected sequenceToken is: (.*)";

/// Reported in place of a token when the stream has never been written to.
const NULL_TOKEN: &str = "null";

pub trait ExpectedTokenExtractor: Send + Sync {
    /// Reads the expected token out of `error_text`.
    ///
    /// `Ok(None)` means the sink expects no token at all.
    fn extract(&self, error_text: &str) -> Result<Option<SequenceToken>, TokenParseError>;
}

/// Extracts the token with a regular expression whose first capture group is
/// the token.
#[derive(Debug, Clone)]
pub struct PatternTokenExtractor {
    pattern: Regex,
}

impl PatternTokenExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(PatternTokenExtractor {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Default for PatternTokenExtractor {
    fn default() -> Self {
        static DEFAULT_PATTERN: OnceLock<Regex> = OnceLock::new();
        #[allow(clippy::expect_used)]
        let pattern = DEFAULT_PATTERN
            .get_or_init(|| Regex::new(EXPECTED_TOKEN_PATTERN).expect("invalid token pattern"))
            .clone();
        PatternTokenExtractor { pattern }
    }
}

impl ExpectedTokenExtractor for PatternTokenExtractor {
    fn extract(&self, error_text: &str) -> Result<Option<SequenceToken>, TokenParseError> {
        let token = self
            .pattern
            .captures(error_text)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TokenParseError {
                message: error_text.to_string(),
            })?;

        if token == NULL_TOKEN {
            return Ok(None);
        }
        Ok(Some(SequenceToken::from(token)))
    }
}
