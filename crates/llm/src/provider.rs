//! LLM Provider Trait
//!
//! Defines the common interface for all LLM providers.

use async_trait::async_trait;

use super::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};

/// Trait that all LLM providers must implement.
///
/// Reasoning only: providers return text and never execute anything.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send a conversation and get a complete response.
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error() {
        let err = missing_api_key_error("openai");
        match err {
            LlmError::AuthenticationFailed { message } => {
                assert!(message.contains("openai"));
            }
            _ => panic!("Expected AuthenticationFailed"),
        }
    }

    #[test]
    fn test_parse_http_error() {
        let err = parse_http_error(401, "unauthorized", "openai");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));

        let err = parse_http_error(429, "rate limited", "openai");
        assert!(matches!(err, LlmError::RateLimited { .. }));

        let err = parse_http_error(503, "unavailable", "openai");
        assert!(matches!(err, LlmError::ServerError { status: Some(503), .. }));

        let err = parse_http_error(418, "teapot", "openai");
        assert!(matches!(err, LlmError::Other { .. }));
    }
}
