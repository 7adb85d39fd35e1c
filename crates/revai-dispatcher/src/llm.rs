use async_trait::async_trait;

/// One call to a backing LLM provider, as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct LLMRequest {
    pub provider: String,
    pub payload: Vec<u8>,
}

/// The provider's reply, carrying the token accounting the cost tracker needs.
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub output: Vec<u8>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Classification of an `LLMCaller` failure, used to drive retry and
/// circuit-breaker decisions.
#[derive(Debug, Clone)]
pub enum LLMError {
    /// Retryable: timeout, 5xx, connection reset.
    Transient(String),
    /// Non-retryable: auth, schema, payload rejected by the provider.
    Permanent(String),
    /// The caller's context was cancelled mid-call.
    Cancelled,
}

impl LLMError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LLMError::Transient(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LLMError::Cancelled)
    }
}

impl std::fmt::Display for LLMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMError::Transient(msg) => write!(f, "transient LLM error: {msg}"),
            LLMError::Permanent(msg) => write!(f, "permanent LLM error: {msg}"),
            LLMError::Cancelled => write!(f, "LLM call cancelled"),
        }
    }
}

impl std::error::Error for LLMError {}

/// The sole outbound dependency of the coordination core: one call to a
/// backing LLM provider.
///
/// Out of scope for this crate: prompt construction, response parsing, and
/// the transport itself. Implementations typically wrap an HTTP client.
#[async_trait]
pub trait LLMCaller: Send + Sync {
    async fn call(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A caller that fails a fixed number of times with a transient error,
    /// then succeeds.
    pub struct FlakyCaller {
        pub fail_times: usize,
        pub calls: AtomicUsize,
    }

    impl FlakyCaller {
        pub fn new(fail_times: usize) -> Self {
            Self {
                fail_times,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMCaller for FlakyCaller {
        async fn call(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                Err(LLMError::Transient("simulated failure".to_string()))
            } else {
                Ok(LLMResponse {
                    output: b"ok".to_vec(),
                    input_tokens: 100,
                    output_tokens: 50,
                })
            }
        }
    }

    /// A caller that always fails with a permanent error.
    pub struct AlwaysPermanent;

    #[async_trait]
    impl LLMCaller for AlwaysPermanent {
        async fn call(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Err(LLMError::Permanent("bad request".to_string()))
        }
    }

    /// A caller that always succeeds.
    pub struct AlwaysOk;

    #[async_trait]
    impl LLMCaller for AlwaysOk {
        async fn call(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse {
                output: b"ok".to_vec(),
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    /// A caller that always fails with a transient error.
    pub struct AlwaysTransient;

    #[async_trait]
    impl LLMCaller for AlwaysTransient {
        async fn call(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Err(LLMError::Transient("always down".to_string()))
        }
    }
}
