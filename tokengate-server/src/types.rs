//! Response bodies shared by the HTTP handlers
//!
//! # Example
//!
//! A denied request receives:
//!
//! ```json
//! {
//!   "error": "rate limit exceeded",
//!   "retryAfter": 2
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Body returned with `429 Too Many Requests`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub error: String,
    /// Whole seconds until the client can expect to be admitted
    pub retry_after: u64,
}

impl RateLimitedResponse {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "rate limit exceeded".to_string(),
            retry_after,
        }
    }
}
