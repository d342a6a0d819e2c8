//! Outbound HTTP calls: generation, upscaling and source image downloads.

use std::time::Duration;

use crate::constants::USER_AGENT;

pub mod download;
pub mod novelai;
pub mod upscale;

/// Builds the shared HTTP client. Every call goes out with the browser user
/// agent both services expect; nothing is retried.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}
