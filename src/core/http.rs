use reqwest::{Client, RequestBuilder, Response};
use std::ops::Deref;
use std::time::Duration;
use tracing::warn;

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// reqwest client with a per-request timeout and bounded retry.
///
/// Only use `execute_with_retry` for idempotent requests; a retried POST may
/// reach the server twice.
#[derive(Clone, Debug)]
pub struct RetryableClient {
    client: Client,
    max_retries: u32,
}

impl RetryableClient {
    pub fn with_settings(timeout: Duration, max_retries: u32) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_retries,
        })
    }

    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        request.send().await
    }

    // Retries connect errors, timeouts and 5xx responses
    pub async fn execute_with_retry(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let Some(current) = request.try_clone() else {
                return request.send().await;
            };

            let retryable = match current.send().await {
                Ok(response) if response.status().is_server_error() => {
                    if attempt >= self.max_retries {
                        return Ok(response);
                    }
                    format!("status {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries => {
                    e.to_string()
                }
                Err(e) => return Err(e),
            };

            attempt += 1;
            warn!(attempt = attempt, reason = %retryable, "Retrying HTTP request");
            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }
    }
}

impl Deref for RetryableClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
