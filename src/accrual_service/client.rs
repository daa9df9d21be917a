use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use crate::accrual_service::AccrualResponse;
use crate::config::AccrualConfig;
use crate::error::{Error, Result};
use crate::interfaces::status_source::StatusSource;
use crate::types::order_number::OrderNumber;

/// HTTP client for the external accrual service.
///
/// Every request is bounded by the configured timeout. Transport failures
/// (timeouts, refused connections) are retried `retry_count` times with a
/// fixed pause in between; an HTTP answer of any status is final.
pub struct AccrualClient {
    client: Client,
    base_url: String,
    retry_count: u32,
    retry_wait: Duration,
}

impl AccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(AccrualClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_count: config.retry_count,
            retry_wait: config.retry_wait(),
        })
    }

    fn order_url(&self, order_number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, order_number)
    }

    async fn get_with_retry(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry_count && is_transient(&e) => {
                    attempt += 1;
                    tracing::debug!(url, attempt, error = %e, "Accrual request failed, retrying");
                    tokio::time::sleep(self.retry_wait).await;
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl StatusSource for AccrualClient {
    async fn order_status(&self, order_number: &OrderNumber) -> Result<AccrualResponse> {
        let response = self.get_with_retry(&self.order_url(order_number)).await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let decoded: AccrualResponse = serde_json::from_slice(&body)
                    .map_err(|e| Error::Decode(e.to_string()))?;

                if decoded.order != order_number.as_str() {
                    return Err(Error::Decode(format!(
                        "asked for order {}, got {}",
                        order_number, decoded.order
                    )));
                }
                Ok(decoded)
            }
            StatusCode::NO_CONTENT => Err(Error::OrderNotRegistered(order_number.clone())),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited {
                order: order_number.clone(),
                retry_after: retry_after(&response),
            }),
            other => Err(Error::UnknownStatusCode {
                order: order_number.clone(),
                status: other.as_u16(),
            }),
        }
    }
}
