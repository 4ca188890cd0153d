use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{header, Response};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

/// Disguises the client as a common browser; the station page refuses
/// obvious bots.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:71.0) Gecko/20100101 Firefox/71.0";

pub struct HttpClient {
    pub client: ClientWithMiddleware,
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HttpClient {
    /// Builds a client that retries transient transport errors a couple of
    /// times on its own. Credentials are never stored in the client; each
    /// request carries the session's cookies explicitly.
    pub fn new() -> reqwest::Result<HttpClient> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.client
            .get(url)
            .send()
            .await?
            .text()
            .await
            .map_err(|e| e.into())
    }

    pub async fn get_with_referer(
        &self,
        url: &str,
        referer: &str,
    ) -> Result<Response, DownloadError> {
        Ok(self
            .client
            .get(url)
            .header(header::REFERER, referer)
            .send()
            .await?)
    }

    pub async fn get_with_cookie(&self, url: &str, cookie: &str) -> Result<Response, DownloadError> {
        Ok(self
            .client
            .get(url)
            .header(header::COOKIE, cookie)
            .send()
            .await?)
    }
}

/// Time left until `instant`, zero if it already passed.
pub fn until(instant: &DateTime<FixedOffset>) -> Duration {
    (*instant - Utc::now().fixed_offset())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

pub fn format_bytes(bytes: u64) -> String {
    let mut bytes = bytes as f64;
    let mut suffix = "B";

    for next in ["KiB", "MiB", "GiB", "TiB"] {
        if bytes <= 1024.0 {
            break;
        }
        bytes /= 1024.0;
        suffix = next;
    }

    format!("{:.2} {}", bytes, suffix)
}
