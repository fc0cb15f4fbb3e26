use std::time::Duration;

use anyhow::{Context as _, anyhow};
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use url::Url;

/// Attempts for page downloads; status polls make a single attempt per tick.
const PAGE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &Url) -> anyhow::Result<String> {
        let bytes = self.get_bytes(url, PAGE_ATTEMPTS).await?;
        String::from_utf8(bytes.to_vec()).with_context(|| format!("body of {} is not utf-8", url))
    }

    pub async fn get_json(&self, url: &Url) -> anyhow::Result<serde_json::Value> {
        let bytes = self.get_bytes(url, 1).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse json from {}", url))
    }

    async fn get_bytes(&self, url: &Url, max_attempts: usize) -> anyhow::Result<Bytes> {
        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=max_attempts {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("GET {}", url))?;

            let status = resp.status();
            if status.is_success() {
                return resp.bytes().await.context("read response body");
            }

            if (status.as_u16() == 429 || status.as_u16() == 503) && attempt < max_attempts {
                let wait = retry_after_duration(resp.headers()).unwrap_or(backoff);
                tracing::warn!(
                    %status,
                    attempt,
                    wait_ms = wait.as_millis(),
                    "throttled; backing off"
                );
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(Duration::from_secs(10));
                continue;
            }

            return Err(anyhow!("GET {} failed with status {}", url, status));
        }

        Err(anyhow!("GET {} failed after retries", url))
    }
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_duration(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after_duration(&headers), Some(Duration::from_secs(3)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after_duration(&headers), None);
    }
}
