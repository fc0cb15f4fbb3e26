use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde_json::Value;
use tokio::time::{Instant, MissedTickBehavior};
use url::Url;

use crate::config::StatusMarkers;
use crate::fetcher::Fetcher;
use crate::page::Page;
use crate::progress::WatchProgress;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1500);

/// Result code the status endpoint reports while a run is in progress.
const RUNNING: f64 = 1.0;
const SUCCEEDED: f64 = 2.0;
const FAILED: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Other(Value),
}

impl RunStatus {
    /// Numbers, numeric strings and `true` compare numerically. Arrays, objects
    /// and non-decimal strings such as `"0x1"` are never running.
    pub fn from_value(value: &Value) -> Self {
        match loose_number(value) {
            Some(n) if n == RUNNING => RunStatus::Running,
            Some(n) if n == SUCCEEDED => RunStatus::Succeeded,
            Some(n) if n == FAILED => RunStatus::Failed,
            _ => RunStatus::Other(value.clone()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn label(&self) -> String {
        match self {
            RunStatus::Running => "running".to_string(),
            RunStatus::Succeeded => "succeeded".to_string(),
            RunStatus::Failed => "failed".to_string(),
            RunStatus::Other(v) => format!("status {v}"),
        }
    }
}

fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// The status URL advertised by the page, resolved against the page's own URL.
pub fn status_url_from_page<P: Page>(
    page: &P,
    markers: &StatusMarkers,
    page_url: Option<&Url>,
) -> anyhow::Result<Url> {
    let el = page
        .element_by_id(&markers.element_id)
        .with_context(|| format!("page has no #{} element", markers.element_id))?;
    let raw = page
        .attr(&el, &markers.url_attribute)
        .with_context(|| format!("#{} has no {}", markers.element_id, markers.url_attribute))?;
    let raw = raw.trim();

    match page_url {
        Some(base) => base
            .join(raw)
            .with_context(|| format!("resolve status url {raw}")),
        None => Url::parse(raw).with_context(|| format!("parse status url {raw}")),
    }
}

/// What happens once the run is no longer in progress.
pub trait Reload {
    fn reload(&mut self, status: &RunStatus) -> impl Future<Output = anyhow::Result<()>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Reloaded { ticks: u64, status: RunStatus },
    TickLimit { ticks: u64 },
}

pub struct StatusPoller {
    fetcher: Fetcher,
    url: Url,
    interval: Duration,
    progress: Option<Arc<WatchProgress>>,
}

impl StatusPoller {
    pub fn new(
        fetcher: Fetcher,
        url: Url,
        interval: Duration,
        progress: Option<Arc<WatchProgress>>,
    ) -> Self {
        Self {
            fetcher,
            url,
            interval: interval.max(Duration::from_millis(1)),
            progress,
        }
    }

    pub async fn check(&self) -> anyhow::Result<RunStatus> {
        let value = self.fetcher.get_json(&self.url).await?;
        Ok(RunStatus::from_value(&value))
    }

    /// Polls until the run leaves the running state, then reloads once.
    ///
    /// The first poll happens one interval after the call. Failed polls are
    /// logged and retried on the next tick.
    pub async fn run<R: Reload>(
        &self,
        reload: &mut R,
        max_ticks: Option<u64>,
    ) -> anyhow::Result<PollOutcome> {
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        loop {
            interval.tick().await;
            ticks += 1;

            match self.check().await {
                Ok(status) if status.is_running() => {
                    tracing::debug!(url = %self.url, ticks, "run still in progress");
                    if let Some(p) = &self.progress {
                        p.polled(&status);
                    }
                }
                Ok(status) => {
                    tracing::info!(url = %self.url, ticks, status = %status.label(), "run status changed; reloading");
                    if let Some(p) = &self.progress {
                        p.polled(&status);
                    }
                    reload.reload(&status).await.context("reload page")?;
                    return Ok(PollOutcome::Reloaded { ticks, status });
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, ticks, error = %format!("{e:#}"), "status poll failed; retrying");
                    if let Some(p) = &self.progress {
                        p.poll_failed();
                    }
                }
            }

            if max_ticks.is_some_and(|max| ticks >= max) {
                return Ok(PollOutcome::TickLimit { ticks });
            }
        }
    }
}
