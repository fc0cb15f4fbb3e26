use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use url::Url;

use crate::poller::RunStatus;

/// Spinner for `watch`: ticks, failures and the last status seen.
pub struct WatchProgress {
    enabled: bool,
    start: Instant,
    spinner: ProgressBar,
    ticks: AtomicU64,
    failures: AtomicU64,
}

impl WatchProgress {
    pub fn new(enabled: bool, status_url: &Url) -> Arc<Self> {
        let start = Instant::now();

        if !enabled {
            return Arc::new(Self {
                enabled: false,
                start,
                spinner: ProgressBar::hidden(),
                ticks: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            });
        }

        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(format!("waiting on {status_url}"));

        Arc::new(Self {
            enabled: true,
            start,
            spinner,
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    pub fn polled(&self, status: &RunStatus) {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            let failures = self.failures.load(Ordering::Relaxed);
            self.spinner.set_message(format!(
                "run {} | polls {ticks} | failed polls {failures}",
                status.label()
            ));
        }
    }

    pub fn poll_failed(&self) {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            self.spinner.set_message(format!(
                "status unavailable | polls {ticks} | failed polls {failures}"
            ));
        }
    }

    pub fn finish(&self, msg: &str) {
        if !self.enabled {
            return;
        }
        self.spinner.finish_with_message(format!(
            "{msg} after {}",
            HumanDuration(self.start.elapsed())
        ));
    }
}
