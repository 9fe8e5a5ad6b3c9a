//! Session reaper
//!
//! Evicts upload sessions older than the configured TTL on a fixed interval,
//! releasing any disk-resident chunks they still hold.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use reelforge_upload::UploadSessionStore;

pub struct SessionReaper {
    store: Arc<UploadSessionStore>,
    interval: Duration,
}

impl SessionReaper {
    pub fn new(store: Arc<UploadSessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run_once(&self) -> usize {
        let reaped = self.store.reap_expired().await;
        if reaped > 0 {
            tracing::info!(
                reaped = reaped,
                remaining = self.store.len(),
                "Reaped expired upload sessions"
            );
        }
        reaped
    }

    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Starting upload session reaper"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }

            tracing::info!("Upload session reaper stopped");
        })
    }
}
