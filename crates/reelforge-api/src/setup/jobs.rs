//! Background jobs: processing sweep and upload session reaper

use std::time::Duration;

use reelforge_core::Config;
use reelforge_worker::{ProcessingSweep, SessionReaper};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Handles to the spawned background loops, stopped together on shutdown.
pub struct BackgroundJobs {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundJobs {
    pub fn start(config: &Config, state: &AppState) -> Self {
        let shutdown = CancellationToken::new();
        let mut handles = Vec::new();

        let reaper = SessionReaper::new(
            state.upload.sessions.clone(),
            Duration::from_secs(config.upload().reap_interval_secs.max(1)),
        );
        handles.push(reaper.start(shutdown.child_token()));

        let processing = config.processing();
        if processing.sweep_enabled {
            let sweep = ProcessingSweep::new(
                state.processing.machine.clone(),
                processing.sweep_batch_limit,
                Duration::from_secs(processing.sweep_interval_secs),
            );
            handles.push(sweep.start(shutdown.child_token()));
        } else {
            tracing::info!("Background processing sweep disabled (SWEEP_ENABLED=false)");
        }

        Self { shutdown, handles }
    }

    /// Signal every loop to stop and wait for them to exit.
    ///
    /// A sweep run in progress finishes its current batch first.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background job terminated abnormally");
            }
        }
        tracing::info!("Background jobs stopped");
    }
}
