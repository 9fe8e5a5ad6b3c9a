//! Reelforge Worker Library
//!
//! Everything that runs off the request path: the bounded queue that receives
//! freshly merged uploads, the periodic sweep that retries `PENDING`/`FAILED`
//! artifacts, and the reaper that evicts abandoned upload sessions.

pub mod queue;
pub mod reaper;
pub mod sweep;

#[cfg(test)]
mod test_support;

pub use queue::ProcessingJobQueue;
pub use reaper::SessionReaper;
pub use sweep::{ProcessingSweep, SweepOutcome};
