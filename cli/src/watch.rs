//! Caller-side polling for tracks submitted without waiting for audio.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::{client::MusicGenerator, error::GenerationError, track::Track};

const MAX_BACKOFF_STEPS: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), max_attempts: 60 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// Every track has audio or an error.
    Settled(Vec<Track>),
    /// Attempts ran out; the last snapshot is returned.
    Pending(Vec<Track>),
}

impl WatchOutcome {
    pub fn tracks(&self) -> &[Track] {
        match self {
            Self::Settled(tracks) | Self::Pending(tracks) => tracks,
        }
    }

    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            Self::Settled(tracks) | Self::Pending(tracks) => tracks,
        }
    }
}

/// Polls `fetch_status` until every track is settled or attempts run out.
///
/// The wait before poll `n` is `interval * min(n, 5)`. Status strings are not
/// interpreted. A failed poll ends the watch with that error.
pub async fn watch_until_settled<G, F>(
    generator: &G,
    ids: &[String],
    options: WatchOptions,
    mut on_update: F,
) -> Result<WatchOutcome, GenerationError>
where
    G: MusicGenerator + ?Sized,
    F: FnMut(u32, &[Track]),
{
    let mut latest = Vec::new();
    for attempt in 1..=options.max_attempts {
        let delay = options.interval.saturating_mul(attempt.min(MAX_BACKOFF_STEPS));
        sleep(delay).await;

        latest = generator.fetch_status(ids).await?;
        on_update(attempt, &latest);

        let settled = latest.iter().filter(|track| track.is_settled()).count();
        debug!(attempt, settled, total = latest.len(), "polled track status");
        if !latest.is_empty() && settled == latest.len() {
            info!(attempt, "all tracks settled");
            return Ok(WatchOutcome::Settled(latest));
        }
    }
    Ok(WatchOutcome::Pending(latest))
}
