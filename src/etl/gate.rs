// file: src/etl/gate.rs
// description: availability gate polling a bucket until an object appears
// reference: poll/timeout sensor over object existence

use crate::error::{PipelineError, Result};
use crate::storage::ObjectStore;
use std::time::Duration;
use tracing::{debug, info};

/// Blocks until an expected object appears or the timeout window closes.
///
/// The gate probes once per interval starting immediately, so a 60s window
/// at 5s intervals means exactly 12 probes before giving up.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityGate {
    interval: Duration,
    timeout: Duration,
}

impl AvailabilityGate {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn max_polls(&self) -> u32 {
        let interval = self.interval.as_secs().max(1);
        (self.timeout.as_secs() / interval).max(1) as u32
    }

    /// Poll `bucket/key` until it exists. Returns the 1-based poll number
    /// that observed the object, or `StagingTimeout` once the window is
    /// spent with no sighting.
    pub async fn wait_for(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<u32> {
        let max_polls = self.max_polls();

        for poll in 1..=max_polls {
            if store.exists(bucket, key).await? {
                info!("Gate observed {}/{} on poll {}", bucket, key, poll);
                return Ok(poll);
            }
            debug!(
                "Gate poll {}/{} found no {}/{}",
                poll, max_polls, bucket, key
            );
            tokio::time::sleep(self.interval).await;
        }

        Err(PipelineError::StagingTimeout {
            bucket: bucket.to_string(),
            key: key.to_string(),
            waited_secs: self.timeout.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::time::Instant;

    const KEY: &str = "response_data_11022025010203.csv";

    #[tokio::test(start_paused = true)]
    async fn test_gate_succeeds_immediately_when_object_present() {
        let store = MemoryStore::new();
        store
            .put("transformed", KEY, b"a,b\n1,2\n".to_vec(), "text/csv")
            .await
            .unwrap();

        let gate = AvailabilityGate::new(Duration::from_secs(5), Duration::from_secs(60));
        let start = Instant::now();
        let poll = gate.wait_for(&store, "transformed", KEY).await.unwrap();

        assert_eq!(poll, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_times_out_after_twelve_polls() {
        let store = MemoryStore::new();
        let gate = AvailabilityGate::new(Duration::from_secs(5), Duration::from_secs(60));
        assert_eq!(gate.max_polls(), 12);

        let start = Instant::now();
        let err = gate.wait_for(&store, "transformed", KEY).await.unwrap_err();

        match err {
            PipelineError::StagingTimeout { waited_secs, .. } => assert_eq!(waited_secs, 60),
            other => panic!("expected StagingTimeout, got {}", other),
        }
        // 12 polls with a 5s sleep after each: the window closes at 60s.
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_sees_object_on_first_poll_after_arrival() {
        let store = Arc::new(MemoryStore::new());
        let gate = AvailabilityGate::new(Duration::from_secs(5), Duration::from_secs(60));

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            writer
                .put("transformed", KEY, b"a,b\n1,2\n".to_vec(), "text/csv")
                .await
                .unwrap();
        });

        let start = Instant::now();
        let poll = gate.wait_for(store.as_ref(), "transformed", KEY).await.unwrap();

        // Object lands at t=12s; the first sighting is the poll at t=15s.
        assert_eq!(poll, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }
}
