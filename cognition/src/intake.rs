//! Signal intake - FIFO staging between producers and ticks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{trace, warn};

use crate::config::IntakeConfig;
use crate::types::{Result, Signal};

/// Buffer that accepts signals from many producers and hands them off in
/// whole batches.
///
/// A drained signal is never delivered again.
pub struct SignalIntake {
    /// Configuration
    config: IntakeConfig,
    /// Signals in arrival order
    buffer: Arc<RwLock<VecDeque<Signal>>>,
    /// Signals discarded because the buffer was full
    dropped: Arc<AtomicU64>,
}

impl SignalIntake {
    /// Create a new intake with default configuration.
    pub fn new() -> Self {
        Self::with_config(IntakeConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: IntakeConfig) -> Self {
        Self {
            config,
            buffer: Arc::new(RwLock::new(VecDeque::new())),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a signal, rejecting one whose fields were set out of range.
    pub async fn ingest(&self, signal: Signal) -> Result<()> {
        signal.check().map_err(|e| {
            warn!(signal_id = %signal.id, intensity = signal.intensity, "Rejecting signal");
            e
        })?;

        trace!(
            signal_id = %signal.id,
            origin = ?signal.origin,
            domain = ?signal.domain,
            "Buffering signal"
        );

        let mut buffer = self.buffer.write().await;
        buffer.push_back(signal);

        while buffer.len() > self.config.buffer_size {
            if let Some(evicted) = buffer.pop_front() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    signal_id = %evicted.id,
                    buffer_size = self.config.buffer_size,
                    "Intake buffer full, dropping oldest signal"
                );
            }
        }
        Ok(())
    }

    /// Take every buffered signal in arrival order, leaving the buffer empty.
    pub async fn drain(&self) -> Vec<Signal> {
        let mut buffer = self.buffer.write().await;
        buffer.drain(..).collect()
    }

    /// Number of buffered signals.
    pub async fn len(&self) -> usize {
        self.buffer.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.read().await.is_empty()
    }

    /// Total signals dropped on overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for SignalIntake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalDomain, SignalNature, SignalOrigin};

    fn signal(id: &str) -> Signal {
        Signal::new(
            SignalOrigin::Sensing,
            SignalDomain::Economy,
            SignalNature::Observation,
            "price_tick",
            0.1,
        )
        .with_id(id)
    }

    #[tokio::test]
    async fn test_drain_preserves_arrival_order_and_empties() {
        let intake = SignalIntake::new();
        for id in ["a", "b", "c"] {
            intake.ingest(signal(id)).await.unwrap();
        }

        let batch = intake.drain().await;
        let ids: Vec<&str> = batch.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(intake.is_empty().await);
    }

    #[tokio::test]
    async fn test_drain_on_empty_buffer_returns_empty() {
        let intake = SignalIntake::new();
        assert!(intake.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_signals_are_delivered_once() {
        let intake = SignalIntake::new();
        intake.ingest(signal("first")).await.unwrap();
        assert_eq!(intake.drain().await.len(), 1);

        intake.ingest(signal("second")).await.unwrap();
        let batch = intake.drain().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "second");
    }

    #[tokio::test]
    async fn test_buffer_limit_drops_oldest() {
        let intake = SignalIntake::with_config(IntakeConfig { buffer_size: 3 });
        for i in 0..5 {
            intake.ingest(signal(&format!("s{i}"))).await.unwrap();
        }

        assert_eq!(intake.len().await, 3);
        assert_eq!(intake.dropped(), 2);
        let batch = intake.drain().await;
        assert_eq!(batch[0].id, "s2");
    }

    #[tokio::test]
    async fn test_out_of_range_intensity_is_not_buffered() {
        let intake = SignalIntake::new();
        let mut nan = signal("nan");
        nan.intensity = f64::NAN;
        let mut negative = signal("negative");
        negative.intensity = -2.0;

        assert!(intake.ingest(nan).await.is_err());
        assert!(intake.ingest(negative).await.is_err());
        assert!(intake.is_empty().await);
        assert_eq!(intake.dropped(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let intake = Arc::new(SignalIntake::new());
        let mut handles = Vec::new();
        for producer in 0..8 {
            let intake = Arc::clone(&intake);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    intake.ingest(signal(&format!("p{producer}-{i}"))).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(intake.drain().await.len(), 400);
    }
}
