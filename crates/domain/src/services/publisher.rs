//! Alert event publishing.
//!
//! The engine hands each triggered alert to an [`EventPublisher`] as soon as
//! it is produced. Publishing is synchronous from the engine's point of view;
//! delivery, buffering and retries belong to the implementation.

use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::AlertEvent;

/// Failure to hand an alert to its transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("Publisher is closed")]
    Closed,

    #[error("Publisher failure: {0}")]
    Failed(String),
}

/// Publish side of the alert event bus.
pub trait EventPublisher: Send + Sync {
    /// Publish one alert. Only unrecoverable transport failures are errors.
    fn publish(&self, event: &AlertEvent) -> Result<(), PublishError>;
}

/// In-process publish/subscribe bus over a tokio broadcast channel.
///
/// Publishing with no live subscribers is not an error; the event is dropped.
/// Slow subscribers lag and lose the oldest events beyond the channel capacity.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<AlertEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: &AlertEvent) -> Result<(), PublishError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                tracing::trace!(
                    rule_key = %event.rule_key,
                    receivers = receivers,
                    "Alert broadcast"
                );
            }
            Err(_) => {
                tracing::debug!(
                    rule_key = %event.rule_key,
                    "No subscribers for alert, dropping"
                );
            }
        }
        Ok(())
    }
}

/// Publisher that keeps every event in memory, in publish order.
///
/// Intended for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<AlertEvent>>,
    /// Whether to simulate failures for testing.
    simulate_failure: bool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher whose every publish fails.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            simulate_failure: true,
        }
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rule keys of the recorded events, in publish order.
    pub fn rule_keys(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.rule_key).collect()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: &AlertEvent) -> Result<(), PublishError> {
        if self.simulate_failure {
            tracing::warn!(rule_key = %event.rule_key, "Recording publisher simulating failure");
            return Err(PublishError::Failed("Simulated failure".to_string()));
        }

        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
