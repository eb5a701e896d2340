use crate::adapters::storage::MessageStore;
use crate::config::SimulationConfig;
use crate::domain::message::{self, DeliveryOutcome, Message};
use crate::error::Result;
use opentelemetry::{KeyValue, global, metrics::Counter};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    scheduled_total: Counter<u64>,
    resolved_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-service");
        Self {
            scheduled_total: meter
                .u64_counter("sms_delivery_scheduled_total")
                .with_description("Total deferred delivery simulations scheduled")
                .build(),
            resolved_total: meter
                .u64_counter("sms_delivery_resolved_total")
                .with_description("Total delivery simulations applied, by outcome")
                .build(),
        }
    }
}

/// Decides the outcome of a simulated delivery from a uniform sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeliveryPolicy {
    delivery_rate: f64,
}

impl DeliveryPolicy {
    #[must_use]
    pub fn new(delivery_rate: f64) -> Self {
        Self { delivery_rate: delivery_rate.clamp(0.0, 1.0) }
    }

    /// Maps a sample in `[0, 1)` to an outcome.
    #[must_use]
    pub fn decide(&self, sample: f64) -> DeliveryOutcome {
        if sample < self.delivery_rate { DeliveryOutcome::Delivered } else { DeliveryOutcome::Failed }
    }

    /// Draws a fresh sample from the thread-local generator.
    #[must_use]
    pub fn draw(&self) -> DeliveryOutcome {
        self.decide(rand::thread_rng().r#gen::<f64>())
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::new(0.8)
    }
}

/// Moves `PENDING` messages to a terminal status, either after a delay in the
/// background or inline on request.
#[derive(Clone, Debug)]
pub struct DeliverySimulator {
    store: Arc<dyn MessageStore>,
    policy: DeliveryPolicy,
    delay: Duration,
    tracker: TaskTracker,
    metrics: Metrics,
}

impl DeliverySimulator {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, config: &SimulationConfig) -> Self {
        Self {
            store,
            policy: DeliveryPolicy::new(config.delivery_rate),
            delay: Duration::from_millis(config.delay_ms),
            tracker: TaskTracker::new(),
            metrics: Metrics::new(),
        }
    }

    /// Resolves the message in the background once the configured delay has elapsed.
    /// Returns immediately; failures are logged.
    pub fn schedule(&self, message_id: Uuid) {
        let simulator = self.clone();
        let delay = self.delay;
        self.metrics.scheduled_total.add(1, &[]);

        self.tracker.spawn(
            async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = simulator.simulate(message_id).await {
                    tracing::error!(error = %e, "Deferred delivery simulation failed");
                }
            }
            .instrument(tracing::info_span!("deferred_delivery", message_id = %message_id)),
        );
    }

    /// Resolves the message now. Returns `None` if the message does not exist.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the store cannot be read or written.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self),
        fields(message_id = %message_id, status = tracing::field::Empty)
    )]
    pub async fn simulate(&self, message_id: Uuid) -> Result<Option<Message>> {
        let policy = self.policy;
        let resolved = self
            .store
            .modify(message_id, Box::new(move |msg| msg.resolve(policy.draw(), message::now())))
            .await?;

        match &resolved {
            Some(message) => {
                tracing::Span::current().record("status", message.status.as_str());
                tracing::debug!("Delivery simulated");
                self.metrics.resolved_total.add(1, &[KeyValue::new("status", message.status.as_str())]);
            }
            None => tracing::debug!("Message not found, nothing to simulate"),
        }

        Ok(resolved)
    }

    /// Number of deferred simulations that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every scheduled simulation to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
