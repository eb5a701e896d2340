use crate::adapters::storage::MessageStore;
use crate::domain::message::{self, Message, MessageFilter, NewMessage};
use crate::error::Result;
use crate::services::delivery_service::DeliverySimulator;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) accepted_total: Counter<u64>,
    pub(crate) list_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-service");
        Self {
            accepted_total: meter
                .u64_counter("sms_messages_accepted_total")
                .with_description("Total messages accepted for delivery")
                .build(),
            list_size: meter
                .u64_histogram("sms_message_list_size")
                .with_description("Number of messages returned by a single listing")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    simulator: DeliverySimulator,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, simulator: DeliverySimulator) -> Self {
        Self { store, simulator, metrics: Metrics::new() }
    }

    /// Stores a new `PENDING` message and schedules its delivery simulation.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the message cannot be stored.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, new),
        fields(message_id = tracing::field::Empty)
    )]
    pub async fn send_message(&self, new: NewMessage) -> Result<Message> {
        let message = Message::pending(new, message::now());
        tracing::Span::current().record("message_id", tracing::field::display(message.id));

        match self.store.create(&message).await {
            Ok(()) => {
                tracing::debug!("Message accepted");
                self.metrics.accepted_total.add(1, &[KeyValue::new("status", "success")]);
                self.simulator.schedule(message.id);
                Ok(message)
            }
            Err(e) => {
                self.metrics.accepted_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// Looks up a single message.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(message_id = %id))]
    pub async fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.store.get_by_id(id).await
    }

    /// Lists every message, or only those matching `filter`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list_messages(&self, filter: Option<MessageFilter>) -> Result<Vec<Message>> {
        let messages = match filter {
            Some(filter) => self.store.list_by(&filter).await?,
            None => self.store.list_all().await?,
        };

        self.metrics.list_size.record(messages.len() as u64, &[]);

        Ok(messages)
    }

    /// Forces an immediate delivery simulation.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the store cannot be read or written.
    pub async fn simulate_delivery(&self, id: Uuid) -> Result<Option<Message>> {
        self.simulator.simulate(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryMessageStore;
    use crate::config::SimulationConfig;
    use crate::domain::message::MessageStatus;

    fn service(store: &MemoryMessageStore) -> MessageService {
        let store: Arc<dyn MessageStore> = Arc::new(store.clone());
        // Long enough that nothing resolves during a test.
        let config = SimulationConfig { delay_ms: 60_000, delivery_rate: 0.8 };
        MessageService::new(Arc::clone(&store), DeliverySimulator::new(store, &config))
    }

    fn new_message(source: &str, destination: &str) -> NewMessage {
        NewMessage {
            source_number: source.into(),
            destination_number: destination.into(),
            content: "Hello test".into(),
        }
    }

    #[tokio::test]
    async fn test_send_message_stores_pending() {
        let store = MemoryMessageStore::new();
        let service = service(&store);

        let msg = service.send_message(new_message("+12025550123", "+447700900123")).await.unwrap();
        assert_eq!(msg.status, MessageStatus::Pending);
        assert_eq!(msg.error_code, None);
        assert_eq!(msg.created_at, msg.updated_at);
        assert_eq!(msg.source_number, "+12025550123");

        let stored = service.get_message(msg.id).await.unwrap();
        assert_eq!(stored, Some(msg));
    }

    #[tokio::test]
    async fn test_send_message_assigns_unique_ids() {
        let store = MemoryMessageStore::new();
        let service = service(&store);

        let a = service.send_message(new_message("+12025550123", "+447700900123")).await.unwrap();
        let b = service.send_message(new_message("+12025550123", "+447700900123")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_list_messages_with_and_without_filter() {
        let store = MemoryMessageStore::new();
        let service = service(&store);

        let a = service.send_message(new_message("+12025550001", "+447700900001")).await.unwrap();
        let b = service.send_message(new_message("+12025550002", "+447700900002")).await.unwrap();

        let all = service.list_messages(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_source =
            service.list_messages(Some(MessageFilter::SourceNumber("+12025550002".into()))).await.unwrap();
        assert_eq!(by_source, vec![b.clone()]);

        service.simulate_delivery(a.id).await.unwrap();
        let pending = service.list_messages(Some(MessageFilter::Status(MessageStatus::Pending))).await.unwrap();
        assert_eq!(pending, vec![b]);
    }

    #[tokio::test]
    async fn test_simulate_delivery_unknown_id() {
        let store = MemoryMessageStore::new();
        let service = service(&store);

        assert!(service.simulate_delivery(Uuid::nil()).await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
