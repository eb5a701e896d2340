use super::{MessageStore, Mutation};
use crate::domain::message::{Message, MessageFilter};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

/// Process-local message table, used when no database is configured.
#[derive(Clone, Debug, Default)]
pub struct MemoryMessageStore {
    messages: Arc<DashMap<Uuid, Message>>,
}

impl MemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn collect<F>(&self, predicate: F) -> Vec<Message>
    where
        F: Fn(&Message) -> bool,
    {
        let mut messages: Vec<Message> =
            self.messages.iter().filter(|entry| predicate(entry.value())).map(|entry| entry.value().clone()).collect();
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        messages
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    #[tracing::instrument(level = "debug", skip(self, message), fields(message_id = %message.id))]
    async fn create(&self, message: &Message) -> Result<()> {
        match self.messages.entry(message.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("Message {} already exists", message.id))),
            Entry::Vacant(slot) => {
                slot.insert(message.clone());
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<Message>> {
        Ok(self.collect(|_| true))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(field = filter.field()))]
    async fn list_by(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        Ok(self.collect(|message| filter.matches(message)))
    }

    #[tracing::instrument(level = "debug", skip(self, message), fields(message_id = %message.id))]
    async fn update(&self, message: &Message) -> Result<bool> {
        let Some(mut stored) = self.messages.get_mut(&message.id) else {
            return Ok(false);
        };
        stored.status = message.status;
        stored.error_code.clone_from(&message.error_code);
        stored.updated_at = message.updated_at;
        Ok(true)
    }

    #[tracing::instrument(level = "debug", skip(self, mutation))]
    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<Option<Message>> {
        // The shard write lock is held until `stored` drops.
        let Some(mut stored) = self.messages.get_mut(&id) else {
            return Ok(None);
        };
        let mut next = stored.clone();
        mutation(&mut next);
        stored.status = next.status;
        stored.error_code = next.error_code;
        stored.updated_at = next.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
