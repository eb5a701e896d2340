use crate::domain::message::{Message, MessageFilter};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryMessageStore;

/// In-place change applied to a stored message while the record is locked.
pub type Mutation = Box<dyn FnOnce(&mut Message) + Send>;

/// Keyed message table. Listings are ordered by `(created_at, id)`.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts a new record. Fails with `AppError::Conflict` if the id is taken.
    async fn create(&self, message: &Message) -> Result<()>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Message>>;

    async fn list_all(&self) -> Result<Vec<Message>>;

    async fn list_by(&self, filter: &MessageFilter) -> Result<Vec<Message>>;

    /// Overwrites the mutable fields of an existing record in one write.
    /// Returns `false` if no record has this id.
    async fn update(&self, message: &Message) -> Result<bool>;

    /// Runs `mutation` against the current record and persists the result as one unit.
    /// Concurrent calls for the same id are serialized.
    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<Option<Message>>;

    async fn ping(&self) -> Result<()>;
}
