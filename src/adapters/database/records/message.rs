use crate::domain::message::{Message, UnknownStatus};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) source_number: String,
    pub(crate) destination_number: String,
    pub(crate) content: String,
    pub(crate) status: String,
    pub(crate) error_code: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = UnknownStatus;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            source_number: record.source_number,
            destination_number: record.destination_number,
            content: record.content,
            status: record.status.parse()?,
            error_code: record.error_code,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
