use crate::adapters::database::DbPool;
use crate::adapters::database::records::MessageRecord;
use crate::adapters::storage::{MessageStore, Mutation};
use crate::domain::message::{Message, MessageFilter};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

/// Postgres-backed message table.
#[derive(Clone, Debug)]
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Writes the mutable columns of a message in a single statement.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    async fn write(conn: &mut PgConnection, message: &Message) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = $2, error_code = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(message.status.as_str())
        .bind(message.error_code.as_deref())
        .bind(message.updated_at)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn into_messages(records: Vec<MessageRecord>) -> Result<Vec<Message>> {
    records.into_iter().map(into_message).collect()
}

fn into_message(record: MessageRecord) -> Result<Message> {
    Message::try_from(record).map_err(|e| AppError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[tracing::instrument(level = "debug", skip(self, message), fields(message_id = %message.id))]
    async fn create(&self, message: &Message) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, source_number, destination_number, content, status, error_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(&message.source_number)
        .bind(&message.destination_number)
        .bind(&message.content)
        .bind(message.status.as_str())
        .bind(message.error_code.as_deref())
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                Err(AppError::Conflict(format!("Message {} already exists", message.id)))
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(into_message).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_all(&self) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
            FROM messages
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        into_messages(records)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(field = filter.field()))]
    async fn list_by(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let (sql, value) = match filter {
            MessageFilter::Status(status) => (
                r#"
                SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
                FROM messages
                WHERE status = $1
                ORDER BY created_at ASC, id ASC
                "#,
                status.as_str(),
            ),
            MessageFilter::SourceNumber(number) => (
                r#"
                SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
                FROM messages
                WHERE source_number = $1
                ORDER BY created_at ASC, id ASC
                "#,
                number.as_str(),
            ),
            MessageFilter::DestinationNumber(number) => (
                r#"
                SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
                FROM messages
                WHERE destination_number = $1
                ORDER BY created_at ASC, id ASC
                "#,
                number.as_str(),
            ),
        };

        let records = sqlx::query_as::<_, MessageRecord>(sql).bind(value).fetch_all(&self.pool).await?;

        into_messages(records)
    }

    #[tracing::instrument(level = "debug", skip(self, message), fields(message_id = %message.id))]
    async fn update(&self, message: &Message) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::write(&mut *conn, message).await
    }

    #[tracing::instrument(level = "debug", skip(self, mutation))]
    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<Option<Message>> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, source_number, destination_number, content, status, error_code, created_at, updated_at
            FROM messages
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut message = into_message(record)?;
        mutation(&mut message);
        Self::write(&mut *tx, &message).await?;
        tx.commit().await?;

        Ok(Some(message))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
