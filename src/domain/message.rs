use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Error code recorded on every failed delivery.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Failed,
}

impl MessageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Terminal result of a delivery simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn status(self) -> MessageStatus {
        match self {
            Self::Delivered => MessageStatus::Delivered,
            Self::Failed => MessageStatus::Failed,
        }
    }

    #[must_use]
    pub const fn error_code(self) -> Option<&'static str> {
        match self {
            Self::Delivered => None,
            Self::Failed => Some(NETWORK_ERROR),
        }
    }
}

/// Validated payload for a message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub source_number: String,
    pub destination_number: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub source_number: String,
    pub destination_number: String,
    pub content: String,
    pub status: MessageStatus,
    pub error_code: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Message {
    /// Builds a fresh `PENDING` message with a new id.
    #[must_use]
    pub fn pending(new: NewMessage, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_number: new.source_number,
            destination_number: new.destination_number,
            content: new.content,
            status: MessageStatus::Pending,
            error_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a delivery outcome. Status, error code and timestamp always move together.
    pub fn resolve(&mut self, outcome: DeliveryOutcome, now: OffsetDateTime) {
        self.status = outcome.status();
        self.error_code = outcome.error_code().map(str::to_string);
        // Stored timestamps have microsecond precision, so a transition must advance by at least that much.
        self.updated_at = now.max(self.updated_at + Duration::microseconds(1));
    }
}

/// Equality filter over one of the filterable message fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFilter {
    Status(MessageStatus),
    SourceNumber(String),
    DestinationNumber(String),
}

impl MessageFilter {
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Status(status) => message.status == *status,
            Self::SourceNumber(number) => message.source_number == *number,
            Self::DestinationNumber(number) => message.destination_number == *number,
        }
    }

    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::SourceNumber(_) => "sourceNumber",
            Self::DestinationNumber(_) => "destinationNumber",
        }
    }
}

/// Current UTC time truncated to microseconds, the precision both stores keep.
#[must_use]
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.microsecond() * 1_000).unwrap_or(now)
}
