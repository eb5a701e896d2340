use crate::domain::message::{Message, MessageFilter, MessageStatus, NewMessage, UnknownStatus};
use crate::error::FieldError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

const MAX_CONTENT_CHARS: usize = 500;
const MAX_PHONE_DIGITS: usize = 15;

/// Body of `POST /messages`. Fields are optional so a missing field is reported
/// as a validation error rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub destination_number: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl SendMessageRequest {
    /// Validates the payload, collecting every violated field.
    ///
    /// # Errors
    /// Returns the list of field errors if any field is missing or malformed.
    pub fn validate(self) -> Result<NewMessage, Vec<FieldError>> {
        let mut errors = Vec::new();

        let source_number = check_phone_number(self.source_number, "sourceNumber", "Source", &mut errors);
        let destination_number =
            check_phone_number(self.destination_number, "destinationNumber", "Destination", &mut errors);

        let content = match self.content {
            Some(content) if !content.trim().is_empty() => {
                if content.chars().count() > MAX_CONTENT_CHARS {
                    errors.push(FieldError::new("content", "Content cannot exceed 500 characters"));
                }
                content
            }
            _ => {
                errors.push(FieldError::new("content", "Content cannot be empty"));
                String::new()
            }
        };

        if errors.is_empty() {
            Ok(NewMessage { source_number, destination_number, content })
        } else {
            Err(errors)
        }
    }
}

fn check_phone_number(value: Option<String>, field: &str, label: &str, errors: &mut Vec<FieldError>) -> String {
    match value {
        Some(number) if !number.trim().is_empty() => {
            if !is_phone_number(&number) {
                errors.push(FieldError::new(field, format!("Invalid {} phone number format", label.to_lowercase())));
            }
            number
        }
        _ => {
            errors.push(FieldError::new(field, format!("{label} number is required")));
            String::new()
        }
    }
}

/// E.164-style number: optional `+`, a non-zero leading digit, 2 to 15 digits in total.
fn is_phone_number(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9'))
        && (2..=MAX_PHONE_DIGITS).contains(&digits.len())
        && chars.all(|c| c.is_ascii_digit())
}

/// Query string of `GET /messages`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    pub status: Option<String>,
    pub source_number: Option<String>,
    pub destination_number: Option<String>,
}

impl ListMessagesQuery {
    /// Picks the first non-blank filter in the order status, source, destination.
    ///
    /// # Errors
    /// Returns `UnknownStatus` if the status filter is not a known status.
    pub fn into_filter(self) -> Result<Option<MessageFilter>, UnknownStatus> {
        if let Some(status) = non_blank(self.status) {
            return Ok(Some(MessageFilter::Status(status.parse()?)));
        }
        if let Some(number) = non_blank(self.source_number) {
            return Ok(Some(MessageFilter::SourceNumber(number)));
        }
        Ok(non_blank(self.destination_number).map(MessageFilter::DestinationNumber))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub source_number: String,
    pub destination_number: String,
    pub content: String,
    pub status: MessageStatus,
    pub error_code: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            source_number: message.source_number,
            destination_number: message.destination_number,
            content: message.content,
            status: message.status,
            error_code: message.error_code,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str, destination: &str, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            source_number: Some(source.into()),
            destination_number: Some(destination.into()),
            content: Some(content.into()),
        }
    }

    #[test]
    fn test_validate_success() {
        let new = request("+12025550123", "+447700900123", "Hello test").validate().unwrap();
        assert_eq!(new.source_number, "+12025550123");
        assert_eq!(new.destination_number, "+447700900123");
        assert_eq!(new.content, "Hello test");
    }

    #[test]
    fn test_validate_number_without_plus() {
        assert!(request("12025550123", "447700900123", "Hi").validate().is_ok());
    }

    #[test]
    fn test_validate_empty_content() {
        let errors = request("+12025550123", "+447700900123", "   ").validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("content", "Content cannot be empty")]);
    }

    #[test]
    fn test_validate_content_too_long() {
        let errors = request("+12025550123", "+447700900123", &"A".repeat(501)).validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("content", "Content cannot exceed 500 characters")]);
        assert!(request("+12025550123", "+447700900123", &"é".repeat(500)).validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_source_number() {
        let errors = request("0123", "+447700900123", "Hi").validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sourceNumber");
        assert!(errors[0].message.contains("Invalid source phone number format"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let errors = SendMessageRequest::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["sourceNumber", "destinationNumber", "content"]);
        assert_eq!(errors[0].message, "Source number is required");
        assert_eq!(errors[1].message, "Destination number is required");
    }

    #[test]
    fn test_phone_number_bounds() {
        assert!(is_phone_number("+12"));
        assert!(!is_phone_number("+1"));
        assert!(is_phone_number("123456789012345"));
        assert!(!is_phone_number("1234567890123456"));
        assert!(!is_phone_number("+1202555012a"));
        assert!(!is_phone_number("++12025550123"));
    }

    #[test]
    fn test_query_filter_precedence() {
        let query = ListMessagesQuery {
            status: Some(" ".into()),
            source_number: Some("+111".into()),
            destination_number: Some("+222".into()),
        };
        assert_eq!(query.into_filter(), Ok(Some(MessageFilter::SourceNumber("+111".into()))));

        let query = ListMessagesQuery {
            status: Some("FAILED".into()),
            source_number: Some("+111".into()),
            destination_number: None,
        };
        assert_eq!(query.into_filter(), Ok(Some(MessageFilter::Status(MessageStatus::Failed))));

        assert_eq!(ListMessagesQuery::default().into_filter(), Ok(None));
    }

    #[test]
    fn test_query_unknown_status() {
        let query = ListMessagesQuery { status: Some("SENT".into()), ..Default::default() };
        assert!(query.into_filter().is_err());
    }
}
