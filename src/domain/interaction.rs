use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How long an interaction token may be used to edit its reply.
pub const INTERACTION_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// A single user action as delivered by the remote service.
///
/// `id` is a snowflake: ids issued later compare greater, which is what token
/// refresh relies on to discard late arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: u64,
    pub application_id: String,
    pub token: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Interaction {
    /// Whether the token issued with this interaction can still edit its reply.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        token_is_fresh(self.created_at, now)
    }
}

pub(crate) fn token_is_fresh(issued_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    now - issued_at < INTERACTION_TOKEN_TTL
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn interaction() -> Interaction {
        Interaction {
            id: 10,
            application_id: "app".into(),
            token: "tok".into(),
            channel_id: "chan".into(),
            user_id: "user".into(),
            message_id: None,
            created_at: datetime!(2026-01-01 12:00 UTC),
        }
    }

    #[test]
    fn token_expires_after_fifteen_minutes() {
        let interaction = interaction();
        assert!(interaction.is_fresh(datetime!(2026-01-01 12:14:59 UTC)));
        assert!(!interaction.is_fresh(datetime!(2026-01-01 12:15 UTC)));
    }

    #[test]
    fn serializes_timestamp_as_rfc3339() {
        let json = serde_json::to_value(interaction()).expect("serialize");
        assert_eq!(json["created_at"], "2026-01-01T12:00:00Z");
        assert!(json.get("message_id").is_none());
    }
}
