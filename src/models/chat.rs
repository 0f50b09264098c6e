use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::listing::ListingSummary;
use crate::models::user::ParticipantProfile;
use crate::utils::helpers::timestamp_now;

/// A conversation between exactly two users about one listing.
///
/// Participants are stored sorted (`user1_id < user2_id`) so that the pair is
/// unordered as far as lookups and the unique index are concerned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: String,
    pub listing_id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub latest_message_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatSession {
    pub fn new(listing_id: String, a: String, b: String) -> Self {
        let (user1_id, user2_id) = ordered_pair(a, b);
        let now = timestamp_now();

        Self {
            id: Uuid::new_v4().to_string(),
            listing_id,
            user1_id,
            user2_id,
            latest_message_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The participant that is not `user_id`, if any.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        [self.user1_id.as_str(), self.user2_id.as_str()]
            .into_iter()
            .find(|id| *id != user_id)
    }
}

pub fn ordered_pair(a: String, b: String) -> (String, String) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Session with the listing and both participant profiles filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetails {
    #[serde(flatten)]
    pub chat: ChatSession,
    pub listing: ListingSummary,
    pub users: Vec<ParticipantProfile>,
}

/// One row of a user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: ChatSession,
    pub listing_title: String,
    pub other_user: ParticipantProfile,
    pub unread: i64,
}
