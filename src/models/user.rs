use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Public part of a user record, safe to show to the other party of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ParticipantProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}
