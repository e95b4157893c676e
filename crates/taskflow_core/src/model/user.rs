//! Account identity and profile records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an account. Scopes every persisted work item.
pub type UserId = Uuid;

/// Signed-in identity as seen by services and the session context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: UserId,
    /// Normalized (trimmed, lower-cased) email address.
    pub email: String,
    pub display_name: String,
}

/// Profile fields captured at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub full_name: String,
    pub nickname: String,
    pub role_model: String,
}

/// Stored profile of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub email: String,
    pub fields: ProfileFields,
    pub created_at: DateTime<Utc>,
}
