use chrono::{DateTime, Utc};

use crate::model::role::Role;

/// A stored account. Handlers answer with `UserResponse`, which drops the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
