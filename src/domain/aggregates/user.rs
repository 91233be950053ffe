//! User Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::value_objects::Role;

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public view of an account; never carries the hash.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self { Self { id: u.id, username: u.username.clone(), role: u.role } }
}
