use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::User;
use crate::schemas::{trimmed, trimmed_opt};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 80, message = "username must be 3-80 characters"))]
    pub(crate) username: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "email is invalid"))]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) password: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 120, message = "full_name is required"))]
    pub(crate) full_name: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 120, message = "qualification is too long"))]
    pub(crate) qualification: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub(crate) date_of_birth: Option<String>,
}

impl RegisterRequest {
    /// First required field left blank, in form order.
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        [
            ("username", self.username.is_empty()),
            ("email", self.email.is_empty()),
            ("password", self.password.is_empty()),
            ("full_name", self.full_name.is_empty()),
        ]
        .into_iter()
        .find_map(|(field, missing)| missing.then_some(field))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password: String,
}

/// Admin edit of a user account. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserUpdate {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 120, message = "full_name is too long"))]
    pub(crate) full_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 120, message = "qualification is too long"))]
    pub(crate) qualification: Option<String>,
    #[serde(default)]
    pub(crate) is_active: Option<bool>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub(crate) date_of_birth: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) qualification: Option<String>,
    pub(crate) date_of_birth: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) roles: Vec<String>,
    pub(crate) is_admin: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        let is_admin = user.is_admin();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            qualification: user.qualification,
            date_of_birth: user.date_of_birth.map(format_date),
            is_active: user.is_active,
            roles: user.roles,
            is_admin,
            created_at: format_primitive(user.created_at),
            updated_at: format_primitive(user.updated_at),
        }
    }
}
