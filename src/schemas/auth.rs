use serde::Serialize;

use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) message: &'static str,
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) token_type: &'static str,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessTokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) user: UserResponse,
}
