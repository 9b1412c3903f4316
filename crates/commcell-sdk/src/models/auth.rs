//! Login payloads.

use serde::{Deserialize, Serialize};

/// Body of a `POST Login` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login mode; 4 is the SDK mode.
    pub mode: u8,
    /// Commcell user name.
    pub username: String,
    /// Base64 encoded password.
    pub password: String,
    /// Device id of this session.
    pub device_id: String,
    /// Client type; 30 identifies an SDK client.
    pub client_type: u8,
}

impl LoginRequest {
    /// Creates a login request from an already encoded password.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        encoded_password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            mode: 4,
            username: username.into(),
            password: encoded_password.into(),
            device_id: device_id.into(),
            client_type: 30,
        }
    }
}

/// Successful `POST Login` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Logged in user.
    pub user_name: String,
    /// Session token, including its `QSDK ` prefix.
    pub token: String,
}
