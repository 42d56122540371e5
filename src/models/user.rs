use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated-user summary shown by the UI and persisted with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_picture: String,
}

impl UserSummary {
    /// Pulls the user out of a `response` payload.
    ///
    /// The server nests it as `{ user: {...}, ... }` on some routes and
    /// inlines the user fields next to `accessToken` on others.
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        match payload.get("user") {
            Some(user) if user.is_object() => serde_json::from_value(user.clone()),
            _ => serde_json::from_value(payload.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub code: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureRequest {
    /// Base64 data URL of the image.
    pub profile_pic: String,
}

/// `{ message }` acknowledgement returned by most mutations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// `{ message, response }` envelope returned by registration and login.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub response: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub profile_picture: String,
}
