use crate::{
    error::ApiError,
    models::{Envelope, LoginRequest, MessageResponse, OtpRequest, OtpResponse, RegisterRequest, UserSummary},
    session::SessionClient,
    transport::ApiRequest,
};

const MISSING_REGISTRATION: &str = "User information is missing. Please login again.";

/// `POST /registration`
///
/// The returned user is remembered until the OTP is confirmed.
pub async fn register(session: &SessionClient, req: &RegisterRequest) -> Result<String, ApiError> {
    let envelope: Envelope = session.call(ApiRequest::post("/registration").json(req)?).await?;
    let user = UserSummary::from_payload(&envelope.response).map_err(|e| ApiError::malformed(200, e))?;

    tracing::info!(user = %user.id, "registered, waiting for OTP");
    session.remember_registration(user).await;
    Ok(envelope.message)
}

/// `POST /otp-verification`
pub async fn verify_otp(session: &SessionClient, code: &str) -> Result<String, ApiError> {
    let user = session
        .pending_registration()
        .await
        .ok_or_else(|| ApiError::unauthenticated(MISSING_REGISTRATION))?;

    let req = OtpRequest {
        code: code.trim().to_string(),
        user_id: user.id.clone(),
    };
    let resp: OtpResponse = session.call(ApiRequest::post("/otp-verification").json(&req)?).await?;

    session.complete_registration(user, resp.access_token).await;
    Ok(resp.message)
}

/// `POST /login`
pub async fn login(session: &SessionClient, req: &LoginRequest) -> Result<String, ApiError> {
    let envelope: Envelope = session.call(ApiRequest::post("/login").json(req)?).await?;

    let access_token = envelope
        .response
        .get("accessToken")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::malformed(200, "missing accessToken"))?
        .to_string();
    let user = UserSummary::from_payload(&envelope.response).map_err(|e| ApiError::malformed(200, e))?;

    session.establish(access_token, user).await;
    if envelope.message.is_empty() {
        Ok("Login successful".to_string())
    } else {
        Ok(envelope.message)
    }
}

/// `GET /logout`
///
/// The local session is cleared when the server confirms, or when the server
/// says there is no session left to end. Network failures keep it so the
/// user can retry.
pub async fn logout(session: &SessionClient) -> Result<String, ApiError> {
    match session.call::<MessageResponse>(ApiRequest::get("/logout").authenticated()).await {
        Ok(resp) => {
            session.end_session().await;
            Ok(resp.message)
        }
        Err(e) if e.ends_session() => {
            session.end_session().await;
            Ok("Logged out".to_string())
        }
        Err(e) => Err(e),
    }
}
