use crate::{
    error::ApiError,
    models::{ChangePasswordRequest, MessageResponse, ProfilePictureRequest, ProfilePictureResponse},
    session::SessionClient,
    transport::ApiRequest,
};

/// `POST /change-password`
pub async fn change_password(session: &SessionClient, old_password: &str, new_password: &str) -> Result<String, ApiError> {
    let body = ChangePasswordRequest {
        old_password: old_password.to_string(),
        new_password: new_password.to_string(),
    };
    let resp: MessageResponse = session
        .call(ApiRequest::post("/change-password").authenticated().json(&body)?)
        .await?;
    Ok(resp.message)
}

/// `POST /update-profile`
///
/// `image` is the base64 data URL of the picture. The stored user summary
/// picks up the URL the server returns.
pub async fn upload_profile_picture(session: &SessionClient, image: &str) -> Result<String, ApiError> {
    let body = ProfilePictureRequest {
        profile_pic: image.to_string(),
    };
    let resp: ProfilePictureResponse = session
        .call(ApiRequest::post("/update-profile").authenticated().json(&body)?)
        .await?;

    session.update_profile_picture(resp.profile_picture.clone()).await;
    Ok(resp.profile_picture)
}
