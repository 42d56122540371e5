use serde_json::Value;

use crate::{
    error::ApiError,
    models::{
        Article, ArticleList, ArticlePatch, ArticleQuery, EditArticleRequest, LikeAck, LikeRequest, MessageResponse,
        NewArticle,
    },
    session::SessionClient,
    transport::ApiRequest,
};

/// `GET /get-all-articles`: public feed.
pub async fn list_all(session: &SessionClient) -> Result<Vec<Article>, ApiError> {
    let list: ArticleList = session.call(ApiRequest::get("/get-all-articles")).await?;
    Ok(list.data)
}

/// `GET /get-articles/{id}` with search, filter and paging.
pub async fn list_for_user(
    session: &SessionClient,
    user_id: &str,
    query: &ArticleQuery,
) -> Result<Vec<Article>, ApiError> {
    if user_id.is_empty() {
        return Err(ApiError::validation("user id is required"));
    }
    let request = ApiRequest::get(format!("/get-articles/{}", user_id))
        .authenticated()
        .query(query.to_pairs());
    let list: ArticleList = session.call(request).await?;
    Ok(list.data)
}

/// Articles of the logged-in user.
pub async fn list_mine(session: &SessionClient, query: &ArticleQuery) -> Result<Vec<Article>, ApiError> {
    let view = session.view();
    let user_id = view
        .user_id()
        .ok_or_else(|| ApiError::unauthenticated("Please login to see your articles"))?;
    list_for_user(session, user_id, query).await
}

/// `POST /create-article`
pub async fn create(session: &SessionClient, article: &NewArticle) -> Result<String, ApiError> {
    let resp: MessageResponse = session
        .call(ApiRequest::post("/create-article").authenticated().json(article)?)
        .await?;
    Ok(resp.message)
}

/// `PATCH /edit-article`
pub async fn edit(session: &SessionClient, id: &str, patch: ArticlePatch) -> Result<String, ApiError> {
    let body = EditArticleRequest {
        id: id.to_string(),
        article_data: patch,
    };
    let resp: MessageResponse = session
        .call(ApiRequest::patch("/edit-article").authenticated().json(&body)?)
        .await?;
    Ok(resp.message)
}

/// `DELETE /delete-article/{id}`
pub async fn delete(session: &SessionClient, id: &str) -> Result<String, ApiError> {
    let resp: MessageResponse = session
        .call(ApiRequest::delete(format!("/delete-article/{}", id)).authenticated())
        .await?;
    Ok(resp.message)
}

pub fn like_request(article_id: &str) -> Result<ApiRequest, ApiError> {
    ApiRequest::post("/like-article")
        .authenticated()
        .json(&LikeRequest { article_id: article_id.to_string() })
}

pub fn dislike_request(article_id: &str) -> Result<ApiRequest, ApiError> {
    ApiRequest::post("/disLike-article")
        .authenticated()
        .json(&LikeRequest { article_id: article_id.to_string() })
}

/// `POST /like-article`
pub async fn like(session: &SessionClient, article_id: &str) -> Result<LikeAck, ApiError> {
    Ok(parse_ack(session.execute(like_request(article_id)?).await?))
}

/// `POST /disLike-article`
pub async fn dislike(session: &SessionClient, article_id: &str) -> Result<LikeAck, ApiError> {
    Ok(parse_ack(session.execute(dislike_request(article_id)?).await?))
}

/// Like endpoints answer with an empty body or a small acknowledgement.
pub fn parse_ack(body: Value) -> LikeAck {
    serde_json::from_value(body).unwrap_or_default()
}
