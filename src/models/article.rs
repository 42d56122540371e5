//! # 게시글(Article) 모델 정의
//!
//! 게시글 목록 응답, 작성/수정 요청, 내 글 목록 조회 조건, 좋아요 요청을 정의합니다.
//!
//! 서버는 작성자(author)를 두 가지 모양으로 보냅니다.
//! - 전체 글 목록: `{ _id, name, profilePicture }` 객체
//! - 내 글 목록: 작성자 ID 문자열
//! `ArticleAuthor`가 두 경우를 모두 받아들입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_picture: String,
}

/// 게시글 작성자: 객체 또는 ID 문자열
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleAuthor {
    Profile(Author),
    Id(String),
}

impl ArticleAuthor {
    pub fn id(&self) -> &str {
        match self {
            ArticleAuthor::Profile(author) => &author.id,
            ArticleAuthor::Id(id) => id,
        }
    }

    /// 표시용 이름. ID만 있으면 ID를 그대로 씁니다.
    pub fn display_name(&self) -> &str {
        match self {
            ArticleAuthor::Profile(author) => &author.name,
            ArticleAuthor::Id(id) => id,
        }
    }
}

/// 게시글 엔티티: `GET /get-all-articles`, `GET /get-articles/{id}`의 `data` 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: String,
    pub author: ArticleAuthor,
    /// 좋아요 수
    #[serde(default)]
    pub likes: u64,
    /// 좋아요를 누른 사용자 ID 목록
    #[serde(default)]
    pub liked_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// 해당 사용자가 이 글에 좋아요를 눌렀는지 여부
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }
}

/// 목록 응답 `{ data: [Article] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleList {
    #[serde(default)]
    pub data: Vec<Article>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// 내 글 목록 조회 조건: `?search&category&page&limit&sortBy&order`
///
/// 빈 검색어나 빈 카테고리는 쿼리스트링에서 빠집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub search: String,
    pub category: String,
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        // 대시보드의 초기값: 1페이지, 페이지당 10개
        Self {
            search: String::new(),
            category: String::new(),
            page: 1,
            limit: 10,
            sort_by: None,
            order: None,
        }
    }
}

impl ArticleQuery {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if !self.search.trim().is_empty() {
            pairs.push(("search".to_string(), self.search.trim().to_string()));
        }
        if !self.category.is_empty() {
            pairs.push(("category".to_string(), self.category.clone()));
        }
        pairs.push(("page".to_string(), self.page.max(1).to_string()));
        pairs.push(("limit".to_string(), self.limit.max(1).to_string()));
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy".to_string(), sort_by.clone()));
        }
        if let Some(order) = self.order {
            pairs.push(("order".to_string(), order.as_str().to_string()));
        }
        pairs
    }
}

/// 새 게시글: `POST /create-article`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub tags: Vec<String>,
}

/// 게시글 부분 수정: `None`인 필드는 보내지 않습니다.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// `PATCH /edit-article` 본문 `{ id, articleData }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditArticleRequest {
    pub id: String,
    pub article_data: ArticlePatch,
}

/// 좋아요/좋아요 취소 본문 `{ articleId }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub article_id: String,
}

/// 좋아요 응답. 서버가 빈 본문을 보내도 되고, 최신 좋아요 수를 보내도 됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikeAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub likes: Option<u64>,
}
