use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::content::ContentBlock;

pub type Id = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    /// Subject of the token that created the post.
    pub user_id: Option<String>,
    pub thumbnail: Option<String>,
    /// Ordered blocks, e.g. `{"type":"text","value":"..."}` or `{"type":"image","value":"<url>"}`.
    #[schema(value_type = Vec<Object>)]
    pub content: Vec<ContentBlock>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBlog {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub user_id: Option<String>,
    pub thumbnail: Option<String>,
    pub content: Vec<ContentBlock>,
}

/// Full replacement of the mutable columns; `updated_at` is set by the repo.
#[derive(Debug, Clone)]
pub struct BlogUpdate {
    pub title: String,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct BlogSummary {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BlogPost> for BlogSummary {
    fn from(p: &BlogPost) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            author: p.author.clone(),
            thumbnail: p.thumbnail.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogPage {
    pub items: Vec<BlogSummary>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimilarBlogs {
    pub blog: BlogPost,
    pub related: Vec<BlogSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const MAX_LIMIT: i64 = 100;

    /// Rows to skip; `None` when the page lies beyond what an `i64` offset can address.
    pub fn offset(&self) -> Option<i64> {
        self.page.checked_sub(1)?.checked_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 { 0 } else { (total + self.limit - 1) / self.limit }
    }
}

/// Podcast guest profile with a single portrait image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Guest {
    pub id: Uuid,
    pub image: Option<String>,
    pub name: String,
    pub role: String,
    pub about: String,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
    pub heading_one: String,
    pub description_one: String,
    pub heading_two: String,
    pub description_two: String,
    pub heading_three: String,
    pub description_three: String,
    pub youtube_link: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every editable guest column, as written on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestProfile {
    pub name: String,
    pub role: String,
    pub about: String,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
    pub heading_one: String,
    pub description_one: String,
    pub heading_two: String,
    pub description_two: String,
    pub heading_three: String,
    pub description_three: String,
    pub youtube_link: String,
}

impl From<&Guest> for GuestProfile {
    fn from(g: &Guest) -> Self {
        Self {
            name: g.name.clone(),
            role: g.role.clone(),
            about: g.about.clone(),
            instagram: g.instagram.clone(),
            twitter: g.twitter.clone(),
            threads: g.threads.clone(),
            heading_one: g.heading_one.clone(),
            description_one: g.description_one.clone(),
            heading_two: g.heading_two.clone(),
            description_two: g.description_two.clone(),
            heading_three: g.heading_three.clone(),
            description_three: g.description_three.clone(),
            youtube_link: g.youtube_link.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewGuest {
    pub id: Uuid,
    pub image: Option<String>,
    pub user_id: Option<String>,
    pub profile: GuestProfile,
}

#[derive(Debug, Clone)]
pub struct GuestUpdate {
    pub image: Option<String>,
    pub profile: GuestProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct GuestSummary {
    pub id: Uuid,
    pub image: Option<String>,
    pub name: String,
    pub role: String,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
}

impl From<&Guest> for GuestSummary {
    fn from(g: &Guest) -> Self {
        Self {
            id: g.id,
            image: g.image.clone(),
            name: g.name.clone(),
            role: g.role.clone(),
            instagram: g.instagram.clone(),
            twitter: g.twitter.clone(),
            threads: g.threads.clone(),
        }
    }
}
