//! Create/update/delete of blog posts and the storage objects they own.
//!
//! Ordering rule shared by every mutating path: the database write commits
//! first, storage deletions follow. A committed row never references a
//! deleted object; a failed delete only leaves an unreferenced object behind.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::assets::AssetMatcher;
use crate::cleanup::{AssetCleaner, PurgeReport};
use crate::config::AssetSettings;
use crate::content::{bind_images, bind_thumbnail, content_tree, parse_content, unresolved_placeholders, ContentBlock};
use crate::error::{LifecycleError, LifecycleResult};
use crate::models::{BlogPage, BlogPost, BlogUpdate, Id, NewBlog, PageRequest, SimilarBlogs};
use crate::repo::BlogRepo;
use crate::storage::AssetStore;
use crate::upload::{orphaned, PendingFile, Uploader};

pub const RELATED_LIMIT: i64 = 4;

/// Client input for create and update, as read from the form.
#[derive(Debug, Clone, Default)]
pub struct BlogDraft {
    pub title: Option<String>,
    pub author: Option<String>,
    /// JSON array of content blocks.
    pub content: Option<String>,
    pub user_id: Option<String>,
}

pub struct BlogLifecycle {
    repo: Arc<dyn BlogRepo>,
    uploader: Uploader,
    matcher: AssetMatcher,
    cleaner: AssetCleaner,
}

impl BlogLifecycle {
    pub fn new(repo: Arc<dyn BlogRepo>, store: Arc<dyn AssetStore>, assets: &AssetSettings) -> Self {
        Self {
            repo,
            uploader: Uploader::new(store.clone(), assets.naming()),
            matcher: assets.matcher(),
            cleaner: AssetCleaner::new(store, assets.naming(), assets.delete_retry),
        }
    }

    /// Every asset the given state of a post owns.
    pub fn referenced_assets(&self, content: &[ContentBlock], thumbnail: Option<&str>) -> BTreeSet<String> {
        let mut assets = self.matcher.extract_asset_refs(&content_tree(content));
        if let Some(t) = thumbnail.filter(|t| !t.trim().is_empty()) {
            assets.insert(t.to_string());
        }
        assets
    }

    pub async fn create(&self, draft: BlogDraft, files: Vec<PendingFile>) -> LifecycleResult<BlogPost> {
        let title = draft
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LifecycleError::Validation("title is required".into()))?;
        let content = parse_content(&require_content(draft.content)?)?;

        let uploads = self.uploader.store_all(files).await?;
        let content = bind_images(content, &uploads.images);
        warn_unresolved(&content);
        let thumbnail = bind_thumbnail(None, uploads.thumbnail.as_ref());

        let new = NewBlog {
            id: Uuid::new_v4(),
            title,
            author: draft.author,
            user_id: draft.user_id,
            thumbnail,
            content,
        };
        let post = self.repo.create_blog(new).await.map_err(|e| orphaned(e, &uploads))?;
        info!(blog_id = %post.id, uploads = uploads.keys().len(), "blog created");
        Ok(post)
    }

    /// Replace title, author, thumbnail and the whole block sequence.
    pub async fn update(&self, id: Id, draft: BlogDraft, files: Vec<PendingFile>) -> LifecycleResult<BlogPost> {
        let old = self.repo.get_blog(id).await?;
        let content = parse_content(&require_content(draft.content)?)?;

        let uploads = self.uploader.store_all(files).await?;
        let content = bind_images(content, &uploads.images);
        warn_unresolved(&content);
        let thumbnail = bind_thumbnail(old.thumbnail.clone(), uploads.thumbnail.as_ref());

        let before = self.referenced_assets(&old.content, old.thumbnail.as_deref());
        let after = self.referenced_assets(&content, thumbnail.as_deref());
        let stale = self.cleaner.dropped_assets(&before, &after);

        let upd = BlogUpdate {
            title: draft.title.filter(|t| !t.trim().is_empty()).unwrap_or(old.title),
            author: draft.author.or(old.author),
            thumbnail,
            content,
        };
        let post = self.repo.update_blog(id, upd).await.map_err(|e| orphaned(e, &uploads))?;
        info!(blog_id = %id, stale = stale.len(), "blog updated");

        self.cleaner.purge(stale).await;
        Ok(post)
    }

    pub async fn delete(&self, id: Id) -> LifecycleResult<PurgeReport> {
        let post = self.repo.get_blog(id).await?;
        let owned = self.referenced_assets(&post.content, post.thumbnail.as_deref());

        self.repo.delete_blog(id).await?;
        info!(blog_id = %id, assets = owned.len(), "blog deleted");

        Ok(self.cleaner.purge(owned).await)
    }

    pub async fn get(&self, id: Id) -> LifecycleResult<BlogPost> {
        Ok(self.repo.get_blog(id).await?)
    }

    pub async fn list(&self, page: PageRequest) -> LifecycleResult<BlogPage> {
        if page.page < 1 || page.limit < 1 || page.limit > PageRequest::MAX_LIMIT || page.offset().is_none() {
            return Err(LifecycleError::Validation(format!(
                "page must be >= 1 and limit between 1 and {}",
                PageRequest::MAX_LIMIT
            )));
        }
        let (items, total) = self.repo.list_blogs(page).await?;
        Ok(BlogPage {
            items,
            total_count: total,
            total_pages: page.total_pages(total),
            current_page: page.page,
        })
    }

    /// The post plus a few other randomly picked posts.
    pub async fn similar(&self, id: Id) -> LifecycleResult<SimilarBlogs> {
        let blog = self.repo.get_blog(id).await?;
        let related = self.repo.random_blogs(id, RELATED_LIMIT).await?;
        Ok(SimilarBlogs { blog, related })
    }
}

fn require_content(raw: Option<String>) -> LifecycleResult<String> {
    raw.filter(|c| !c.trim().is_empty())
        .ok_or_else(|| LifecycleError::MalformedContent("content is required".into()))
}

fn warn_unresolved(content: &[ContentBlock]) {
    let missing = unresolved_placeholders(content);
    if !missing.is_empty() {
        warn!(placeholders = ?missing, "image placeholders without a matching upload");
    }
}
