//! Guest profiles: same write-then-delete protocol as blog posts, with a
//! single portrait image as the only owned asset.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::cleanup::{AssetCleaner, PurgeReport};
use crate::config::AssetSettings;
use crate::content::bind_thumbnail;
use crate::error::{LifecycleError, LifecycleResult};
use crate::models::{Guest, GuestProfile, GuestSummary, GuestUpdate, Id, NewGuest};
use crate::repo::GuestRepo;
use crate::storage::AssetStore;
use crate::upload::{orphaned, PendingFile, Uploader};

#[derive(Debug, Clone, Default)]
pub struct GuestDraft {
    pub name: Option<String>,
    pub role: Option<String>,
    pub about: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
    pub heading_one: Option<String>,
    pub description_one: Option<String>,
    pub heading_two: Option<String>,
    pub description_two: Option<String>,
    pub heading_three: Option<String>,
    pub description_three: Option<String>,
    pub youtube_link: Option<String>,
    pub user_id: Option<String>,
}

impl GuestDraft {
    /// Overlay the provided fields on `base`.
    fn merge_into(self, base: GuestProfile) -> GuestProfile {
        GuestProfile {
            name: self.name.unwrap_or(base.name),
            role: self.role.unwrap_or(base.role),
            about: self.about.unwrap_or(base.about),
            instagram: self.instagram.or(base.instagram),
            twitter: self.twitter.or(base.twitter),
            threads: self.threads.or(base.threads),
            heading_one: self.heading_one.unwrap_or(base.heading_one),
            description_one: self.description_one.unwrap_or(base.description_one),
            heading_two: self.heading_two.unwrap_or(base.heading_two),
            description_two: self.description_two.unwrap_or(base.description_two),
            heading_three: self.heading_three.unwrap_or(base.heading_three),
            description_three: self.description_three.unwrap_or(base.description_three),
            youtube_link: self.youtube_link.unwrap_or(base.youtube_link),
        }
    }
}

fn missing_required(p: &GuestProfile) -> Vec<&'static str> {
    [
        ("name", &p.name),
        ("role", &p.role),
        ("about", &p.about),
        ("heading_one", &p.heading_one),
        ("description_one", &p.description_one),
        ("heading_two", &p.heading_two),
        ("description_two", &p.description_two),
        ("heading_three", &p.heading_three),
        ("description_three", &p.description_three),
        ("youtube_link", &p.youtube_link),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(k, _)| k)
    .collect()
}

pub struct GuestLifecycle {
    repo: Arc<dyn GuestRepo>,
    uploader: Uploader,
    cleaner: AssetCleaner,
}

impl GuestLifecycle {
    pub fn new(repo: Arc<dyn GuestRepo>, store: Arc<dyn AssetStore>, assets: &AssetSettings) -> Self {
        Self {
            repo,
            uploader: Uploader::new(store.clone(), assets.naming()),
            cleaner: AssetCleaner::new(store, assets.naming(), assets.delete_retry),
        }
    }

    pub async fn create(&self, draft: GuestDraft, files: Vec<PendingFile>) -> LifecycleResult<Guest> {
        let user_id = draft.user_id.clone();
        let profile = draft.merge_into(GuestProfile::default());
        let missing = missing_required(&profile);
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!("missing required fields: {}", missing.join(", "))));
        }
        if files.is_empty() {
            return Err(LifecycleError::Validation("guest_image is required".into()));
        }

        let uploads = self.uploader.store_all(files).await?;
        let image = bind_thumbnail(None, uploads.guest_image.as_ref());
        let guest = self
            .repo
            .create_guest(NewGuest { id: Uuid::new_v4(), image, user_id, profile })
            .await
            .map_err(|e| orphaned(e, &uploads))?;
        info!(guest_id = %guest.id, "guest created");
        Ok(guest)
    }

    /// Update the profile; a new image replaces the stored one, which is
    /// deleted only after the row no longer points at it.
    pub async fn update(&self, id: Id, draft: GuestDraft, files: Vec<PendingFile>) -> LifecycleResult<Guest> {
        let old = self.repo.get_guest(id).await?;
        let profile = draft.merge_into(GuestProfile::from(&old));
        let missing = missing_required(&profile);
        if !missing.is_empty() {
            return Err(LifecycleError::Validation(format!("fields cannot be blank: {}", missing.join(", "))));
        }

        let uploads = self.uploader.store_all(files).await?;
        let image = bind_thumbnail(old.image.clone(), uploads.guest_image.as_ref());
        let replaced = self.cleaner.dropped_assets(&old.image, &image);

        let guest = self
            .repo
            .update_guest(id, GuestUpdate { image, profile })
            .await
            .map_err(|e| orphaned(e, &uploads))?;
        info!(guest_id = %id, image_replaced = !replaced.is_empty(), "guest updated");

        self.cleaner.purge(replaced).await;
        Ok(guest)
    }

    pub async fn delete(&self, id: Id) -> LifecycleResult<PurgeReport> {
        let guest = self.repo.get_guest(id).await?;
        self.repo.delete_guest(id).await?;
        info!(guest_id = %id, "guest deleted");
        Ok(self.cleaner.purge(guest.image).await)
    }

    pub async fn get(&self, id: Id) -> LifecycleResult<Guest> {
        Ok(self.repo.get_guest(id).await?)
    }

    pub async fn list(&self) -> LifecycleResult<Vec<GuestSummary>> {
        Ok(self.repo.list_guests().await?)
    }
}
