#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use valley_cms::cleanup::RetryPolicy;
use valley_cms::config::AssetSettings;
use valley_cms::content::UploadField;
use valley_cms::models::*;
use valley_cms::repo::inmem::InMemRepo;
use valley_cms::repo::{BlogRepo, GuestRepo, RepoError, RepoResult};
use valley_cms::storage::{AssetStore, StoreError};
use valley_cms::upload::PendingFile;

pub const BASE_URL: &str = "https://media.s3.us-east-1.amazonaws.com";
pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R'];

/// Calls observed across the store and the repository, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Put(String),
    Delete(String),
    Write(&'static str),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

pub fn deletes(log: &EventLog) -> Vec<String> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Delete(k) => Some(k),
            _ => None,
        })
        .collect()
}

pub fn puts(log: &EventLog) -> Vec<String> {
    events(log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Put(k) => Some(k),
            _ => None,
        })
        .collect()
}

/// Object store double keeping objects in a map.
#[derive(Clone)]
pub struct MemoryStore {
    pub log: EventLog,
    pub objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Fail every put after this many successful ones.
    pub put_budget: Arc<Mutex<Option<usize>>>,
    /// Remaining forced failures per key; `usize::MAX` fails forever.
    pub delete_failures: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            objects: Arc::default(),
            put_budget: Arc::default(),
            delete_failures: Arc::default(),
        }
    }

    pub fn fail_puts_after(&self, n: usize) {
        *self.put_budget.lock().unwrap() = Some(n);
    }

    pub fn fail_deletes(&self, key: &str, times: usize) {
        self.delete_failures.lock().unwrap().insert(key.to_string(), times);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn put(&self, key: &str, _mime: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        {
            let mut budget = self.put_budget.lock().unwrap();
            if let Some(left) = budget.as_mut() {
                if *left == 0 {
                    return Err(StoreError::Upload("store unavailable".into()));
                }
                *left -= 1;
            }
        }
        self.log.lock().unwrap().push(Event::Put(key.to_string()));
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(valley_cms::assets::asset_url(BASE_URL, key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.log.lock().unwrap().push(Event::Delete(key.to_string()));
        {
            let mut failures = self.delete_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(key) {
                if *left > 0 {
                    if *left != usize::MAX {
                        *left -= 1;
                    }
                    return Err(StoreError::Delete("transient".into()));
                }
            }
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory repository that records row writes into the shared log.
#[derive(Clone)]
pub struct RecordingRepo {
    pub inner: InMemRepo,
    pub log: EventLog,
    pub fail_writes: Arc<AtomicBool>,
}

impl RecordingRepo {
    pub fn new(log: EventLog) -> Self {
        Self { inner: InMemRepo::new(), log, fail_writes: Arc::default() }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn record(&self, what: &'static str) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Internal("database unavailable".into()));
        }
        self.log.lock().unwrap().push(Event::Write(what));
        Ok(())
    }
}

#[async_trait]
impl BlogRepo for RecordingRepo {
    async fn create_blog(&self, new: NewBlog) -> RepoResult<BlogPost> {
        self.record("create_blog")?;
        self.inner.create_blog(new).await
    }
    async fn get_blog(&self, id: Id) -> RepoResult<BlogPost> {
        self.inner.get_blog(id).await
    }
    async fn update_blog(&self, id: Id, upd: BlogUpdate) -> RepoResult<BlogPost> {
        self.record("update_blog")?;
        self.inner.update_blog(id, upd).await
    }
    async fn delete_blog(&self, id: Id) -> RepoResult<()> {
        self.record("delete_blog")?;
        self.inner.delete_blog(id).await
    }
    async fn list_blogs(&self, page: PageRequest) -> RepoResult<(Vec<BlogSummary>, i64)> {
        self.inner.list_blogs(page).await
    }
    async fn random_blogs(&self, exclude: Id, limit: i64) -> RepoResult<Vec<BlogSummary>> {
        self.inner.random_blogs(exclude, limit).await
    }
}

#[async_trait]
impl GuestRepo for RecordingRepo {
    async fn create_guest(&self, new: NewGuest) -> RepoResult<Guest> {
        self.record("create_guest")?;
        self.inner.create_guest(new).await
    }
    async fn get_guest(&self, id: Id) -> RepoResult<Guest> {
        self.inner.get_guest(id).await
    }
    async fn list_guests(&self) -> RepoResult<Vec<GuestSummary>> {
        self.inner.list_guests().await
    }
    async fn update_guest(&self, id: Id, upd: GuestUpdate) -> RepoResult<Guest> {
        self.record("update_guest")?;
        self.inner.update_guest(id, upd).await
    }
    async fn delete_guest(&self, id: Id) -> RepoResult<()> {
        self.record("delete_guest")?;
        self.inner.delete_guest(id).await
    }
}

/// Asset settings matching `MemoryStore` URLs, with no retry delay.
pub fn asset_settings() -> AssetSettings {
    AssetSettings {
        prefix: "Dashboard".into(),
        url_markers: vec![BASE_URL.into()],
        delete_retry: RetryPolicy { max_attempts: 3, base_delay: Duration::ZERO },
    }
}

pub fn image(field: UploadField, name: &str) -> PendingFile {
    PendingFile { field, file_name: name.into(), mime: "image/png".into(), bytes: PNG.to_vec() }
}

pub fn key_of(url: &str) -> String {
    valley_cms::assets::AssetNaming::new("Dashboard")
        .resolve_key(url)
        .expect("asset url resolves")
}
