//! In-memory [`ObjectStore`] for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewObject, ObjectStore, PresignedUrl, StoreError, StoreResult};

/// Base URL used when minting fake signed URLs
pub const MOCK_SIGNED_URL_BASE: &str = "https://store.invalid/bucket";

/// Object store that keeps everything in a `HashMap`
///
/// Every operation is counted, and each one can be told to fail so the
/// handler error paths can be exercised without a real backend.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, NewObject>>,
    put_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    presign_calls: AtomicUsize,
    fail_put: AtomicBool,
    fail_exists: AtomicBool,
    fail_presign: AtomicBool,
}

impl InMemoryObjectStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put_object` fail
    pub fn fail_puts(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `object_exists` fail
    pub fn fail_exists_checks(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `presigned_get_url` fail
    pub fn fail_presigns(&self, fail: bool) {
        self.fail_presign.store(fail, Ordering::SeqCst);
    }

    /// Number of `put_object` calls, successful or not
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `object_exists` calls
    #[must_use]
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of `presigned_get_url` calls
    #[must_use]
    pub fn presign_calls(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }

    /// Returns a copy of the object stored under `key`
    pub async fn get(&self, key: &str) -> Option<NewObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Resolves a URL minted by this store back to its object, honoring expiry
    pub async fn resolve_signed_url(&self, url: &str) -> Option<NewObject> {
        let rest = url.strip_prefix(MOCK_SIGNED_URL_BASE)?.strip_prefix('/')?;
        let (key, query) = rest.split_once('?')?;
        let expires = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("expires="))?
            .parse::<i64>()
            .ok()?;
        if Utc::now().timestamp() > expires {
            return None;
        }
        self.get(key).await
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(&self, key: &str, object: NewObject) -> StoreResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::S3Error("injected put failure".to_string()));
        }
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StoreError::UpstreamError(
                "injected head failure".to_string(),
            ));
        }
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<PresignedUrl> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StoreError::S3Error("injected presign failure".to_string()));
        }
        let expires_at = Utc::now() + expires_in;
        let url = format!(
            "{MOCK_SIGNED_URL_BASE}/{key}?expires={}&signature={}",
            expires_at.timestamp(),
            Uuid::new_v4().simple()
        );
        Ok(PresignedUrl { url, expires_at })
    }
}
