//! Asset cache - versioned buckets of cached responses.
//!
//! The cache owns one bucket named after the deployment version. Installing
//! fills it with the asset manifest in a single transaction; activating
//! deletes every bucket with a different name. Entries are added lazily by
//! the request router afterwards.

use crate::{
    core::fetch::{AssetRequest, AssetResponse, Fetcher, ResponseType},
    entities::{CacheEntry, cache_entry},
    errors::{Error, Result},
};
use chrono::Utc;
use reqwest::Url;
use std::collections::BTreeSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

/// What [`AssetCache::initialize`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every manifest asset was fetched and written
    Installed,
    /// The bucket already held the whole manifest; nothing was fetched
    AlreadyComplete,
}

/// Handle to the current cache bucket.
///
/// Cloning is cheap; clones share the same database pool.
#[derive(Debug, Clone)]
pub struct AssetCache {
    db: DatabaseConnection,
    version: String,
}

impl AssetCache {
    /// Creates a handle for the bucket named `version`
    #[must_use]
    pub fn new(db: DatabaseConnection, version: impl Into<String>) -> Self {
        Self {
            db,
            version: version.into(),
        }
    }

    /// Current bucket name
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fetches every manifest path (resolved against `origin`) and stores
    /// the responses in one batch.
    ///
    /// Nothing is written unless every fetch succeeds with a cacheable
    /// response. A bucket that already holds every manifest entry is left
    /// alone and nothing is fetched, so a restart works without the origin.
    #[instrument(skip(self, fetcher, manifest), fields(bucket = %self.version))]
    pub async fn initialize<F: Fetcher>(
        &self,
        fetcher: &F,
        origin: &Url,
        manifest: &[String],
    ) -> Result<InstallOutcome> {
        let mut requests = Vec::with_capacity(manifest.len());
        for path in manifest {
            let url = origin.join(path).map_err(|e| Error::CacheInstall {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            requests.push((path, AssetRequest::get(url)));
        }

        let keys: BTreeSet<&str> = requests.iter().map(|(_, r)| r.cache_key()).collect();
        if self.holds_all(&keys).await? {
            info!("Cache bucket '{}' already complete, skipping install", self.version);
            return Ok(InstallOutcome::AlreadyComplete);
        }

        info!("Installing {} manifest assets", manifest.len());
        let mut fetched = Vec::with_capacity(requests.len());
        for (path, request) in &requests {
            let response = fetcher
                .fetch(request)
                .await
                .map_err(|e| Error::CacheInstall {
                    path: (*path).clone(),
                    reason: e.to_string(),
                })?;
            if !response.is_cacheable() {
                return Err(Error::CacheInstall {
                    path: (*path).clone(),
                    reason: format!("unexpected status {}", response.status),
                });
            }
            fetched.push((request.cache_key(), response));
        }

        let txn = self.db.begin().await?;
        for (key, response) in &fetched {
            CacheEntry::delete_many()
                .filter(cache_entry::Column::Bucket.eq(self.version.as_str()))
                .filter(cache_entry::Column::RequestKey.eq(*key))
                .exec(&txn)
                .await?;
            self.entry_model(key, response)?.insert(&txn).await?;
        }
        txn.commit().await?;
        info!("Cache bucket '{}' installed", self.version);
        Ok(InstallOutcome::Installed)
    }

    async fn holds_all(&self, keys: &BTreeSet<&str>) -> Result<bool> {
        let present = CacheEntry::find()
            .filter(cache_entry::Column::Bucket.eq(self.version.as_str()))
            .filter(cache_entry::Column::RequestKey.is_in(keys.iter().copied()))
            .count(&self.db)
            .await?;
        Ok(u64::try_from(keys.len()).is_ok_and(|wanted| wanted == present))
    }

    /// Deletes every bucket whose name differs from the current version.
    ///
    /// Returns the names of the deleted buckets.
    #[instrument(skip(self), fields(bucket = %self.version))]
    pub async fn purge_stale(&self) -> Result<Vec<String>> {
        let stale: Vec<String> = self
            .bucket_names()
            .await?
            .into_iter()
            .filter(|name| name != &self.version)
            .collect();

        for name in &stale {
            let deleted = CacheEntry::delete_many()
                .filter(cache_entry::Column::Bucket.eq(name.as_str()))
                .exec(&self.db)
                .await?;
            info!("Deleted stale cache bucket '{}' ({} entries)", name, deleted.rows_affected);
        }
        Ok(stale)
    }

    /// Names of all existing buckets, sorted
    pub async fn bucket_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = CacheEntry::find()
            .select_only()
            .column(cache_entry::Column::Bucket)
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await?;
        names.sort();
        Ok(names)
    }

    /// Cached response for `key`, if any
    pub async fn lookup(&self, key: &str) -> Result<Option<AssetResponse>> {
        let entry = CacheEntry::find()
            .filter(cache_entry::Column::Bucket.eq(self.version.as_str()))
            .filter(cache_entry::Column::RequestKey.eq(key))
            .one(&self.db)
            .await?;

        let Some(entry) = entry else {
            debug!("Cache miss for {}", key);
            return Ok(None);
        };
        debug!("Cache hit for {}", key);

        let headers = serde_json::from_str(&entry.headers).unwrap_or_else(|e| {
            warn!("Dropping unreadable cached headers for {}: {}", key, e);
            Vec::new()
        });
        let status = u16::try_from(entry.status).map_err(|_| Error::Config {
            message: format!("Cached status {} for {key} is out of range", entry.status),
        })?;
        Ok(Some(AssetResponse {
            status,
            headers,
            body: entry.body,
            response_type: ResponseType::Basic,
        }))
    }

    /// Inserts or overwrites the entry for `key`.
    ///
    /// Callers only pass cacheable responses; anything else is ignored.
    pub async fn store(&self, key: &str, response: &AssetResponse) -> Result<()> {
        if !response.is_cacheable() {
            debug!("Not caching {} (status {})", key, response.status);
            return Ok(());
        }
        let txn = self.db.begin().await?;
        CacheEntry::delete_many()
            .filter(cache_entry::Column::Bucket.eq(self.version.as_str()))
            .filter(cache_entry::Column::RequestKey.eq(key))
            .exec(&txn)
            .await?;
        self.entry_model(key, response)?.insert(&txn).await?;
        txn.commit().await?;
        debug!("Cached {}", key);
        Ok(())
    }

    /// Number of entries in the current bucket
    pub async fn entry_count(&self) -> Result<u64> {
        CacheEntry::find()
            .filter(cache_entry::Column::Bucket.eq(self.version.as_str()))
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    fn entry_model(&self, key: &str, response: &AssetResponse) -> Result<cache_entry::ActiveModel> {
        Ok(cache_entry::ActiveModel {
            bucket: Set(self.version.clone()),
            request_key: Set(key.to_string()),
            status: Set(i32::from(response.status)),
            headers: Set(serde_json::to_string(&response.headers)?),
            body: Set(response.body.clone()),
            cached_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        })
    }
}
