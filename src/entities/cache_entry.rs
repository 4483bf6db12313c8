//! Cache entry entity - one cached response inside a versioned bucket.
//!
//! A bucket is nothing more than the set of rows sharing a `bucket` name;
//! deleting a bucket deletes all of its rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cached response row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cache_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Versioned bucket name (e.g., `"iitmz-water-mgmt-v1"`)
    pub bucket: String,
    /// Request key, the absolute URL of the cached request
    pub request_key: String,
    /// HTTP status of the stored response
    pub status: i32,
    /// Response headers as a JSON array of `[name, value]` pairs
    pub headers: String,
    /// Response body bytes
    pub body: Vec<u8>,
    /// When the entry was written
    pub cached_at: DateTime,
}

/// `CacheEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
