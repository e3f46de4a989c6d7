use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::models::{record_id, Action, CloudReply, CloudRequest, Collection, Stats, ID_FIELD};

use super::mock;

/// Consider a stored collection stale after 1 hour.
const STORE_STALE_MINUTES: i64 = 60;

/// Prefix for per-collection store files
const FILE_PREFIX: &str = "admin_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > STORE_STALE_MINUTES
    }
}

/// Offline copy of the cloud collections, one JSON file per collection.
///
/// Every operation is a read-modify-write of a whole file, serialised by a
/// process-wide lock.
pub struct LocalStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // A panic mid-write leaves at worst a stale file; keep serving
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}{}.json", FILE_PREFIX, collection))
    }

    fn read(&self, collection: Collection) -> Result<Option<CachedData<Vec<Value>>>> {
        let path = self.store_path(collection);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file: {}", collection))?;

        let cached: CachedData<Vec<Value>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse store file: {}", collection))?;

        Ok(Some(cached))
    }

    fn write(&self, collection: Collection, items: &[Value]) -> Result<()> {
        let cached = CachedData::new(items);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.store_path(collection), contents)
            .with_context(|| format!("Failed to write store file: {}", collection))?;
        Ok(())
    }

    // ===== Whole collections =====

    /// Stored records for a collection; a collection never stored reads as empty.
    pub fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let _guard = self.guard();
        Ok(self.read(collection)?.map(|c| c.data).unwrap_or_default())
    }

    /// Stored records with their timestamp, if the collection was ever stored.
    pub fn cached(&self, collection: Collection) -> Result<Option<CachedData<Vec<Value>>>> {
        let _guard = self.guard();
        self.read(collection)
    }

    /// Replace a collection's records.
    pub fn save(&self, collection: Collection, items: &[Value]) -> Result<()> {
        let _guard = self.guard();
        self.write(collection, items)
    }

    // ===== Record mutations =====

    /// Append a record, returning the id assigned to it.
    pub fn add(&self, collection: Collection, item: Value) -> Result<String> {
        let Value::Object(fields) = item else {
            anyhow::bail!("{} records must be JSON objects", collection);
        };

        let _guard = self.guard();
        let mut items = self.read(collection)?.map(|c| c.data).unwrap_or_default();

        let id = Self::next_id(&items);
        let now = Utc::now().to_rfc3339();
        let mut record = Map::new();
        record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        record.extend(fields.into_iter().filter(|(k, _)| k != ID_FIELD));
        record.insert("createTime".to_string(), Value::String(now.clone()));
        record.insert("updateTime".to_string(), Value::String(now));

        items.push(Value::Object(record));
        self.write(collection, &items)?;
        debug!(collection = %collection, id = %id, "Added record to local store");
        Ok(id)
    }

    /// Millisecond timestamp id, bumped until unique within the collection.
    fn next_id(items: &[Value]) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        loop {
            let id = candidate.to_string();
            if !items.iter().any(|r| record_id(r) == Some(id.as_str())) {
                return id;
            }
            candidate += 1;
        }
    }

    /// Merge `patch` into the record with the given id.
    /// Returns false when no such record exists.
    pub fn update(&self, collection: Collection, id: &str, patch: Value) -> Result<bool> {
        let _guard = self.guard();
        let mut items = self.read(collection)?.map(|c| c.data).unwrap_or_default();

        let Some(Value::Object(record)) = items.iter_mut().find(|r| record_id(r) == Some(id)) else {
            return Ok(false);
        };

        if let Value::Object(fields) = patch {
            record.extend(fields.into_iter().filter(|(k, _)| k != ID_FIELD));
        }
        record.insert("updateTime".to_string(), Value::String(Utc::now().to_rfc3339()));

        self.write(collection, &items)?;
        debug!(collection = %collection, id, "Updated record in local store");
        Ok(true)
    }

    /// Remove every record with the given id. Deleting an absent id is not an error.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let _guard = self.guard();
        let mut items = self.read(collection)?.map(|c| c.data).unwrap_or_default();
        items.retain(|r| record_id(r) != Some(id));
        self.write(collection, &items)?;
        debug!(collection = %collection, id, "Deleted record from local store");
        Ok(())
    }

    // ===== Store maintenance =====

    /// Counts for every collection, read under one lock.
    pub fn stats(&self) -> Result<Stats> {
        let _guard = self.guard();
        let mut stats = Stats::default();
        for collection in Collection::ALL {
            let count = self.read(collection)?.map_or(0, |c| c.data.len());
            stats.set(collection, count);
        }
        Ok(stats)
    }

    /// Seed every collection that was never stored with the canned dataset.
    pub fn seed_if_empty(&self) -> Result<()> {
        let _guard = self.guard();
        for collection in Collection::ALL {
            if !self.store_path(collection).exists() {
                self.write(collection, &mock::dataset(collection))?;
                debug!(collection = %collection, "Seeded local store with fallback data");
            }
        }
        Ok(())
    }

    /// Remove all stored collections so the next reads go to the cloud.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        for collection in Collection::ALL {
            let path = self.store_path(collection);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove store file: {}", collection))?;
            }
        }
        Ok(())
    }

    /// Record counts and ages for every collection, logging unreadable files.
    pub fn summary(&self) -> StoreSummary {
        let entries = Collection::ALL
            .into_iter()
            .map(|collection| match self.cached(collection) {
                Ok(Some(cached)) => StoreEntry {
                    collection,
                    count: cached.data.len(),
                    cached_at: Some(cached.cached_at),
                    age: Some(cached.age_display()),
                    stale: cached.is_stale(),
                },
                Ok(None) => StoreEntry::missing(collection),
                Err(e) => {
                    debug!(collection = %collection, error = %e, "Failed to load store for summary");
                    StoreEntry::missing(collection)
                }
            })
            .collect();
        StoreSummary { entries }
    }

    // ===== Cloud-function emulation =====

    /// Answer a cloud request from the local store, the way the `httpAPI`
    /// function would. Never fails; problems are reported in the reply.
    pub fn apply(&self, request: &CloudRequest) -> CloudReply {
        match self.try_apply(request) {
            Ok(reply) => reply,
            Err(e) => CloudReply::failed(e.to_string()),
        }
    }

    fn try_apply(&self, request: &CloudRequest) -> Result<CloudReply> {
        let collection = || {
            request
                .collection
                .ok_or_else(|| anyhow::anyhow!("collection is required for {:?}", request.action))
        };
        let id = || {
            request
                .id
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("id is required for {:?}", request.action))
        };

        let reply = match request.action {
            Action::Get => {
                let items = self.load(collection()?)?;
                let filtered = filter_where(items, request.query.as_ref());
                CloudReply::ok(Value::Array(filtered))
            }
            Action::Add => {
                let item = request.data.clone().unwrap_or_else(|| json!({}));
                let new_id = self.add(collection()?, item)?;
                CloudReply::ok(json!({ ID_FIELD: new_id }))
            }
            Action::Update => {
                let patch = request.data.clone().unwrap_or_else(|| json!({}));
                if self.update(collection()?, id()?, patch)? {
                    CloudReply::done()
                } else {
                    CloudReply::failed("record not found")
                }
            }
            Action::Delete => {
                self.delete(collection()?, id()?)?;
                CloudReply::done()
            }
            Action::GetStats => CloudReply::ok(serde_json::to_value(self.stats()?)?),
            Action::TestConnection => {
                let stats = self.stats()?;
                CloudReply::ok(json!({
                    "products": stats.product_count,
                    "regions": stats.region_count,
                    "banners": stats.banner_count,
                    "orders": stats.order_count,
                    "message": "local store mode",
                }))
            }
        };
        Ok(reply)
    }
}

/// Keep records whose fields equal every field of `query.where`.
/// A query without a `where` object keeps everything.
fn filter_where(items: Vec<Value>, query: Option<&Value>) -> Vec<Value> {
    let Some(Value::Object(conditions)) = query.and_then(|q| q.get("where")) else {
        return items;
    };
    items
        .into_iter()
        .filter(|record| conditions.iter().all(|(k, v)| record.get(k) == Some(v)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreEntry {
    pub collection: Collection,
    pub count: usize,
    pub cached_at: Option<DateTime<Utc>>,
    pub age: Option<String>,
    pub stale: bool,
}

impl StoreEntry {
    fn missing(collection: Collection) -> Self {
        Self {
            collection,
            count: 0,
            cached_at: None,
            age: None,
            stale: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSummary {
    pub entries: Vec<StoreEntry>,
}

impl StoreSummary {
    /// Age of the most recently stored collection
    pub fn last_updated(&self) -> String {
        self.entries
            .iter()
            .filter(|e| e.cached_at.is_some())
            .max_by_key(|e| e.cached_at)
            .and_then(|e| e.age.clone())
            .unwrap_or_else(|| "never".to_string())
    }

    pub fn any_stale(&self) -> bool {
        self.entries.iter().any(|e| e.stale)
    }
}

// ============================================================================
// Tests
// ============================================================================
