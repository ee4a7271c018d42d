//! Embedded on-disk store for geo records.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::store_err;
use crate::{GeoRecord, Result};

const RECORDS: TableDefinition<&str, &str> = TableDefinition::new("ipv4");

/// Single-process store keyed by network prefix. Records never expire.
#[derive(Clone)]
pub struct GeoStore {
    db: Arc<Database>,
}

impl GeoStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(store_err)?;
        let txn = db.begin_write().map_err(store_err)?;
        txn.open_table(RECORDS).map_err(store_err)?;
        txn.commit().map_err(store_err)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub async fn get(&self, key: &str) -> Result<Option<GeoRecord>> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<GeoRecord>> {
            let txn = db.begin_read().map_err(store_err)?;
            let table = txn.open_table(RECORDS).map_err(store_err)?;
            match table.get(key.as_str()).map_err(store_err)? {
                Some(raw) => Ok(Some(serde_json::from_str(raw.value())?)),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn put(&self, key: &str, record: &GeoRecord) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        let raw = serde_json::to_string(record)?;
        tokio::task::spawn_blocking(move || -> Result<()> {
            let txn = db.begin_write().map_err(store_err)?;
            {
                let mut table = txn.open_table(RECORDS).map_err(store_err)?;
                table
                    .insert(key.as_str(), raw.as_str())
                    .map_err(store_err)?;
            }
            txn.commit().map_err(store_err)?;
            Ok(())
        })
        .await?
    }

    pub async fn count(&self) -> Result<u64> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<u64> {
            let txn = db.begin_read().map_err(store_err)?;
            let table = txn.open_table(RECORDS).map_err(store_err)?;
            table.len().map_err(store_err)
        })
        .await?
    }
}

impl std::fmt::Debug for GeoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoStore").finish_non_exhaustive()
    }
}
