//! Configuration store contract.
//!
//! CONFIG_DB is modelled as a set of tables holding rows addressed by a
//! (possibly composite) key. Managers never cache rows across calls; they
//! re-read through this trait immediately before computing a change.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CfgMgrResult;
use crate::fields::{FieldValues, FieldValuesExt};

/// Key/value table store with get/set/delete/iterate operations.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Reads a row. Returns `None` when the row does not exist.
    async fn get(&self, table: &str, key: &str) -> CfgMgrResult<Option<FieldValues>>;

    /// Replaces a row with exactly the given fields.
    async fn set(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()>;

    /// Merges fields into a row, creating it when absent.
    async fn modify(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()>;

    /// Deletes one row, or the whole table when `key` is `None`.
    async fn delete(&self, table: &str, key: Option<&str>) -> CfgMgrResult<()>;

    /// Lists the keys present in a table, in no particular order.
    async fn keys(&self, table: &str) -> CfgMgrResult<Vec<String>>;

    /// Reads a single field of a row.
    async fn get_field(&self, table: &str, key: &str, field: &str) -> CfgMgrResult<Option<String>> {
        Ok(self
            .get(table, key)
            .await?
            .and_then(|fvs| fvs.get_field(field).map(str::to_string)))
    }

    /// Returns true if the row exists.
    async fn exists(&self, table: &str, key: &str) -> CfgMgrResult<bool> {
        Ok(self.get(table, key).await?.is_some())
    }
}

type Table = BTreeMap<String, FieldValues>;

/// In-process store used by tests and offline tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in a table.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, table: &str, key: &str) -> CfgMgrResult<Option<FieldValues>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    async fn set(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        debug!(table, key, "memory set");
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), fields);
        Ok(())
    }

    async fn modify(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        debug!(table, key, "memory modify");
        let mut tables = self.tables.write().await;
        let row = tables
            .entry(table.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        for (field, value) in fields {
            row.set_field(&field, value);
        }
        Ok(())
    }

    async fn delete(&self, table: &str, key: Option<&str>) -> CfgMgrResult<()> {
        debug!(table, ?key, "memory delete");
        let mut tables = self.tables.write().await;
        match key {
            Some(key) => {
                if let Some(t) = tables.get_mut(table) {
                    t.remove(key);
                    if t.is_empty() {
                        tables.remove(table);
                    }
                }
            }
            None => {
                tables.remove(table);
            }
        }
        Ok(())
    }

    async fn keys(&self, table: &str) -> CfgMgrResult<Vec<String>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }
}
