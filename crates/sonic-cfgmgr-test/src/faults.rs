//! Fault injection for store error paths.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult, ConfigStore, FieldValues, MemoryStore};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Set,
    Modify,
    Delete,
    Keys,
}

impl StoreOp {
    fn name(&self) -> &'static str {
        match self {
            StoreOp::Get => "get",
            StoreOp::Set => "set",
            StoreOp::Modify => "modify",
            StoreOp::Delete => "delete",
            StoreOp::Keys => "keys",
        }
    }
}

/// A [`MemoryStore`] wrapper that fails selected operations on demand.
///
/// Failed calls leave the wrapped store untouched. Successful writes are
/// counted so tests can assert that nothing was persisted.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<StoreOp>>,
    writes: AtomicUsize,
}

impl FaultyStore {
    /// Creates a wrapper around an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail.
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().insert(op);
    }

    /// Makes all write operations fail.
    pub fn fail_writes(&self) {
        let mut failing = self.lock();
        failing.insert(StoreOp::Set);
        failing.insert(StoreOp::Modify);
        failing.insert(StoreOp::Delete);
    }

    /// Clears all injected faults.
    pub fn heal(&self) {
        self.lock().clear();
    }

    /// Number of writes that reached the wrapped store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<StoreOp>> {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, op: StoreOp) -> CfgMgrResult<()> {
        if self.lock().contains(&op) {
            debug!("Injected failure for {}", op.name());
            return Err(CfgMgrError::database(op.name(), "injected failure"));
        }
        Ok(())
    }

    fn count_write(&self, op: StoreOp) -> CfgMgrResult<()> {
        self.check(op)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FaultyStore {
    async fn get(&self, table: &str, key: &str) -> CfgMgrResult<Option<FieldValues>> {
        self.check(StoreOp::Get)?;
        self.inner.get(table, key).await
    }

    async fn set(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        self.count_write(StoreOp::Set)?;
        self.inner.set(table, key, fields).await
    }

    async fn modify(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        self.count_write(StoreOp::Modify)?;
        self.inner.modify(table, key, fields).await
    }

    async fn delete(&self, table: &str, key: Option<&str>) -> CfgMgrResult<()> {
        self.count_write(StoreOp::Delete)?;
        self.inner.delete(table, key).await
    }

    async fn keys(&self, table: &str) -> CfgMgrResult<Vec<String>> {
        self.check(StoreOp::Keys)?;
        self.inner.keys(table).await
    }
}
