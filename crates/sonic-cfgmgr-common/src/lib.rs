//! Common infrastructure for SONiC configuration manager tools.
//!
//! This crate provides shared functionality for the cfgmgr crates in the
//! Rust rewrite:
//!
//! - [`ConfigStore`]: the CONFIG_DB table contract (get/set/modify/delete/keys)
//! - [`MemoryStore`]: in-process store for tests and offline tooling
//! - `RedisStore`: Redis-backed CONFIG_DB (feature `redis`)
//! - [`fields`]: field/value helpers and composite key handling
//! - [`error`]: Error types for store operations
//!
//! # Example
//!
//! ```ignore
//! use sonic_cfgmgr_common::{field_values, ConfigStore, MemoryStore};
//!
//! async fn seed(store: &MemoryStore) -> sonic_cfgmgr_common::CfgMgrResult<()> {
//!     store
//!         .set("VLAN_MEMBER", "Vlan100|Ethernet0", field_values! {"tagging_mode" => "untagged"})
//!         .await
//! }
//! ```

pub mod error;
pub mod fields;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

// Re-export commonly used items at crate root
pub use error::{CfgMgrError, CfgMgrResult};
pub use fields::{join_key, split_key, DbId, FieldValue, FieldValues, FieldValuesExt};
#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use store::{ConfigStore, MemoryStore};
