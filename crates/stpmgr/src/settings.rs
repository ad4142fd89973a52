//! stpcfg settings file.
//!
//! Every field is optional in the file; missing fields take the defaults of a
//! standard SONiC image.

use serde::Deserialize;
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult, DbId, RedisStoreConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::{
    DaemonChannelConfig, DEFAULT_DAEMON_SOCKET, DEFAULT_REPLY_SOCKET, DEFAULT_TIMEOUT,
};

/// Largest accepted daemon timeout, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 10_000;

/// Daemon socket settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub socket_path: PathBuf,
    pub reply_socket_path: PathBuf,
    pub timeout_ms: u64,
    pub await_reply: bool,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_DAEMON_SOCKET),
            reply_socket_path: PathBuf::from(DEFAULT_REPLY_SOCKET),
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(1500),
            await_reply: false,
        }
    }
}

/// CONFIG_DB connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: DbId::ConfigDb.id(),
        }
    }
}

/// Top-level stpcfg settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StpCfgSettings {
    pub daemon: DaemonSettings,
    pub store: StoreSettings,
}

impl StpCfgSettings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> CfgMgrResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CfgMgrError::invalid_config(path.display().to_string(), format!("read failed: {}", e))
        })?;
        Self::from_json(&text)
    }

    /// Parses settings from JSON text.
    pub fn from_json(text: &str) -> CfgMgrResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CfgMgrError::invalid_config("settings", e.to_string()))
    }

    /// Rejects settings the channel cannot work with.
    pub fn validate(&self) -> CfgMgrResult<()> {
        if !(1..=MAX_TIMEOUT_MS).contains(&self.daemon.timeout_ms) {
            return Err(CfgMgrError::invalid_config(
                "daemon.timeout_ms",
                format!("must be in range 1-{}", MAX_TIMEOUT_MS),
            ));
        }
        if self.daemon.socket_path.as_os_str().is_empty() {
            return Err(CfgMgrError::invalid_config("daemon.socket_path", "must not be empty"));
        }
        if self.daemon.await_reply && self.daemon.reply_socket_path.as_os_str().is_empty() {
            return Err(CfgMgrError::invalid_config(
                "daemon.reply_socket_path",
                "must not be empty",
            ));
        }
        if self.store.host.is_empty() {
            return Err(CfgMgrError::invalid_config("store.host", "must not be empty"));
        }
        Ok(())
    }

    pub fn channel_config(&self) -> DaemonChannelConfig {
        DaemonChannelConfig {
            socket_path: self.daemon.socket_path.clone(),
            reply_socket_path: self.daemon.reply_socket_path.clone(),
            timeout: Duration::from_millis(self.daemon.timeout_ms),
            await_reply: self.daemon.await_reply,
        }
    }

    pub fn store_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::new(self.store.host.clone(), self.store.port, self.store.db)
    }
}
