//! Redis-backed CONFIG_DB store.
//!
//! Rows live in Redis hashes named `TABLE|key`, the layout used by
//! `ConfigDBConnector`. An empty row is stored with the `NULL` placeholder
//! field so that it still exists as a key.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::fields::{DbId, FieldValues, KEY_SEPARATOR};
use crate::store::ConfigStore;

/// Placeholder field written for rows without fields.
pub const NULL_FIELD: &str = "NULL";

/// Configuration for a Redis connection.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Database number
    pub db: i64,
}

impl RedisStoreConfig {
    /// Creates a new Redis configuration.
    pub fn new(host: impl Into<String>, port: u16, db: i64) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    /// Creates CONFIG_DB connection config.
    pub fn config_db(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, DbId::ConfigDb.id())
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// CONFIG_DB store over a managed Redis connection.
pub struct RedisStore {
    config: RedisStoreConfig,
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis.
    pub async fn connect(config: RedisStoreConfig) -> CfgMgrResult<Self> {
        let uri = config.uri();

        let client = redis::Client::open(uri.clone())
            .map_err(|e| CfgMgrError::database("open", format!("{}: {}", uri, e)))?;

        let connection = client.get_connection_manager().await.map_err(|e| {
            CfgMgrError::database("connect", format!("Failed to create connection: {}", e))
        })?;

        info!("Connected to Redis: {} (db={})", config.host, config.db);

        Ok(Self { config, connection })
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    fn row_key(table: &str, key: &str) -> String {
        format!("{}{}{}", table, KEY_SEPARATOR, key)
    }

    fn encode_fields(fields: FieldValues) -> FieldValues {
        if fields.is_empty() {
            vec![(NULL_FIELD.to_string(), NULL_FIELD.to_string())]
        } else {
            fields
        }
    }
}

#[async_trait]
impl ConfigStore for RedisStore {
    async fn get(&self, table: &str, key: &str) -> CfgMgrResult<Option<FieldValues>> {
        let mut conn = self.connection.clone();
        let fvs: HashMap<String, String> = conn.hgetall(Self::row_key(table, key)).await?;
        if fvs.is_empty() {
            return Ok(None);
        }
        let mut row: FieldValues = fvs
            .into_iter()
            .filter(|(f, _)| f != NULL_FIELD)
            .collect();
        row.sort();
        Ok(Some(row))
    }

    async fn set(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        let row_key = Self::row_key(table, key);
        debug!("HSET (replace) {}", row_key);
        let fields = Self::encode_fields(fields);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&row_key)
            .ignore()
            .hset_multiple(&row_key, fields.as_slice())
            .ignore();

        let mut conn = self.connection.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn modify(&self, table: &str, key: &str, fields: FieldValues) -> CfgMgrResult<()> {
        let row_key = Self::row_key(table, key);
        debug!("HSET (merge) {}", row_key);
        let fields = Self::encode_fields(fields);

        let mut conn = self.connection.clone();
        let _: () = conn.hset_multiple(&row_key, fields.as_slice()).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, key: Option<&str>) -> CfgMgrResult<()> {
        let mut conn = self.connection.clone();
        let row_keys: Vec<String> = match key {
            Some(key) => vec![Self::row_key(table, key)],
            None => conn.keys(format!("{}{}*", table, KEY_SEPARATOR)).await?,
        };
        if row_keys.is_empty() {
            return Ok(());
        }
        debug!("DEL {} key(s) from {}", row_keys.len(), table);
        let _: () = conn.del(row_keys).await?;
        Ok(())
    }

    async fn keys(&self, table: &str) -> CfgMgrResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let prefix = format!("{}{}", table, KEY_SEPARATOR);
        let row_keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(row_keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_db_uri() {
        let config = RedisStoreConfig::config_db("127.0.0.1", 6379);
        assert_eq!(config.uri(), "redis://127.0.0.1:6379/4");
    }

    #[test]
    fn test_row_key() {
        assert_eq!(
            RedisStore::row_key("XSTP_MST_INTERFACE", "1|Ethernet0"),
            "XSTP_MST_INTERFACE|1|Ethernet0"
        );
    }

    #[test]
    fn test_empty_row_uses_placeholder() {
        let encoded = RedisStore::encode_fields(vec![]);
        assert_eq!(
            encoded,
            vec![(NULL_FIELD.to_string(), NULL_FIELD.to_string())]
        );

        let fields = vec![("value".to_string(), "enabled".to_string())];
        assert_eq!(RedisStore::encode_fields(fields.clone()), fields);
    }
}
