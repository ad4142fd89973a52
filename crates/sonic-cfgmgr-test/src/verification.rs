//! Verification helpers for testing configuration managers
//!
//! Provides assertion helpers to verify CONFIG_DB state after a manager ran.

use sonic_cfgmgr_common::{CfgMgrError, ConfigStore, FieldValues, FieldValuesExt};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Store error: {0}")]
    Store(#[from] CfgMgrError),

    #[error("Expected row '{table}|{key}' not found")]
    KeyNotFound { table: String, key: String },

    #[error("Row '{table}|{key}' exists but was expected to be absent")]
    UnexpectedKey { table: String, key: String },

    #[error("Expected field '{field}' not found in '{table}|{key}'")]
    FieldNotFound {
        table: String,
        key: String,
        field: String,
    },

    #[error("Field '{field}' of '{table}|{key}' was expected to be absent, got '{actual}'")]
    UnexpectedField {
        table: String,
        key: String,
        field: String,
        actual: String,
    },

    #[error("Value mismatch for {table}|{key}:{field}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        table: String,
        key: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} rows in table '{table}', found {actual}")]
    KeyCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// CONFIG_DB verification helper
pub struct StoreVerifier<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> StoreVerifier<'a> {
    /// Create a new verifier over a store
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Verify that a row exists
    pub async fn assert_key_exists(&self, table: &str, key: &str) -> VerifyResult<()> {
        if !self.store.exists(table, key).await? {
            return Err(VerificationError::KeyNotFound {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Verify that a row does not exist
    pub async fn assert_key_not_exists(&self, table: &str, key: &str) -> VerifyResult<()> {
        if self.store.exists(table, key).await? {
            return Err(VerificationError::UnexpectedKey {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Verify that a field has a specific value
    pub async fn assert_field_value(
        &self,
        table: &str,
        key: &str,
        field: &str,
        expected: &str,
    ) -> VerifyResult<()> {
        let row = self.row(table, key).await?;

        match row.get_field(field) {
            None => Err(VerificationError::FieldNotFound {
                table: table.to_string(),
                key: key.to_string(),
                field: field.to_string(),
            }),
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(VerificationError::ValueMismatch {
                table: table.to_string(),
                key: key.to_string(),
                field: field.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    /// Verify that a field is absent from an existing row
    pub async fn assert_field_absent(&self, table: &str, key: &str, field: &str) -> VerifyResult<()> {
        let row = self.row(table, key).await?;

        match row.get_field(field) {
            None => Ok(()),
            Some(actual) => Err(VerificationError::UnexpectedField {
                table: table.to_string(),
                key: key.to_string(),
                field: field.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    /// Verify the number of rows in a table
    pub async fn assert_key_count(&self, table: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.store.keys(table).await?.len();

        if actual != expected {
            return Err(VerificationError::KeyCountMismatch {
                table: table.to_string(),
                expected,
                actual,
            });
        }

        Ok(())
    }

    async fn row(&self, table: &str, key: &str) -> VerifyResult<FieldValues> {
        self.store
            .get(table, key)
            .await?
            .ok_or_else(|| VerificationError::KeyNotFound {
                table: table.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_cfgmgr_common::{field_values, MemoryStore};

    #[tokio::test]
    async fn test_store_verifier() {
        let store = MemoryStore::new();
        store
            .set(
                "XSTP_INTERFACE",
                "Ethernet0",
                field_values! {"spanning-disable" => "disabled", "cost" => 200},
            )
            .await
            .unwrap();

        let verifier = StoreVerifier::new(&store);

        assert!(verifier
            .assert_key_exists("XSTP_INTERFACE", "Ethernet0")
            .await
            .is_ok());
        assert!(verifier
            .assert_key_not_exists("XSTP_INTERFACE", "Ethernet4")
            .await
            .is_ok());
        assert!(verifier
            .assert_field_value("XSTP_INTERFACE", "Ethernet0", "cost", "200")
            .await
            .is_ok());
        assert!(verifier
            .assert_field_absent("XSTP_INTERFACE", "Ethernet0", "root-guard")
            .await
            .is_ok());
        assert!(verifier.assert_key_count("XSTP_INTERFACE", 1).await.is_ok());

        assert!(matches!(
            verifier
                .assert_field_value("XSTP_INTERFACE", "Ethernet0", "cost", "400")
                .await,
            Err(VerificationError::ValueMismatch { .. })
        ));
        assert!(matches!(
            verifier.assert_key_exists("XSTP_INTERFACE", "Ethernet4").await,
            Err(VerificationError::KeyNotFound { .. })
        ));
        assert!(matches!(
            verifier.assert_key_count("XSTP_INTERFACE", 2).await,
            Err(VerificationError::KeyCountMismatch { actual: 1, .. })
        ));
    }
}
