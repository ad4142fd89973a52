//! Test fixtures for common cfgmgr patterns
//!
//! Provides CONFIG_DB change builders and the switch topology rows the STP
//! configuration tests seed their stores with.

use sonic_cfgmgr_common::{CfgMgrResult, ConfigStore, FieldValues, FieldValuesExt};

/// Configuration change operation type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOp {
    /// SET operation (add or update)
    Set,
    /// DEL operation (delete)
    Del,
}

/// Represents a CONFIG_DB change
#[derive(Debug, Clone)]
pub struct ConfigChange {
    /// Table name (e.g., "PORT", "VLAN_MEMBER", "XSTP_GLOBAL")
    pub table: String,
    /// Key within the table
    pub key: String,
    /// Operation type
    pub op: ConfigOp,
    /// Field-value pairs (for SET operations)
    pub fields: FieldValues,
}

impl ConfigChange {
    /// Create a SET operation
    pub fn set(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            op: ConfigOp::Set,
            fields: FieldValues::new(),
        }
    }

    /// Create a DEL operation
    pub fn del(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            op: ConfigOp::Del,
            fields: FieldValues::new(),
        }
    }

    /// Add a field to a SET operation
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.set_field(&field, value);
        self
    }

    /// Apply the change to a store. SET merges into an existing row.
    pub async fn apply(&self, store: &dyn ConfigStore) -> CfgMgrResult<()> {
        match self.op {
            ConfigOp::Set => {
                store
                    .modify(&self.table, &self.key, self.fields.clone())
                    .await
            }
            ConfigOp::Del => store.delete(&self.table, Some(&self.key)).await,
        }
    }
}

/// Apply a sequence of changes in order.
pub async fn apply_all(store: &dyn ConfigStore, changes: &[ConfigChange]) -> CfgMgrResult<()> {
    for change in changes {
        change.apply(store).await?;
    }
    Ok(())
}

/// Front panel port fixtures
pub mod port_fixtures {
    use super::*;

    /// Standard Ethernet port with default configuration
    pub fn ethernet_port_default(port_name: &str) -> ConfigChange {
        ConfigChange::set("PORT", port_name)
            .with_field("mtu", "9100")
            .with_field("admin_status", "up")
            .with_field("speed", "100000")
    }

    /// Delete port
    pub fn delete_port(port_name: &str) -> ConfigChange {
        ConfigChange::del("PORT", port_name)
    }
}

/// Link aggregation fixtures
pub mod portchannel_fixtures {
    use super::*;

    /// PortChannel with default settings
    pub fn portchannel(name: &str) -> ConfigChange {
        ConfigChange::set("PORTCHANNEL", name)
            .with_field("admin_status", "up")
            .with_field("min_links", "1")
            .with_field("mtu", "9100")
    }

    /// Add a member port to a PortChannel
    pub fn portchannel_member(portchannel: &str, port: &str) -> ConfigChange {
        ConfigChange::set("PORTCHANNEL_MEMBER", format!("{}|{}", portchannel, port))
    }
}

/// VLAN fixtures
pub mod vlan_fixtures {
    use super::*;

    /// Create VLAN
    pub fn vlan(vlan_id: u16) -> ConfigChange {
        ConfigChange::set("VLAN", format!("Vlan{}", vlan_id))
            .with_field("vlanid", vlan_id.to_string())
    }

    /// Add member to VLAN
    pub fn vlan_member(vlan_id: u16, port: &str, tagging_mode: &str) -> ConfigChange {
        ConfigChange::set("VLAN_MEMBER", format!("Vlan{}|{}", vlan_id, port))
            .with_field("tagging_mode", tagging_mode)
    }
}

/// Routed interface fixtures
pub mod interface_fixtures {
    use super::*;

    /// IP address on a front panel port
    pub fn port_ip(port: &str, prefix: &str) -> ConfigChange {
        ConfigChange::set("INTERFACE", format!("{}|{}", port, prefix))
    }

    /// IP address on a PortChannel
    pub fn portchannel_ip(portchannel: &str, prefix: &str) -> ConfigChange {
        ConfigChange::set("PORTCHANNEL_INTERFACE", format!("{}|{}", portchannel, prefix))
    }
}

/// Device metadata fixtures
pub mod metadata_fixtures {
    use super::*;

    /// `DEVICE_METADATA|localhost` with the system MAC
    pub fn localhost(mac: &str) -> ConfigChange {
        ConfigChange::set("DEVICE_METADATA", "localhost")
            .with_field("hostname", "sonic")
            .with_field("mac", mac)
    }
}

/// Spanning tree configuration fixtures
pub mod stp_fixtures {
    use super::*;

    /// Global STP enabled in the given mode ("mstp", "rstp", ...)
    pub fn global_enabled(mode: &str) -> Vec<ConfigChange> {
        vec![
            ConfigChange::set("XSTP_GLOBAL", "Global").with_field("value", "enabled"),
            ConfigChange::set("XSTP_GLOBAL", "mode").with_field("value", mode),
        ]
    }

    /// A bridge timer or priority row (`forward-time`, `hello-time`, ...)
    pub fn global_value(key: &str, value: impl ToString) -> ConfigChange {
        ConfigChange::set("XSTP_GLOBAL", key).with_field("value", value.to_string())
    }

    /// STP enabled on an interface
    pub fn interface_enabled(ifname: &str) -> ConfigChange {
        ConfigChange::set("XSTP_INTERFACE", ifname).with_field("spanning-disable", "disabled")
    }

    /// MST instance mapping
    pub fn mst_instance(inst_id: u16, vlan_str: &str) -> ConfigChange {
        ConfigChange::set("XSTP_MST", inst_id.to_string()).with_field("vlan_str", vlan_str)
    }
}

/// A small switch: two access ports in VLAN 100, a trunk in VLAN 100 and
/// 200, a PortChannel with one member, a routed port, and the system MAC.
pub fn switch_topology() -> Vec<ConfigChange> {
    vec![
        metadata_fixtures::localhost("00:11:22:33:44:55"),
        port_fixtures::ethernet_port_default("Ethernet0"),
        port_fixtures::ethernet_port_default("Ethernet4"),
        port_fixtures::ethernet_port_default("Ethernet8"),
        port_fixtures::ethernet_port_default("Ethernet12"),
        port_fixtures::ethernet_port_default("Ethernet16"),
        portchannel_fixtures::portchannel("PortChannel1"),
        portchannel_fixtures::portchannel_member("PortChannel1", "Ethernet12"),
        vlan_fixtures::vlan(100),
        vlan_fixtures::vlan(200),
        vlan_fixtures::vlan_member(100, "Ethernet0", "untagged"),
        vlan_fixtures::vlan_member(100, "Ethernet4", "untagged"),
        vlan_fixtures::vlan_member(100, "Ethernet8", "tagged"),
        vlan_fixtures::vlan_member(200, "Ethernet8", "tagged"),
        vlan_fixtures::vlan_member(200, "PortChannel1", "tagged"),
        interface_fixtures::port_ip("Ethernet16", "10.0.0.1/31"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::MemoryStore;

    #[test]
    fn test_config_change_set() {
        let change = ConfigChange::set("PORT", "Ethernet0")
            .with_field("mtu", "9100")
            .with_field("admin_status", "up")
            .with_field("mtu", "1500");

        assert_eq!(change.op, ConfigOp::Set);
        assert_eq!(change.table, "PORT");
        assert_eq!(change.fields.len(), 2);
        assert_eq!(change.fields.get_field("mtu"), Some("1500"));
    }

    #[test]
    fn test_config_change_del() {
        let change = ConfigChange::del("PORT", "Ethernet0");

        assert_eq!(change.op, ConfigOp::Del);
        assert_eq!(change.key, "Ethernet0");
        assert!(change.fields.is_empty());
    }

    #[tokio::test]
    async fn test_apply_set_and_del() {
        let store = MemoryStore::new();
        port_fixtures::ethernet_port_default("Ethernet0")
            .apply(&store)
            .await
            .unwrap();
        ConfigChange::set("PORT", "Ethernet0")
            .with_field("admin_status", "down")
            .apply(&store)
            .await
            .unwrap();

        let row = store.get("PORT", "Ethernet0").await.unwrap().unwrap();
        assert_eq!(row.get_field("admin_status"), Some("down"));
        assert_eq!(row.get_field("mtu"), Some("9100"));

        port_fixtures::delete_port("Ethernet0")
            .apply(&store)
            .await
            .unwrap();
        assert!(!store.exists("PORT", "Ethernet0").await.unwrap());
    }

    #[tokio::test]
    async fn test_switch_topology_seed() {
        let store = MemoryStore::new();
        apply_all(&store, &switch_topology()).await.unwrap();

        assert_eq!(store.row_count("PORT").await, 5);
        assert_eq!(store.row_count("VLAN_MEMBER").await, 5);
        assert!(store
            .exists("PORTCHANNEL_MEMBER", "PortChannel1|Ethernet12")
            .await
            .unwrap());
    }
}
