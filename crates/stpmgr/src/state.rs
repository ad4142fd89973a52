//! Readers over the current CONFIG_DB state.
//!
//! Nothing here caches: each call goes to the store so that a mutation is
//! always computed against the rows as they are right now.

use std::collections::{BTreeMap, BTreeSet};

use sonic_cfgmgr_common::{join_key, split_key, ConfigStore, FieldValues, FieldValuesExt};

use crate::error::{StpError, StpResult};
use crate::range;
use crate::tables::{
    fields, keys, values, CFG_DEVICE_METADATA_TABLE_NAME, CFG_INTF_TABLE_NAME,
    CFG_LAG_INTF_TABLE_NAME, CFG_LAG_MEMBER_TABLE_NAME, CFG_LAG_TABLE_NAME, CFG_PORT_TABLE_NAME,
    CFG_VLAN_MEMBER_TABLE_NAME, CFG_VLAN_TABLE_NAME, CFG_XSTP_GLOBAL_TABLE_NAME,
    CFG_XSTP_INTERFACE_TABLE_NAME, CFG_XSTP_MST_INTERFACE_TABLE_NAME, CFG_XSTP_MST_TABLE_NAME,
};
use crate::types::{BridgeTimers, MacAddress, StpMode, TaggingMode, VlanId};
use crate::validate::{parse_number, to_u32};

/// MST instance id to its mapped VLANs.
pub type MstMappings = BTreeMap<u16, BTreeSet<u16>>;

/// Reads the `value` field of an XSTP_GLOBAL row.
pub async fn global_value(store: &dyn ConfigStore, key: &str) -> StpResult<Option<String>> {
    Ok(store
        .get_field(CFG_XSTP_GLOBAL_TABLE_NAME, key, fields::VALUE)
        .await?)
}

/// True when spanning tree is administratively enabled.
pub async fn global_enabled(store: &dyn ConfigStore) -> StpResult<bool> {
    Ok(global_value(store, keys::GLOBAL).await?.as_deref() == Some(values::ENABLED))
}

/// The configured protocol variant, if any.
pub async fn global_mode(store: &dyn ConfigStore) -> StpResult<Option<StpMode>> {
    global_value(store, keys::MODE)
        .await?
        .map(|mode| mode.parse())
        .transpose()
}

async fn global_number(store: &dyn ConfigStore, key: &str, default: u32) -> StpResult<u32> {
    match global_value(store, key).await? {
        Some(value) => Ok(to_u32(parse_number(key, &value)?)),
        None => Ok(default),
    }
}

/// Current bridge timers, with defaults for absent rows.
pub async fn bridge_timers(store: &dyn ConfigStore) -> StpResult<BridgeTimers> {
    Ok(BridgeTimers {
        forward_delay: global_number(
            store,
            keys::FORWARD_TIME,
            BridgeTimers::DEFAULT_FORWARD_DELAY,
        )
        .await?,
        hello_time: global_number(store, keys::HELLO_TIME, BridgeTimers::DEFAULT_HELLO_TIME)
            .await?,
        max_age: global_number(store, keys::MAX_AGE, BridgeTimers::DEFAULT_MAX_AGE).await?,
        priority: global_number(store, keys::PRIORITY, BridgeTimers::DEFAULT_PRIORITY).await?,
    })
}

/// VLANs mapped to one instance. `None` when the instance row is absent.
pub async fn mst_instance_vlans(
    store: &dyn ConfigStore,
    inst: u16,
) -> StpResult<Option<BTreeSet<u16>>> {
    let Some(row) = store.get(CFG_XSTP_MST_TABLE_NAME, &inst.to_string()).await? else {
        return Ok(None);
    };
    Ok(Some(range::expand_str(row.get_field_or(fields::VLAN_STR, ""))?))
}

/// Priority of one instance, falling back to the bridge priority.
pub async fn mst_instance_priority(store: &dyn ConfigStore, inst: u16) -> StpResult<u32> {
    let stored = store
        .get_field(CFG_XSTP_MST_TABLE_NAME, &inst.to_string(), fields::PRIORITY)
        .await?;
    match stored {
        Some(value) => Ok(to_u32(parse_number(fields::PRIORITY, &value)?)),
        None => Ok(bridge_timers(store).await?.priority),
    }
}

/// Every MST instance row with its VLAN set.
pub async fn mst_mappings(store: &dyn ConfigStore) -> StpResult<MstMappings> {
    let mut mappings = MstMappings::new();
    for key in store.keys(CFG_XSTP_MST_TABLE_NAME).await? {
        let Ok(inst) = key.parse::<u16>() else {
            continue;
        };
        if let Some(vlans) = mst_instance_vlans(store, inst).await? {
            mappings.insert(inst, vlans);
        }
    }
    Ok(mappings)
}

/// Total number of VLAN mappings across all instances.
pub fn mapping_count(mappings: &MstMappings) -> usize {
    mappings.values().map(BTreeSet::len).sum()
}

/// Instance a VLAN is mapped to, if any.
pub fn instance_of(mappings: &MstMappings, vlan: u16) -> Option<u16> {
    mappings
        .iter()
        .find(|(_, vlans)| vlans.contains(&vlan))
        .map(|(inst, _)| *inst)
}

/// A parsed VLAN_MEMBER row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanMember {
    pub vlan: VlanId,
    pub if_name: String,
    pub tagging: TaggingMode,
}

/// All VLAN_MEMBER rows. Unparseable keys are skipped.
pub async fn vlan_members(store: &dyn ConfigStore) -> StpResult<Vec<VlanMember>> {
    let mut members = Vec::new();
    for key in store.keys(CFG_VLAN_MEMBER_TABLE_NAME).await? {
        let parts = split_key(&key);
        let [vlan_key, if_name] = parts.as_slice() else {
            continue;
        };
        let Some(vlan) = VlanId::from_key(vlan_key) else {
            continue;
        };

        let tagging = store
            .get_field(CFG_VLAN_MEMBER_TABLE_NAME, &key, fields::TAGGING_MODE)
            .await?
            .and_then(|mode| mode.parse().ok())
            .unwrap_or(TaggingMode::Untagged);

        members.push(VlanMember {
            vlan,
            if_name: if_name.to_string(),
            tagging,
        });
    }
    members.sort_by(|a, b| (a.vlan, &a.if_name).cmp(&(b.vlan, &b.if_name)));
    Ok(members)
}

/// Members of one VLAN.
pub async fn members_of_vlan(store: &dyn ConfigStore, vlan: u16) -> StpResult<Vec<VlanMember>> {
    Ok(vlan_members(store)
        .await?
        .into_iter()
        .filter(|m| m.vlan.as_u16() == vlan)
        .collect())
}

/// VLAN memberships of one interface.
pub async fn interface_vlans(store: &dyn ConfigStore, if_name: &str) -> StpResult<Vec<VlanMember>> {
    Ok(vlan_members(store)
        .await?
        .into_iter()
        .filter(|m| m.if_name == if_name)
        .collect())
}

/// Interfaces that are a member of at least one VLAN, sorted.
pub async fn vlan_member_interfaces(store: &dyn ConfigStore) -> StpResult<BTreeSet<String>> {
    Ok(vlan_members(store)
        .await?
        .into_iter()
        .map(|m| m.if_name)
        .collect())
}

/// VLANs defined in the VLAN table, ascending.
pub async fn vlans(store: &dyn ConfigStore) -> StpResult<Vec<VlanId>> {
    let mut vlans: Vec<VlanId> = store
        .keys(CFG_VLAN_TABLE_NAME)
        .await?
        .iter()
        .filter_map(|key| VlanId::from_key(key))
        .collect();
    vlans.sort();
    Ok(vlans)
}

/// True when the interface exists in PORT or PORTCHANNEL.
pub async fn interface_exists(store: &dyn ConfigStore, if_name: &str) -> StpResult<bool> {
    Ok(store.exists(CFG_PORT_TABLE_NAME, if_name).await?
        || store.exists(CFG_LAG_TABLE_NAME, if_name).await?)
}

/// First routed prefix configured on the interface, if any.
pub async fn routed_prefix(store: &dyn ConfigStore, if_name: &str) -> StpResult<Option<String>> {
    for table in [CFG_INTF_TABLE_NAME, CFG_LAG_INTF_TABLE_NAME] {
        for key in store.keys(table).await? {
            if let [name, prefix] = split_key(&key).as_slice() {
                if *name == if_name {
                    return Ok(Some(prefix.to_string()));
                }
            }
        }
    }
    Ok(None)
}

/// True when the interface is a member of some PortChannel.
pub async fn is_lag_member(store: &dyn ConfigStore, if_name: &str) -> StpResult<bool> {
    Ok(store
        .keys(CFG_LAG_MEMBER_TABLE_NAME)
        .await?
        .iter()
        .any(|key| matches!(split_key(key).as_slice(), [_, member] if *member == if_name)))
}

/// The XSTP_INTERFACE row of an interface.
pub async fn interface_row(
    store: &dyn ConfigStore,
    if_name: &str,
) -> StpResult<Option<FieldValues>> {
    Ok(store.get(CFG_XSTP_INTERFACE_TABLE_NAME, if_name).await?)
}

/// True when STP runs on the interface (`spanning-disable` is `disabled`).
pub fn stp_enabled_in(row: &FieldValues) -> bool {
    row.get_field(fields::SPANNING_DISABLE) == Some(values::DISABLED)
}

/// True when STP runs on the interface.
pub async fn interface_stp_enabled(store: &dyn ConfigStore, if_name: &str) -> StpResult<bool> {
    Ok(interface_row(store, if_name)
        .await?
        .is_some_and(|row| stp_enabled_in(&row)))
}

/// Keys of the XSTP_MST_INTERFACE overrides of one instance.
pub async fn mst_interface_keys(store: &dyn ConfigStore, inst: u16) -> StpResult<Vec<String>> {
    let prefix = join_key([inst.to_string().as_str(), ""]);
    Ok(store
        .keys(CFG_XSTP_MST_INTERFACE_TABLE_NAME)
        .await?
        .into_iter()
        .filter(|key| key.starts_with(&prefix))
        .collect())
}

/// The system MAC from DEVICE_METADATA.
pub async fn base_mac(store: &dyn ConfigStore) -> StpResult<MacAddress> {
    let mac = store
        .get_field(CFG_DEVICE_METADATA_TABLE_NAME, keys::LOCALHOST, fields::MAC)
        .await?
        .ok_or_else(|| {
            StpError::precondition(format!(
                "{}|{} has no {} field",
                CFG_DEVICE_METADATA_TABLE_NAME,
                keys::LOCALHOST,
                fields::MAC
            ))
        })?;
    mac.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::{field_values, MemoryStore};

    #[tokio::test]
    async fn test_bridge_timers_defaults_and_overrides() {
        let store = MemoryStore::new();
        assert_eq!(bridge_timers(&store).await.unwrap(), BridgeTimers::default());

        store
            .set(
                CFG_XSTP_GLOBAL_TABLE_NAME,
                keys::MAX_AGE,
                field_values! {fields::VALUE => 10},
            )
            .await
            .unwrap();
        assert_eq!(bridge_timers(&store).await.unwrap().max_age, 10);
    }

    #[tokio::test]
    async fn test_global_state() {
        let store = MemoryStore::new();
        assert!(!global_enabled(&store).await.unwrap());
        assert_eq!(global_mode(&store).await.unwrap(), None);

        store
            .set(
                CFG_XSTP_GLOBAL_TABLE_NAME,
                keys::GLOBAL,
                field_values! {fields::VALUE => "enabled"},
            )
            .await
            .unwrap();
        store
            .set(
                CFG_XSTP_GLOBAL_TABLE_NAME,
                keys::MODE,
                field_values! {fields::VALUE => "mstp"},
            )
            .await
            .unwrap();
        assert!(global_enabled(&store).await.unwrap());
        assert_eq!(global_mode(&store).await.unwrap(), Some(StpMode::Mstp));
    }

    #[tokio::test]
    async fn test_mst_mappings() {
        let store = MemoryStore::new();
        store
            .set(
                CFG_XSTP_MST_TABLE_NAME,
                "1",
                field_values! {fields::VLAN_STR => "10-12,20"},
            )
            .await
            .unwrap();
        store
            .set(CFG_XSTP_MST_TABLE_NAME, "2", field_values! {fields::PRIORITY => 4096})
            .await
            .unwrap();

        let mappings = mst_mappings(&store).await.unwrap();
        assert_eq!(mapping_count(&mappings), 4);
        assert_eq!(instance_of(&mappings, 11), Some(1));
        assert_eq!(instance_of(&mappings, 30), None);
        assert!(mappings[&2].is_empty());
        assert_eq!(mst_instance_vlans(&store, 3).await.unwrap(), None);

        assert_eq!(mst_instance_priority(&store, 2).await.unwrap(), 4096);
        assert_eq!(mst_instance_priority(&store, 1).await.unwrap(), 32768);
    }

    #[tokio::test]
    async fn test_vlan_members_and_eligibility() {
        let store = MemoryStore::new();
        store
            .set(
                CFG_VLAN_MEMBER_TABLE_NAME,
                "Vlan100|Ethernet0",
                field_values! {fields::TAGGING_MODE => "tagged"},
            )
            .await
            .unwrap();
        store
            .set(CFG_VLAN_MEMBER_TABLE_NAME, "Vlan20|Ethernet0", FieldValues::new())
            .await
            .unwrap();
        store
            .set(CFG_LAG_MEMBER_TABLE_NAME, "PortChannel1|Ethernet4", FieldValues::new())
            .await
            .unwrap();
        store
            .set(CFG_INTF_TABLE_NAME, "Ethernet8|10.0.0.1/31", FieldValues::new())
            .await
            .unwrap();

        let vlans = interface_vlans(&store, "Ethernet0").await.unwrap();
        assert_eq!(vlans.len(), 2);
        assert_eq!(vlans[0].vlan.as_u16(), 20);
        assert_eq!(vlans[0].tagging, TaggingMode::Untagged);
        assert_eq!(vlans[1].tagging, TaggingMode::Tagged);

        assert!(is_lag_member(&store, "Ethernet4").await.unwrap());
        assert!(!is_lag_member(&store, "PortChannel1").await.unwrap());
        assert_eq!(
            routed_prefix(&store, "Ethernet8").await.unwrap().as_deref(),
            Some("10.0.0.1/31")
        );
        assert_eq!(routed_prefix(&store, "Ethernet0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_base_mac() {
        let store = MemoryStore::new();
        assert!(base_mac(&store).await.is_err());

        store
            .set(
                CFG_DEVICE_METADATA_TABLE_NAME,
                keys::LOCALHOST,
                field_values! {fields::MAC => "00:11:22:33:44:55"},
            )
            .await
            .unwrap();
        assert_eq!(
            base_mac(&store).await.unwrap().to_string(),
            "00:11:22:33:44:55"
        );
    }
}
