//! Daemon notifications derived from persisted state.
//!
//! A mutation records *what* changed as a [`Notify`] plan; [`build`] turns the
//! plan into wire messages by reading the rows as they are after the write.

use sonic_cfgmgr_common::{join_key, ConfigStore, FieldValues, FieldValuesExt};
use tracing::debug;

use crate::error::StpResult;
use crate::ipc::{
    BridgeConfig, InitDone, IpcMessage, Opcode, PortAttr, PortConfig, VlanAttr, VlanConfig,
    VlanPortConfig,
};
use crate::state;
use crate::tables::{fields, values, CFG_XSTP_MST_INTERFACE_TABLE_NAME};
use crate::types::{StpMode, STP_MODE_RSTP};
use crate::validate::parse_number;

/// Root guard timeout announced with every bridge enable, in seconds.
pub const DEFAULT_ROOTGUARD_TIMEOUT: i32 = 30;

/// Path cost meaning "leave unchanged".
pub const COST_UNCHANGED: i32 = 0;

/// Port priority meaning "leave unchanged".
pub const PRIORITY_UNCHANGED: i32 = -1;

/// Which daemon state a mutation touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notify {
    /// Persisted only
    Nothing,
    /// Bridge enabled in `mode`, or disabled
    Bridge { opcode: Opcode, mode: StpMode },
    /// Bridge timers or priority: every mapped instance/VLAN pair
    AllInstances,
    /// Instance priority: every VLAN of the instance
    Instance { inst: u16 },
    /// One VLAN joined or left an instance
    VlanMapping {
        opcode: Opcode,
        inst: u16,
        vlan: u16,
        new_instance: bool,
    },
    /// Port-level attributes
    Port { if_name: String },
    /// Per-instance cost/priority of a port
    PortInstance { if_name: String, inst: u16 },
    /// Initialization barrier
    InitDone { max_instances: u16 },
}

/// Builds the messages for a plan from the current store state.
pub async fn build(store: &dyn ConfigStore, plan: &Notify) -> StpResult<Vec<IpcMessage>> {
    let messages = match plan {
        Notify::Nothing => Vec::new(),
        Notify::Bridge { opcode, mode } => bridge(store, *opcode, *mode)
            .await?
            .into_iter()
            .collect(),
        Notify::AllInstances => {
            let mut messages = Vec::new();
            for (inst, vlans) in state::mst_mappings(store).await? {
                for vlan in vlans {
                    messages.push(vlan_config(store, Opcode::Enable, inst, vlan, false).await?);
                }
            }
            messages
        }
        Notify::Instance { inst } => {
            let mut messages = Vec::new();
            for vlan in state::mst_instance_vlans(store, *inst)
                .await?
                .unwrap_or_default()
            {
                messages.push(vlan_config(store, Opcode::Enable, *inst, vlan, false).await?);
            }
            messages
        }
        Notify::VlanMapping {
            opcode,
            inst,
            vlan,
            new_instance,
        } => vec![vlan_config(store, *opcode, *inst, *vlan, *new_instance).await?],
        Notify::Port { if_name } => vec![port_config(store, if_name).await?],
        Notify::PortInstance { if_name, inst } => vlan_port_configs(store, if_name, *inst).await?,
        Notify::InitDone { max_instances } => vec![IpcMessage::InitDone(InitDone {
            opcode: Opcode::Enable,
            max_instances: *max_instances,
        })],
    };

    debug!(?plan, count = messages.len(), "built daemon notification");
    Ok(messages)
}

async fn bridge(
    store: &dyn ConfigStore,
    opcode: Opcode,
    mode: StpMode,
) -> StpResult<Option<IpcMessage>> {
    let stp_mode = match opcode {
        Opcode::Enable => match mode.wire_mode() {
            Some(wire) => wire,
            None => return Ok(None),
        },
        Opcode::Disable => STP_MODE_RSTP,
    };

    Ok(Some(IpcMessage::BridgeConfig(BridgeConfig {
        opcode,
        stp_mode,
        rootguard_timeout: DEFAULT_ROOTGUARD_TIMEOUT,
        base_mac: state::base_mac(store).await?,
    })))
}

async fn vlan_config(
    store: &dyn ConfigStore,
    opcode: Opcode,
    inst: u16,
    vlan: u16,
    new_instance: bool,
) -> StpResult<IpcMessage> {
    let timers = state::bridge_timers(store).await?;
    let priority = state::mst_instance_priority(store, inst).await?;

    let mut ports = Vec::new();
    for member in state::members_of_vlan(store, vlan).await? {
        let enabled = state::interface_stp_enabled(store, &member.if_name).await?;
        ports.push(PortAttr {
            mode: member.tagging.wire_mode(),
            if_name: member.if_name,
            enabled,
        });
    }

    Ok(IpcMessage::VlanConfig(VlanConfig {
        opcode,
        new_instance,
        vlan_id: i32::from(vlan),
        inst_id: i32::from(inst),
        forward_delay: wire_i32(timers.forward_delay),
        hello_time: wire_i32(timers.hello_time),
        max_age: wire_i32(timers.max_age),
        priority: wire_i32(priority),
        ports,
    }))
}

async fn port_config(store: &dyn ConfigStore, if_name: &str) -> StpResult<IpcMessage> {
    let row = state::interface_row(store, if_name)
        .await?
        .unwrap_or_default();
    let mappings = state::mst_mappings(store).await?;

    let vlans = state::interface_vlans(store, if_name)
        .await?
        .into_iter()
        .map(|member| VlanAttr {
            inst_id: i32::from(state::instance_of(&mappings, member.vlan.as_u16()).unwrap_or(0)),
            vlan_id: i32::from(member.vlan.as_u16()),
            mode: member.tagging.wire_mode(),
        })
        .collect();

    let enabled = state::stp_enabled_in(&row);
    Ok(IpcMessage::PortConfig(PortConfig {
        opcode: Opcode::from_enabled(enabled),
        if_name: if_name.to_string(),
        enabled,
        root_guard: is_enabled(&row, fields::ROOT_GUARD),
        bpdu_guard: is_enabled(&row, fields::BPDU_GUARD),
        bpdu_guard_auto_disable: is_enabled(&row, fields::AUTO_RECOVERY),
        portfast: row.get_field(fields::EDGE_PORT) == Some(values::TRUE),
        uplink_fast: false,
        path_cost: number_or(&row, fields::COST, COST_UNCHANGED)?,
        priority: number_or(&row, fields::PORT_PRIORITY, PRIORITY_UNCHANGED)?,
        vlans,
    }))
}

async fn vlan_port_configs(
    store: &dyn ConfigStore,
    if_name: &str,
    inst: u16,
) -> StpResult<Vec<IpcMessage>> {
    let key = join_key([inst.to_string().as_str(), if_name]);
    let row = store
        .get(CFG_XSTP_MST_INTERFACE_TABLE_NAME, &key)
        .await?
        .unwrap_or_default();
    let path_cost = number_or(&row, fields::COST, COST_UNCHANGED)?;
    let priority = number_or(&row, fields::PORT_PRIORITY, PRIORITY_UNCHANGED)?;

    let instance_vlans = state::mst_instance_vlans(store, inst)
        .await?
        .unwrap_or_default();

    Ok(state::interface_vlans(store, if_name)
        .await?
        .into_iter()
        .filter(|member| instance_vlans.contains(&member.vlan.as_u16()))
        .map(|member| {
            IpcMessage::VlanPortConfig(VlanPortConfig {
                opcode: Opcode::Enable,
                vlan_id: i32::from(member.vlan.as_u16()),
                if_name: if_name.to_string(),
                inst_id: i32::from(inst),
                path_cost,
                priority,
            })
        })
        .collect())
}

fn is_enabled(row: &FieldValues, field: &str) -> bool {
    row.get_field(field) == Some(values::ENABLED)
}

fn number_or(row: &FieldValues, field: &str, default: i32) -> StpResult<i32> {
    match row.get_field(field) {
        Some(value) => Ok(i32::try_from(parse_number(field, value)?).unwrap_or(i32::MAX)),
        None => Ok(default),
    }
}

fn wire_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacAddress;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::MemoryStore;
    use sonic_cfgmgr_test::{apply_all, stp_fixtures, switch_topology, ConfigChange};

    async fn seeded(extra: Vec<ConfigChange>) -> MemoryStore {
        let store = MemoryStore::new();
        apply_all(&store, &switch_topology()).await.unwrap();
        apply_all(&store, &stp_fixtures::global_enabled("mstp"))
            .await
            .unwrap();
        apply_all(&store, &extra).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_nothing_builds_no_messages() {
        let store = seeded(vec![]).await;
        assert!(build(&store, &Notify::Nothing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bridge_enable_and_disable() {
        let store = seeded(vec![]).await;

        let enable = build(
            &store,
            &Notify::Bridge {
                opcode: Opcode::Enable,
                mode: StpMode::Rstp,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            enable,
            vec![IpcMessage::BridgeConfig(BridgeConfig {
                opcode: Opcode::Enable,
                stp_mode: 1,
                rootguard_timeout: 30,
                base_mac: MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            })]
        );

        // MSTP has no daemon wire mode
        let mstp = build(
            &store,
            &Notify::Bridge {
                opcode: Opcode::Enable,
                mode: StpMode::Mstp,
            },
        )
        .await
        .unwrap();
        assert!(mstp.is_empty());

        let disable = build(
            &store,
            &Notify::Bridge {
                opcode: Opcode::Disable,
                mode: StpMode::Mstp,
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            &disable[..],
            [IpcMessage::BridgeConfig(BridgeConfig {
                opcode: Opcode::Disable,
                ..
            })]
        ));
    }

    #[tokio::test]
    async fn test_vlan_mapping_lists_member_ports() {
        let store = seeded(vec![
            stp_fixtures::mst_instance(1, "100"),
            stp_fixtures::interface_enabled("Ethernet0"),
            stp_fixtures::global_value("priority", 4096),
        ])
        .await;

        let messages = build(
            &store,
            &Notify::VlanMapping {
                opcode: Opcode::Enable,
                inst: 1,
                vlan: 100,
                new_instance: true,
            },
        )
        .await
        .unwrap();

        let [IpcMessage::VlanConfig(config)] = &messages[..] else {
            panic!("expected one VlanConfig, got {:?}", messages);
        };
        assert!(config.new_instance);
        assert_eq!(config.vlan_id, 100);
        assert_eq!(config.inst_id, 1);
        assert_eq!(config.priority, 4096);
        assert_eq!(
            config.ports,
            vec![
                PortAttr {
                    if_name: "Ethernet0".to_string(),
                    mode: 0,
                    enabled: true
                },
                PortAttr {
                    if_name: "Ethernet4".to_string(),
                    mode: 0,
                    enabled: false
                },
                PortAttr {
                    if_name: "Ethernet8".to_string(),
                    mode: 1,
                    enabled: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_all_instances_covers_every_pair() {
        let store = seeded(vec![
            stp_fixtures::mst_instance(1, "100"),
            stp_fixtures::mst_instance(2, "200-201"),
        ])
        .await;

        let messages = build(&store, &Notify::AllInstances).await.unwrap();
        let pairs: Vec<(i32, i32)> = messages
            .iter()
            .filter_map(|m| match m {
                IpcMessage::VlanConfig(c) => Some((c.inst_id, c.vlan_id)),
                _ => None,
            })
            .collect();
        assert_eq!(pairs, vec![(1, 100), (2, 200), (2, 201)]);
    }

    #[tokio::test]
    async fn test_port_config_reflects_interface_row() {
        let store = seeded(vec![
            stp_fixtures::mst_instance(3, "200"),
            ConfigChange::set("XSTP_INTERFACE", "Ethernet8")
                .with_field("spanning-disable", "disabled")
                .with_field("edge-port", "true")
                .with_field("bpdu-guard", "enabled")
                .with_field("auto-recovery", "enabled")
                .with_field("cost", "2000"),
        ])
        .await;

        let messages = build(
            &store,
            &Notify::Port {
                if_name: "Ethernet8".to_string(),
            },
        )
        .await
        .unwrap();
        let [IpcMessage::PortConfig(config)] = &messages[..] else {
            panic!("expected one PortConfig, got {:?}", messages);
        };

        assert_eq!(config.opcode, Opcode::Enable);
        assert!(config.enabled);
        assert!(config.portfast);
        assert!(config.bpdu_guard);
        assert!(config.bpdu_guard_auto_disable);
        assert!(!config.root_guard);
        assert_eq!(config.path_cost, 2000);
        assert_eq!(config.priority, PRIORITY_UNCHANGED);
        assert_eq!(
            config.vlans,
            vec![
                VlanAttr {
                    inst_id: 0,
                    vlan_id: 100,
                    mode: 1
                },
                VlanAttr {
                    inst_id: 3,
                    vlan_id: 200,
                    mode: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_port_instance_only_shared_vlans() {
        let store = seeded(vec![
            stp_fixtures::mst_instance(2, "200,300"),
            ConfigChange::set("XSTP_MST_INTERFACE", "2|Ethernet8").with_field("cost", "500"),
        ])
        .await;

        let messages = build(
            &store,
            &Notify::PortInstance {
                if_name: "Ethernet8".to_string(),
                inst: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            messages,
            vec![IpcMessage::VlanPortConfig(VlanPortConfig {
                opcode: Opcode::Enable,
                vlan_id: 200,
                if_name: "Ethernet8".to_string(),
                inst_id: 2,
                path_cost: 500,
                priority: PRIORITY_UNCHANGED,
            })]
        );
    }

    #[tokio::test]
    async fn test_missing_mac_fails_bridge_notification() {
        let store = MemoryStore::new();
        let result = build(
            &store,
            &Notify::Bridge {
                opcode: Opcode::Enable,
                mode: StpMode::Rstp,
            },
        )
        .await;
        assert!(result.is_err());
    }
}
