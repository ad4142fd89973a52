//! Table name constants for stpmgr

/// CONFIG_DB global STP table (`Global`, `mode`, timers, priority)
pub const CFG_XSTP_GLOBAL_TABLE_NAME: &str = "XSTP_GLOBAL";

/// CONFIG_DB MST region table (`max-hops`, `name`, `revision`)
pub const CFG_XSTP_MST_GLOBAL_TABLE_NAME: &str = "XSTP_MST_GLOBAL";

/// CONFIG_DB MST instance table keyed by instance id
pub const CFG_XSTP_MST_TABLE_NAME: &str = "XSTP_MST";

/// CONFIG_DB per-interface STP table
pub const CFG_XSTP_INTERFACE_TABLE_NAME: &str = "XSTP_INTERFACE";

/// CONFIG_DB per-instance interface overrides keyed `<inst>|<ifname>`
pub const CFG_XSTP_MST_INTERFACE_TABLE_NAME: &str = "XSTP_MST_INTERFACE";

/// CONFIG_DB PVST global table
pub const CFG_STP_TABLE_NAME: &str = "STP";

/// CONFIG_DB PVST port table
pub const CFG_STP_PORT_TABLE_NAME: &str = "STP_PORT";

/// CONFIG_DB PVST VLAN table
pub const CFG_STP_VLAN_TABLE_NAME: &str = "STP_VLAN";

/// CONFIG_DB PORT table
pub const CFG_PORT_TABLE_NAME: &str = "PORT";

/// CONFIG_DB PORTCHANNEL table
pub const CFG_LAG_TABLE_NAME: &str = "PORTCHANNEL";

/// CONFIG_DB PORTCHANNEL_MEMBER table
pub const CFG_LAG_MEMBER_TABLE_NAME: &str = "PORTCHANNEL_MEMBER";

/// CONFIG_DB VLAN table
pub const CFG_VLAN_TABLE_NAME: &str = "VLAN";

/// CONFIG_DB VLAN_MEMBER table
pub const CFG_VLAN_MEMBER_TABLE_NAME: &str = "VLAN_MEMBER";

/// CONFIG_DB INTERFACE table (routed port addresses)
pub const CFG_INTF_TABLE_NAME: &str = "INTERFACE";

/// CONFIG_DB PORTCHANNEL_INTERFACE table (routed LAG addresses)
pub const CFG_LAG_INTF_TABLE_NAME: &str = "PORTCHANNEL_INTERFACE";

/// CONFIG_DB DEVICE_METADATA table
pub const CFG_DEVICE_METADATA_TABLE_NAME: &str = "DEVICE_METADATA";

/// Tables removed when spanning tree is disabled, in deletion order
pub const XSTP_TABLES: [&str; 5] = [
    CFG_XSTP_MST_INTERFACE_TABLE_NAME,
    CFG_XSTP_INTERFACE_TABLE_NAME,
    CFG_XSTP_MST_TABLE_NAME,
    CFG_XSTP_MST_GLOBAL_TABLE_NAME,
    CFG_XSTP_GLOBAL_TABLE_NAME,
];

/// Row keys
pub mod keys {
    /// Global admin state row of XSTP_GLOBAL
    pub const GLOBAL: &str = "Global";
    pub const MODE: &str = "mode";
    pub const FORWARD_TIME: &str = "forward-time";
    pub const HELLO_TIME: &str = "hello-time";
    pub const MAX_AGE: &str = "max-age";
    pub const PRIORITY: &str = "priority";

    pub const MAX_HOPS: &str = "max-hops";
    pub const NAME: &str = "name";
    pub const REVISION: &str = "revision";

    /// PVST global row of STP
    pub const PVST_GLOBAL: &str = "GLOBAL";

    /// DEVICE_METADATA row
    pub const LOCALHOST: &str = "localhost";
}

/// Field names
pub mod fields {
    /// Single value field of XSTP_GLOBAL / XSTP_MST_GLOBAL rows
    pub const VALUE: &str = "value";

    /// MST instance VLAN range string
    pub const VLAN_STR: &str = "vlan_str";

    /// MST instance bridge priority
    pub const PRIORITY: &str = "priority";

    /// `disabled` means STP runs on the interface
    pub const SPANNING_DISABLE: &str = "spanning-disable";
    pub const PORT_PRIORITY: &str = "port-priority";
    pub const COST: &str = "cost";
    pub const EDGE_PORT: &str = "edge-port";
    pub const BPDU_GUARD: &str = "bpdu-guard";
    pub const BPDU_FILTER: &str = "bpdu-filter";
    pub const ROOT_GUARD: &str = "root-guard";
    pub const AUTO_RECOVERY: &str = "auto-recovery";
    pub const AUTO_RECOVERY_INTERVAL: &str = "auto-recovery-interval";
    pub const LOOPBACK_DETECTION: &str = "loopback-detection";
    pub const LBD_ACTION: &str = "lbd-action";
    pub const LBD_SHUTDOWN_INTERVAL: &str = "lbd-shutdown-interval";

    /// VLAN member tagging mode
    pub const TAGGING_MODE: &str = "tagging_mode";

    /// System MAC in DEVICE_METADATA
    pub const MAC: &str = "mac";

    // PVST tables
    pub const MODE: &str = "mode";
    pub const ROOTGUARD_TIMEOUT: &str = "rootguard_timeout";
    pub const FORWARD_DELAY: &str = "forward_delay";
    pub const HELLO_TIME: &str = "hello_time";
    pub const MAX_AGE: &str = "max_age";
    pub const ENABLED: &str = "enabled";
    pub const PVST_ROOT_GUARD: &str = "root_guard";
    pub const PVST_BPDU_GUARD: &str = "bpdu_guard";
    pub const PVST_BPDU_GUARD_DO_DISABLE: &str = "bpdu_guard_do_disable";
    pub const PORTFAST: &str = "portfast";
    pub const UPLINK_FAST: &str = "uplink_fast";
}

/// Field values
pub mod values {
    pub const ENABLED: &str = "enabled";
    pub const DISABLED: &str = "disabled";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";

    /// `enabled`/`disabled` for a flag
    pub fn toggle(enabled: bool) -> &'static str {
        if enabled {
            ENABLED
        } else {
            DISABLED
        }
    }
}
