//! Type definitions for stpmgr

use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

use crate::error::{StpError, StpResult};

/// Prefix of VLAN keys in CONFIG_DB ("Vlan100").
pub const VLAN_PREFIX: &str = "Vlan";

/// IEEE 802.1Q VLAN identifier (1-4094).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VlanId(u16);

impl VlanId {
    /// Minimum valid VLAN ID.
    pub const MIN: u16 = 1;

    /// Maximum valid VLAN ID.
    pub const MAX: u16 = 4094;

    /// Creates a new VLAN ID.
    pub fn new(id: u16) -> StpResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(VlanId(id))
        } else {
            Err(StpError::range(format!(
                "VLAN ID must be in range {}-{}.",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Parses a CONFIG_DB VLAN key such as "Vlan100".
    pub fn from_key(key: &str) -> Option<Self> {
        let id = key.strip_prefix(VLAN_PREFIX)?.parse().ok()?;
        VlanId::new(id).ok()
    }

    /// Returns the CONFIG_DB key for this VLAN.
    pub fn key(&self) -> String {
        format!("{}{}", VLAN_PREFIX, self.0)
    }

    /// Returns the VLAN ID as a u16.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// MST instance identifier (0-4094). Instance 0 is the CIST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MstInstanceId(u16);

impl MstInstanceId {
    /// Minimum valid instance ID.
    pub const MIN: u16 = 0;

    /// Maximum valid instance ID.
    pub const MAX: u16 = 4094;

    /// Creates a new instance ID.
    pub fn new(id: u16) -> StpResult<Self> {
        if id <= Self::MAX {
            Ok(MstInstanceId(id))
        } else {
            Err(StpError::range(format!(
                "MST instance ID must be in range {}-{}.",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Returns the instance ID as a u16.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for MstInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 48-bit Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The zero MAC address.
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    /// Creates a MAC address from raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = StpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Colon or hyphen separated
        let separator = if s.contains(':') { ':' } else { '-' };
        let invalid = || StpError::format(format!("Invalid MAC address: {}", s));

        let parts: Vec<&str> = s.split(separator).collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(MacAddress(bytes))
    }
}

/// Spanning tree protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StpMode {
    /// Multiple spanning tree
    Mstp,
    /// Rapid spanning tree
    Rstp,
    /// Legacy 802.1D spanning tree
    Stp,
    /// Per-VLAN spanning tree
    Pvst,
}

/// Daemon wire value for RSTP (`stpMode` in BridgeConfig).
pub const STP_MODE_RSTP: u8 = 1;

impl StpMode {
    /// Convert to the CONFIG_DB string
    pub fn as_str(&self) -> &'static str {
        match self {
            StpMode::Mstp => "mstp",
            StpMode::Rstp => "rstp",
            StpMode::Stp => "stp",
            StpMode::Pvst => "pvst",
        }
    }

    /// The `stpMode` value understood by the daemon, if it runs this mode
    pub fn wire_mode(&self) -> Option<u8> {
        match self {
            StpMode::Rstp | StpMode::Pvst => Some(STP_MODE_RSTP),
            StpMode::Mstp | StpMode::Stp => None,
        }
    }
}

impl FromStr for StpMode {
    type Err = StpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mstp" => Ok(StpMode::Mstp),
            "rstp" => Ok(StpMode::Rstp),
            "stp" => Ok(StpMode::Stp),
            "pvst" => Ok(StpMode::Pvst),
            _ => Err(StpError::format(format!("Unknown spanning-tree mode: {}", s))),
        }
    }
}

impl fmt::Display for StpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative edge port setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EdgeMode {
    /// Always an edge port
    #[value(name = "true", alias = "enable")]
    True,
    /// Never an edge port
    #[value(name = "false", alias = "disable")]
    False,
    /// Edge status detected automatically
    Auto,
}

impl EdgeMode {
    /// Convert to the CONFIG_DB string
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::True => "true",
            EdgeMode::False => "false",
            EdgeMode::Auto => "auto",
        }
    }

    /// True when BPDU guard/filter may be enabled on the port
    pub fn allows_edge_features(&self) -> bool {
        !matches!(self, EdgeMode::False)
    }
}

impl FromStr for EdgeMode {
    type Err = StpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(EdgeMode::True),
            "false" => Ok(EdgeMode::False),
            "auto" => Ok(EdgeMode::Auto),
            _ => Err(StpError::format(format!("Unknown edge-port mode: {}", s))),
        }
    }
}

/// Action taken when a loopback is detected on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoopbackAction {
    Block,
    Shutdown,
}

impl LoopbackAction {
    /// Convert to the CONFIG_DB string
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopbackAction::Block => "block",
            LoopbackAction::Shutdown => "shutdown",
        }
    }
}

/// VLAN tagging mode of a VLAN member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggingMode {
    /// Tagged mode
    Tagged,
    /// Untagged mode
    Untagged,
    /// Priority tagged mode
    PriorityTagged,
}

impl TaggingMode {
    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            TaggingMode::Tagged => "tagged",
            TaggingMode::Untagged => "untagged",
            TaggingMode::PriorityTagged => "priority_tagged",
        }
    }

    /// Port mode on the wire: 1 tagged, 0 untagged
    pub fn wire_mode(&self) -> i8 {
        match self {
            TaggingMode::Tagged => 1,
            TaggingMode::Untagged | TaggingMode::PriorityTagged => 0,
        }
    }
}

impl FromStr for TaggingMode {
    type Err = StpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tagged" => Ok(TaggingMode::Tagged),
            "untagged" => Ok(TaggingMode::Untagged),
            "priority_tagged" => Ok(TaggingMode::PriorityTagged),
            _ => Err(StpError::format(format!("Unknown tagging mode: {}", s))),
        }
    }
}

/// Bridge-wide timers and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTimers {
    /// Forward delay in seconds
    pub forward_delay: u32,
    /// Hello time in seconds
    pub hello_time: u32,
    /// Max age in seconds
    pub max_age: u32,
    /// Bridge priority
    pub priority: u32,
}

impl BridgeTimers {
    pub const DEFAULT_FORWARD_DELAY: u32 = 15;
    pub const DEFAULT_HELLO_TIME: u32 = 2;
    pub const DEFAULT_MAX_AGE: u32 = 20;
    pub const DEFAULT_PRIORITY: u32 = 32768;

    /// Returns true if `2*(forward_delay-1) >= max_age >= 2*(hello_time+1)`
    pub fn is_consistent(&self) -> bool {
        crate::validate::timers_consistent(self.forward_delay, self.max_age, self.hello_time)
    }
}

impl Default for BridgeTimers {
    fn default() -> Self {
        Self {
            forward_delay: Self::DEFAULT_FORWARD_DELAY,
            hello_time: Self::DEFAULT_HELLO_TIME,
            max_age: Self::DEFAULT_MAX_AGE,
            priority: Self::DEFAULT_PRIORITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vlan_id_bounds() {
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(4094).is_ok());
        assert!(VlanId::new(0).is_err());
        assert!(VlanId::new(4095).is_err());
    }

    #[test]
    fn test_vlan_key() {
        let vlan = VlanId::from_key("Vlan100").unwrap();
        assert_eq!(vlan.as_u16(), 100);
        assert_eq!(vlan.key(), "Vlan100");
        assert_eq!(VlanId::from_key("Vlan0"), None);
        assert_eq!(VlanId::from_key("Ethernet0"), None);
    }

    #[test]
    fn test_mst_instance_bounds() {
        assert_eq!(MstInstanceId::new(0).unwrap().as_u16(), 0);
        assert!(MstInstanceId::new(4094).is_ok());
        assert!(MstInstanceId::new(4095).is_err());
    }

    #[test]
    fn test_mac_address_parse() {
        let mac: MacAddress = "00:11:22:aa:bb:cc".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");

        let hyphen: MacAddress = "00-11-22-AA-BB-CC".parse().unwrap();
        assert_eq!(mac, hyphen);

        assert!("00:11:22:33:44".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:zz".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_stp_mode() {
        assert_eq!("mstp".parse::<StpMode>().unwrap(), StpMode::Mstp);
        assert_eq!(StpMode::Pvst.as_str(), "pvst");
        assert_eq!(StpMode::Rstp.wire_mode(), Some(STP_MODE_RSTP));
        assert_eq!(StpMode::Mstp.wire_mode(), None);
        assert!("vstp".parse::<StpMode>().is_err());
    }

    #[test]
    fn test_edge_mode() {
        assert_eq!("auto".parse::<EdgeMode>().unwrap(), EdgeMode::Auto);
        assert!(EdgeMode::True.allows_edge_features());
        assert!(EdgeMode::Auto.allows_edge_features());
        assert!(!EdgeMode::False.allows_edge_features());
    }

    #[test]
    fn test_tagging_mode() {
        assert_eq!(
            "untagged".parse::<TaggingMode>().unwrap(),
            TaggingMode::Untagged
        );
        assert_eq!(TaggingMode::Tagged.wire_mode(), 1);
        assert_eq!(TaggingMode::PriorityTagged.wire_mode(), 0);
    }

    #[test]
    fn test_bridge_timers_default() {
        let timers = BridgeTimers::default();
        assert_eq!(timers.forward_delay, 15);
        assert_eq!(timers.priority, 32768);
        assert!(timers.is_consistent());

        let bad = BridgeTimers {
            max_age: 30,
            ..timers
        };
        assert!(!bad.is_consistent());
    }
}
