//! Field validation for spanning tree configuration.
//!
//! Every check is a closed-interval membership test that reports the
//! allowed bounds on failure. [`validate_timers`] is the only cross-field rule.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{StpError, StpResult};
use crate::types::BridgeTimers;

/// Inclusive bounds for a numeric configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    /// Subject of the error message
    pub what: &'static str,
    pub min: i64,
    pub max: i64,
}

impl Bound {
    const fn new(what: &'static str, min: i64, max: i64) -> Self {
        Self { what, min, max }
    }

    /// Checks that `value` lies within the bounds.
    pub fn check(&self, value: i64) -> StpResult<i64> {
        if (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(StpError::range(format!(
                "{} must be in range {}-{}.",
                self.what, self.min, self.max
            )))
        }
    }
}

pub const FORWARD_DELAY: Bound = Bound::new("STP forward delay value", 4, 30);
pub const HELLO_TIME: Bound = Bound::new("STP hello timer", 1, 10);
pub const MAX_AGE: Bound = Bound::new("STP max age value", 6, 40);
pub const BRIDGE_PRIORITY: Bound = Bound::new("STP bridge priority", 0, 61440);
pub const MST_MAX_HOPS: Bound = Bound::new("MST max hops value", 1, 40);
pub const MST_REVISION: Bound = Bound::new("MST revision number", 0, 65535);
pub const MST_INSTANCE_ID: Bound = Bound::new("MST instance ID", 0, 4094);
pub const MST_INSTANCE_PRIORITY: Bound = Bound::new(
    "MST bridge priority of a spanning tree instance",
    0,
    61440,
);
pub const MST_INSTANCE_VLAN: Bound = Bound::new("MST VLAN ID", 1, 4094);
pub const INTERFACE_PRIORITY: Bound = Bound::new("Interface bridge priority", 0, 240);
pub const INTERFACE_COST: Bound = Bound::new("Interface cost", 1, 200_000_000);
pub const INTERFACE_MST_PRIORITY: Bound = Bound::new("Interface MST bridge priority", 0, 240);
pub const INTERFACE_MST_COST: Bound = Bound::new("Interface MST cost", 1, 200_000_000);
pub const AUTO_RECOVERY_INTERVAL: Bound = Bound::new("BPDU guard auto-recovery value", 30, 86400);
pub const LBD_SHUTDOWN_INTERVAL: Bound = Bound::new("Loopback detection shutdown interval", 60, 86400);

/// Maximum length of the MST region name.
pub const MST_NAME_MAX_LEN: usize = 32;

/// Maximum number of VLAN mappings across all MST instances.
pub const MAX_MST_VLAN_MAPPINGS: usize = 64;

const PRIORITY_STEP: i64 = 4096;

static INTERFACE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Ethernet\d+|PortChannel\d+)$").expect("Invalid regex pattern"));

/// Bridge priority: bounds and multiple of 4096.
pub fn bridge_priority(value: i64) -> StpResult<i64> {
    BRIDGE_PRIORITY.check(value)?;
    if value % PRIORITY_STEP != 0 {
        return Err(StpError::range("STP bridge priority must be multiple of 4096."));
    }
    Ok(value)
}

/// MST instance priority: bounds and multiple of 4096.
pub fn mst_instance_priority(value: i64) -> StpResult<i64> {
    MST_INSTANCE_PRIORITY.check(value)?;
    if value % PRIORITY_STEP != 0 {
        return Err(StpError::range(
            "MST bridge priority of a spanning tree instance must be multiple of 4096.",
        ));
    }
    Ok(value)
}

/// MST region name length.
pub fn mst_name(name: &str) -> StpResult<()> {
    if name.chars().count() > MST_NAME_MAX_LEN {
        return Err(StpError::range(format!(
            "The max length of MST name is {}.",
            MST_NAME_MAX_LEN
        )));
    }
    Ok(())
}

/// Interface name shape: `Ethernet<n>` or `PortChannel<n>`.
pub fn interface_name(name: &str) -> StpResult<()> {
    if !INTERFACE_NAME_RE.is_match(name) {
        return Err(StpError::format(format!(
            "Interface name {} is invalid. Please enter a valid interface name.",
            name
        )));
    }
    Ok(())
}

/// Returns true if `2*(forward_delay-1) >= max_age >= 2*(hello_time+1)`.
pub fn timers_consistent(forward_delay: u32, max_age: u32, hello_time: u32) -> bool {
    let forward_delay = i64::from(forward_delay);
    let max_age = i64::from(max_age);
    let hello_time = i64::from(hello_time);
    2 * (forward_delay - 1) >= max_age && max_age >= 2 * (hello_time + 1)
}

/// Cross-field timer consistency.
pub fn validate_timers(forward_delay: u32, max_age: u32, hello_time: u32) -> StpResult<()> {
    if !timers_consistent(forward_delay, max_age, hello_time) {
        return Err(StpError::range(
            "2*(forward_delay-1) >= max_age >= 2*(hello_time+1) not met",
        ));
    }
    Ok(())
}

/// Timer consistency of a full bridge configuration.
pub fn bridge_timers(timers: &BridgeTimers) -> StpResult<()> {
    validate_timers(timers.forward_delay, timers.max_age, timers.hello_time)
}

/// Parses a stored integer value.
pub fn parse_number(field: &str, value: &str) -> StpResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| StpError::format(format!("Invalid numeric value for {}: '{}'", field, value)))
}

/// Narrows an already validated value.
pub(crate) fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Narrows an already validated value.
pub(crate) fn to_u16(value: i64) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_independent_bounds() {
        assert!(FORWARD_DELAY.check(4).is_ok());
        assert!(FORWARD_DELAY.check(30).is_ok());
        assert!(FORWARD_DELAY.check(31).is_err());
        assert!(HELLO_TIME.check(0).is_err());
        assert!(MAX_AGE.check(40).is_ok());
        assert!(MST_MAX_HOPS.check(41).is_err());
        assert!(MST_REVISION.check(65535).is_ok());
        assert!(MST_INSTANCE_ID.check(-1).is_err());
        assert!(MST_INSTANCE_VLAN.check(0).is_err());
        assert!(INTERFACE_PRIORITY.check(240).is_ok());
        assert!(INTERFACE_COST.check(0).is_err());
        assert!(INTERFACE_MST_COST.check(200_000_000).is_ok());
        assert!(AUTO_RECOVERY_INTERVAL.check(29).is_err());
        assert!(LBD_SHUTDOWN_INTERVAL.check(86400).is_ok());
    }

    #[test]
    fn test_range_error_names_bounds() {
        let err = FORWARD_DELAY.check(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(
            err.to_string(),
            "STP forward delay value must be in range 4-30."
        );
    }

    #[test]
    fn test_bridge_priority() {
        assert!(bridge_priority(32768).is_ok());
        assert!(bridge_priority(0).is_ok());
        assert!(bridge_priority(61440).is_ok());

        let err = bridge_priority(32769).unwrap_err();
        assert!(err.to_string().contains("multiple of 4096"));

        let err = bridge_priority(65536).unwrap_err();
        assert!(err.to_string().contains("0-61440"));
    }

    #[test]
    fn test_mst_instance_priority() {
        assert!(mst_instance_priority(4096).is_ok());
        assert!(mst_instance_priority(100).is_err());
        assert!(mst_instance_priority(-4096).is_err());
    }

    #[test]
    fn test_mst_name() {
        assert!(mst_name("region1").is_ok());
        assert!(mst_name(&"a".repeat(32)).is_ok());
        assert!(mst_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_interface_name() {
        assert!(interface_name("Ethernet0").is_ok());
        assert!(interface_name("PortChannel10").is_ok());
        assert_eq!(
            interface_name("eth0").unwrap_err().kind(),
            ErrorKind::Format
        );
        assert!(interface_name("Ethernet").is_err());
        assert!(interface_name("Vlan100").is_err());
    }

    #[test]
    fn test_validate_timers() {
        assert!(validate_timers(15, 20, 2).is_ok());
        assert!(validate_timers(15, 30, 2).is_err());
        // 2*(4-1)=6 >= 6 >= 2*(2+1)=6
        assert!(validate_timers(4, 6, 2).is_ok());
        assert!(validate_timers(4, 6, 3).is_err());
        assert!(bridge_timers(&BridgeTimers::default()).is_ok());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("cost", "200").unwrap(), 200);
        assert_eq!(parse_number("cost", "x").unwrap_err().kind(), ErrorKind::Format);
    }
}
