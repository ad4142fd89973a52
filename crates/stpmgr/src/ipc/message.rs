//! Message layouts exchanged with stpd.

use byteorder::{LittleEndian, WriteBytesExt};

use super::wire::{write_bool, write_i32, write_name, Reader};
use super::{IpcError, IpcResult};
use crate::types::MacAddress;

/// Fixed width of interface names on the wire.
pub const IFNAMSIZ: usize = 16;

/// Length of the `msgType, msgLen` envelope.
pub const ENVELOPE_LEN: usize = 8;

/// Wire length of a [`PortAttr`].
pub const PORT_ATTR_LEN: usize = IFNAMSIZ + 2;

/// Wire length of a [`VlanAttr`].
pub const VLAN_ATTR_LEN: usize = 9;

/// Message type discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    InitDone = 1,
    BridgeConfig = 2,
    VlanConfig = 3,
    VlanPortConfig = 4,
    PortConfig = 5,
}

impl MessageType {
    /// Wire value of the type.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for MessageType {
    type Error = IpcError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(MessageType::InitDone),
            2 => Ok(MessageType::BridgeConfig),
            3 => Ok(MessageType::VlanConfig),
            4 => Ok(MessageType::VlanPortConfig),
            5 => Ok(MessageType::PortConfig),
            other => Err(IpcError::UnknownMessageType(other)),
        }
    }
}

/// Operation carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Disable = 0,
    Enable = 1,
}

impl Opcode {
    /// Enable when `enabled`, disable otherwise.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Opcode::Enable
        } else {
            Opcode::Disable
        }
    }

    fn code(&self) -> u8 {
        *self as u8
    }

    fn decode(r: &mut Reader<'_>) -> IpcResult<Self> {
        match r.u8()? {
            0 => Ok(Opcode::Disable),
            1 => Ok(Opcode::Enable),
            other => Err(IpcError::InvalidOpcode(other)),
        }
    }
}

/// Initialization barrier telling the daemon the configuration push is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitDone {
    pub opcode: Opcode,
    pub max_instances: u16,
}

/// Bridge-level enable/disable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub opcode: Opcode,
    pub stp_mode: u8,
    pub rootguard_timeout: i32,
    pub base_mac: MacAddress,
}

/// One port of a VLAN instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAttr {
    pub if_name: String,
    /// 1 tagged, 0 untagged
    pub mode: i8,
    pub enabled: bool,
}

/// VLAN/instance configuration with its member ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanConfig {
    pub opcode: Opcode,
    pub new_instance: bool,
    pub vlan_id: i32,
    pub inst_id: i32,
    pub forward_delay: i32,
    pub hello_time: i32,
    pub max_age: i32,
    pub priority: i32,
    pub ports: Vec<PortAttr>,
}

/// Per-instance port cost/priority override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanPortConfig {
    pub opcode: Opcode,
    pub vlan_id: i32,
    pub if_name: String,
    pub inst_id: i32,
    /// 0 leaves the cost unchanged
    pub path_cost: i32,
    /// -1 leaves the priority unchanged
    pub priority: i32,
}

/// One VLAN membership of a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanAttr {
    pub inst_id: i32,
    pub vlan_id: i32,
    /// 1 tagged, 0 untagged
    pub mode: i8,
}

/// Port-level configuration with its VLAN memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub opcode: Opcode,
    pub if_name: String,
    pub enabled: bool,
    pub root_guard: bool,
    pub bpdu_guard: bool,
    pub bpdu_guard_auto_disable: bool,
    pub portfast: bool,
    pub uplink_fast: bool,
    /// 0 leaves the cost unchanged
    pub path_cost: i32,
    /// -1 leaves the priority unchanged
    pub priority: i32,
    pub vlans: Vec<VlanAttr>,
}

/// A message to or from stpd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcMessage {
    InitDone(InitDone),
    BridgeConfig(BridgeConfig),
    VlanConfig(VlanConfig),
    VlanPortConfig(VlanPortConfig),
    PortConfig(PortConfig),
}

impl IpcMessage {
    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            IpcMessage::InitDone(_) => MessageType::InitDone,
            IpcMessage::BridgeConfig(_) => MessageType::BridgeConfig,
            IpcMessage::VlanConfig(_) => MessageType::VlanConfig,
            IpcMessage::VlanPortConfig(_) => MessageType::VlanPortConfig,
            IpcMessage::PortConfig(_) => MessageType::PortConfig,
        }
    }

    /// Encodes the message with its envelope.
    pub fn encode(&self) -> IpcResult<Vec<u8>> {
        let mut payload = Vec::new();
        match self {
            IpcMessage::InitDone(m) => m.encode_payload(&mut payload)?,
            IpcMessage::BridgeConfig(m) => m.encode_payload(&mut payload)?,
            IpcMessage::VlanConfig(m) => m.encode_payload(&mut payload)?,
            IpcMessage::VlanPortConfig(m) => m.encode_payload(&mut payload)?,
            IpcMessage::PortConfig(m) => m.encode_payload(&mut payload)?,
        }

        let msg_len = u32::try_from(payload.len()).map_err(|_| IpcError::LengthMismatch {
            declared: u32::MAX,
            actual: payload.len(),
        })?;

        let mut buf = Vec::with_capacity(ENVELOPE_LEN + payload.len());
        buf.write_i32::<LittleEndian>(self.message_type().code())?;
        buf.write_u32::<LittleEndian>(msg_len)?;
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decodes one datagram.
    pub fn decode(bytes: &[u8]) -> IpcResult<Self> {
        let mut envelope = Reader::new(bytes);
        let msg_type = MessageType::try_from(envelope.i32()?)?;
        let declared = envelope.u32()?;

        let payload = &bytes[ENVELOPE_LEN..];
        if usize::try_from(declared).ok() != Some(payload.len()) {
            return Err(IpcError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        let mut r = Reader::new(payload);
        let message = match msg_type {
            MessageType::InitDone => IpcMessage::InitDone(InitDone::decode_payload(&mut r)?),
            MessageType::BridgeConfig => {
                IpcMessage::BridgeConfig(BridgeConfig::decode_payload(&mut r)?)
            }
            MessageType::VlanConfig => IpcMessage::VlanConfig(VlanConfig::decode_payload(&mut r)?),
            MessageType::VlanPortConfig => {
                IpcMessage::VlanPortConfig(VlanPortConfig::decode_payload(&mut r)?)
            }
            MessageType::PortConfig => IpcMessage::PortConfig(PortConfig::decode_payload(&mut r)?),
        };

        if r.remaining() != 0 {
            return Err(IpcError::LengthMismatch {
                declared,
                actual: r.consumed(),
            });
        }

        Ok(message)
    }
}

impl InitDone {
    fn encode_payload(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        buf.write_u8(self.opcode.code())?;
        buf.write_u16::<LittleEndian>(self.max_instances)?;
        Ok(())
    }

    fn decode_payload(r: &mut Reader<'_>) -> IpcResult<Self> {
        Ok(Self {
            opcode: Opcode::decode(r)?,
            max_instances: r.u16()?,
        })
    }
}

impl BridgeConfig {
    fn encode_payload(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        buf.write_u8(self.opcode.code())?;
        buf.write_u8(self.stp_mode)?;
        write_i32(buf, self.rootguard_timeout)?;
        buf.extend_from_slice(self.base_mac.as_bytes());
        Ok(())
    }

    fn decode_payload(r: &mut Reader<'_>) -> IpcResult<Self> {
        Ok(Self {
            opcode: Opcode::decode(r)?,
            stp_mode: r.u8()?,
            rootguard_timeout: r.i32()?,
            base_mac: MacAddress::new(r.bytes::<6>()?),
        })
    }
}

impl PortAttr {
    fn encode(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        write_name(buf, &self.if_name)?;
        buf.write_i8(self.mode)?;
        write_bool(buf, self.enabled)
    }

    fn decode(r: &mut Reader<'_>) -> IpcResult<Self> {
        Ok(Self {
            if_name: r.name()?,
            mode: r.i8()?,
            enabled: r.bool()?,
        })
    }
}

impl VlanConfig {
    fn encode_payload(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        buf.write_u8(self.opcode.code())?;
        write_bool(buf, self.new_instance)?;
        write_i32(buf, self.vlan_id)?;
        write_i32(buf, self.inst_id)?;
        write_i32(buf, self.forward_delay)?;
        write_i32(buf, self.hello_time)?;
        write_i32(buf, self.max_age)?;
        write_i32(buf, self.priority)?;
        write_i32(buf, count(self.ports.len())?)?;
        for port in &self.ports {
            port.encode(buf)?;
        }
        Ok(())
    }

    fn decode_payload(r: &mut Reader<'_>) -> IpcResult<Self> {
        let opcode = Opcode::decode(r)?;
        let new_instance = r.bool()?;
        let vlan_id = r.i32()?;
        let inst_id = r.i32()?;
        let forward_delay = r.i32()?;
        let hello_time = r.i32()?;
        let max_age = r.i32()?;
        let priority = r.i32()?;
        let n = r.count(PORT_ATTR_LEN)?;
        let ports = (0..n)
            .map(|_| PortAttr::decode(r))
            .collect::<IpcResult<Vec<_>>>()?;

        Ok(Self {
            opcode,
            new_instance,
            vlan_id,
            inst_id,
            forward_delay,
            hello_time,
            max_age,
            priority,
            ports,
        })
    }
}

impl VlanPortConfig {
    fn encode_payload(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        buf.write_u8(self.opcode.code())?;
        write_i32(buf, self.vlan_id)?;
        write_name(buf, &self.if_name)?;
        write_i32(buf, self.inst_id)?;
        write_i32(buf, self.path_cost)?;
        write_i32(buf, self.priority)
    }

    fn decode_payload(r: &mut Reader<'_>) -> IpcResult<Self> {
        Ok(Self {
            opcode: Opcode::decode(r)?,
            vlan_id: r.i32()?,
            if_name: r.name()?,
            inst_id: r.i32()?,
            path_cost: r.i32()?,
            priority: r.i32()?,
        })
    }
}

impl VlanAttr {
    fn encode(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        write_i32(buf, self.inst_id)?;
        write_i32(buf, self.vlan_id)?;
        buf.write_i8(self.mode)?;
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> IpcResult<Self> {
        Ok(Self {
            inst_id: r.i32()?,
            vlan_id: r.i32()?,
            mode: r.i8()?,
        })
    }
}

impl PortConfig {
    fn encode_payload(&self, buf: &mut Vec<u8>) -> IpcResult<()> {
        buf.write_u8(self.opcode.code())?;
        write_name(buf, &self.if_name)?;
        write_bool(buf, self.enabled)?;
        write_bool(buf, self.root_guard)?;
        write_bool(buf, self.bpdu_guard)?;
        write_bool(buf, self.bpdu_guard_auto_disable)?;
        write_bool(buf, self.portfast)?;
        write_bool(buf, self.uplink_fast)?;
        write_i32(buf, self.path_cost)?;
        write_i32(buf, self.priority)?;
        write_i32(buf, count(self.vlans.len())?)?;
        for vlan in &self.vlans {
            vlan.encode(buf)?;
        }
        Ok(())
    }

    fn decode_payload(r: &mut Reader<'_>) -> IpcResult<Self> {
        let opcode = Opcode::decode(r)?;
        let if_name = r.name()?;
        let enabled = r.bool()?;
        let root_guard = r.bool()?;
        let bpdu_guard = r.bool()?;
        let bpdu_guard_auto_disable = r.bool()?;
        let portfast = r.bool()?;
        let uplink_fast = r.bool()?;
        let path_cost = r.i32()?;
        let priority = r.i32()?;
        let n = r.count(VLAN_ATTR_LEN)?;
        let vlans = (0..n)
            .map(|_| VlanAttr::decode(r))
            .collect::<IpcResult<Vec<_>>>()?;

        Ok(Self {
            opcode,
            if_name,
            enabled,
            root_guard,
            bpdu_guard,
            bpdu_guard_auto_disable,
            portfast,
            uplink_fast,
            path_cost,
            priority,
            vlans,
        })
    }
}

fn count(len: usize) -> IpcResult<i32> {
    i32::try_from(len).map_err(|_| IpcError::InvalidCount(i32::MAX))
}
