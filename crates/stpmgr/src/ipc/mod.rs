//! stpd IPC protocol.
//!
//! Messages are little-endian, packed datagrams: an `i32 msgType, u32 msgLen`
//! envelope followed by a fixed-layout payload of `msgLen` bytes.

mod message;
mod wire;

pub use message::*;

use thiserror::Error;

/// Result type alias for IPC encoding and decoding.
pub type IpcResult<T> = Result<T, IpcError>;

/// Wire encoding and decoding errors.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Interface name '{name}' is {len} bytes, longer than {max}")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("Interface name is not valid UTF-8")]
    InvalidName,

    #[error("Message truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Unknown message type {0}")]
    UnknownMessageType(i32),

    #[error("Declared payload length {declared} does not match {actual} bytes")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("Invalid opcode {0}")]
    InvalidOpcode(u8),

    #[error("Invalid element count {0}")]
    InvalidCount(i32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
