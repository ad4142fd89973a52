//! stpmgr - spanning tree configuration manager for SONiC
//!
//! Validates STP/RSTP/MSTP configuration requests, persists them to
//! CONFIG_DB and notifies stpd over its Unix datagram IPC socket.

pub mod channel;
pub mod error;
pub mod ipc;
pub mod notify;
pub mod range;
pub mod settings;
pub mod state;
mod stp_mgr;
pub mod tables;
pub mod types;
pub mod validate;

pub use channel::{DaemonChannel, DaemonChannelConfig, DaemonNotifier};
pub use error::{ErrorKind, StpError, StpResult};
pub use ipc::{IpcError, IpcMessage, IpcResult};
pub use settings::StpCfgSettings;
pub use stp_mgr::{
    MutationOutcome, MutationPhase, Notification, StpMgr, DEFAULT_LBD_SHUTDOWN_INTERVAL,
    MAX_PVST_VLANS,
};
pub use types::*;
