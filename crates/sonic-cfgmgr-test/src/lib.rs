//! Test infrastructure for SONiC configuration managers
//!
//! Provides:
//! - CONFIG_DB change builders and switch topology fixtures
//! - Store verification helpers
//! - A fault-injecting store wrapper for error-path tests

mod faults;
pub mod fixtures;
mod verification;

pub use faults::{FaultyStore, StoreOp};
pub use fixtures::*;
pub use verification::*;
