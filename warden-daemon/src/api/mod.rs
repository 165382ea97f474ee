//! JSON-RPC API for daemon IPC.
//!
//! Web front ends call into `wardend` over a local socket to run sign-ins and
//! translate session references.

pub mod handlers;
pub mod server;
pub mod types;

pub use handlers::{ApiState, PendingStates, SharedStore, WardenApiImpl, WardenApiServer};
pub use server::{ServerHandle, start_server};
pub use types::*;
