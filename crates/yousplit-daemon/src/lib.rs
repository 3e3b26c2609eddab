//! yousplit-daemon: hosting runtime for one revenue-splitting pool.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon with newline-delimited JSON-RPC over a Unix socket; committed pool
//! changes are pushed back as event notifications.

pub mod auth;
pub mod commands;
pub mod config;
pub mod events;
pub mod rpc;
pub mod state;

pub use state::DaemonState;
