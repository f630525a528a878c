pub mod actions;
pub mod app;
pub mod bridge;
pub mod config;
pub mod correlator;
pub mod dispatch;
pub mod rate_limit;
pub mod receiver;
pub mod shared;
pub mod store;

pub use bridge::{Bridge, ExecuteOutcome};
pub use shared::errors::BridgeError;
