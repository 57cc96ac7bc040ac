//! Collaborator implementations and process bootstrap.

pub mod error;
pub mod loopback;
pub mod store;
pub mod telemetry;
