//! Durable interactive views for chat-style remote surfaces.
//!
//! A view renders into a message on a remote service. The [`runtime`] keeps
//! recently used views in memory, persists every committed state, and
//! rebuilds evicted views on demand, repairing the remote message when it no
//! longer matches what the view would render.

pub mod cache;
pub mod config;
pub mod demo;
pub mod domain;
pub mod error;
pub mod infra;
pub mod pipeline;
pub mod runtime;
mod sync;
pub mod view;

pub use vellum_content as content;
