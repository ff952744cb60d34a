//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Audit: Append-only audit log
//! - Adapters: Transport integrations (TCP, in-memory)

pub mod adapters;
pub mod audit;
pub mod config;
