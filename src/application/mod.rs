//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Session registry and lifecycle orchestration
//! - Errors: Domain-specific errors
//! - Messaging: Line parsing, built-in commands, dispatching

pub mod errors;
pub mod messaging;
pub mod services;
