//! Domain layer - Core chat objects and the seams to the outside world
//!
//! This layer contains:
//! - Entities: Session, Command, CommandTable
//! - Traits: Abstractions for transports and command bodies (OutputSink, CommandHandler)

pub mod entities;
pub mod traits;
