//! Multi-user line-based chatroom.
//!
//! Connected users are kept in a shared [`SessionRegistry`]; every input line
//! is parsed and run by the [`CommandDispatcher`], and the
//! [`LifecycleCoordinator`] takes care of join/leave side effects.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::ChatError;
pub use application::messaging::{CommandDispatcher, DispatchOutcome};
pub use application::services::{LifecycleCoordinator, SessionRegistry};
pub use domain::entities::Session;
pub use domain::traits::OutputSink;
