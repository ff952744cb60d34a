//! Application services - Shared state and session lifecycle

pub mod lifecycle;
pub mod registry;

pub use lifecycle::LifecycleCoordinator;
pub use registry::{BroadcastReport, SessionRegistry};
