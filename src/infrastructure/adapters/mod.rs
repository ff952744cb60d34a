//! Transport adapters

pub mod memory;
pub mod tcp;

pub use memory::MemorySink;
pub use tcp::{TcpSink, TcpTransport};
