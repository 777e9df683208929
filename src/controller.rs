//! Controller access: the gateway trait and the bundled implementations.

pub mod file;
pub mod gateway;
pub mod memory;

pub use file::FileGateway;
pub use gateway::ControllerGateway;
pub use memory::MemoryGateway;
