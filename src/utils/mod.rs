// Utils module - system access shared by the provisioning steps
pub mod accounts;
pub mod exec;

// Re-export commonly used utilities
pub use exec::{CommandOutput, CommandSpec, LocalSystem, SystemCommand};
