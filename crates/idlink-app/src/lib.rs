//! Application layer for idlink.
//!
//! This crate provides the identity reconciliation engine, the directory
//! abstraction it drives, and the configuration shared by the dispatcher binary.

pub mod config;
pub mod directory;
pub mod error;
pub mod link;
pub mod password;
pub mod provision;
pub mod reconcile;

// Re-exports for convenience
pub use config::{AppConfig, DEFAULT_CONFIG_FILE, DirectoryConfig};
pub use directory::Directory;
pub use error::ReconcileError;
pub use link::LinkOperation;
pub use password::{Password, PasswordGenerator, PasswordPolicy, RandomPasswordGenerator};
pub use provision::{Provisioned, ProvisioningOperation};
pub use reconcile::{PassThroughReason, ReconcileService, Reconciliation, pass_through_reason};
