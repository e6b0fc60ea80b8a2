//! Pre sign-up trigger contract for idlink
//!
//! This crate defines the event the directory hands to the pre sign-up trigger,
//! which trigger sources are reconciled, and how events travel as JSON between
//! the directory and the engine.

mod codec;
mod config;
mod error;
mod types;

pub use codec::{parse_event, read_event, write_event};
pub use config::TriggerConfig;
pub use error::{Result, TriggerError};
pub use types::{SignUpEvent, SignUpRequest, SignUpResponse, TriggerSource};
