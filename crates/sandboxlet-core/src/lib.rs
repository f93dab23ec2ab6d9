//! sandboxlet-core: Core types for the sandboxlet container runtime client
//!
//! This crate provides the types shared by the client and its frontends:
//! - Container identifiers and addresses
//! - The set of runtime commands and their names
//! - Configuration types
//! - Error handling

pub mod config;
pub mod container;
pub mod error;

pub use config::*;
pub use container::*;
pub use error::*;
