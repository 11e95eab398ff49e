//! Core types shared by the shardkv client engine.
//!
//! This crate provides the foundational types used throughout the client:
//! - Keys and the client-side byte order
//! - Remote status codes and their classification
//! - Identifier newtypes (DatabaseId, TableId, QuorumId)
//! - Consistency levels, batch modes and scan directions
//! - Declarative configuration structs

pub mod config;
pub mod key;
pub mod status;
pub mod types;

// Re-export commonly used types at crate root
pub use key::{ByteOrder, Key};
pub use status::{StatusClass, StatusCode, UNKNOWN_STATUS_NAME, status_name};
pub use types::*;
