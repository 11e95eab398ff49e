//! Shared test utilities for shardkv crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`strategies`] - proptest generators for keys, ranges and settings
//! - [`assert_byte_ordered`] / [`assert_unique`] - checks for scan and sequence output
//! - [`test_batch_config`] and friends - small configurations for fast tests

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

pub mod strategies;

mod assertions;
pub use assertions::{assert_byte_ordered, assert_unique};

mod config;
pub use config::{
    TEST_NODE, test_batch_config, test_scan_config, test_sequence_config, test_timeout_config,
};
