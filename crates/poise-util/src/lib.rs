//! Shared utilities for Poise.
//!
//! This crate provides cross-cutting concerns used by all other Poise crates:
//! the unified error type, filesystem helpers, hashing, and terminal status
//! output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
