//! Core data types for Poise.
//!
//! This crate defines the types a dependency resolution session works on:
//! versions and constraint ranges, package names, dependency descriptors,
//! `pyproject.toml` parsing and validation, the lockfile and global
//! configuration.
//!
//! This crate is intentionally free of network I/O.

pub mod config;
pub mod constraint;
pub mod dependency;
pub mod lockfile;
pub mod manifest;
pub mod name;
pub mod version;
