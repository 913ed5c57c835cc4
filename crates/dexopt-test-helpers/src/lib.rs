//! Test utilities and fixtures for dexopt
//!
//! This crate provides shared test helpers that can be used by the
//! integration tests (tests/ directory) of the other workspace crates.

pub mod builder;
pub mod fixtures;
pub mod query;

pub use builder::ProgramBuilder;
