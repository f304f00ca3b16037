//! Shared test utilities for gradeflow integration tests.
//!
//! This module provides:
//! - `TestHarness` for running the pipeline against an in-memory database
//! - Builders and stub collaborators for creating test data programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
