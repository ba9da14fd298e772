//! Structural analysis of source repositories: project trees, subsystem
//! classification, dependency ranking, and test coverage estimates.

pub mod config;
pub mod core;
pub mod error;

pub use crate::core::{
    analyze_insights, analyze_subsystems, analyze_test_coverage, build_project_tree, Engine,
};
pub use crate::error::{ReposcopeError, Result};
