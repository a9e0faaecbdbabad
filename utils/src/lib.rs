//! Shared utilities for the Quillpost project.
//!
//! This crate holds helpers shared across workspace members, currently
//! the build-time version information exposed by the service.

pub mod version_info;
