//! Integration test suite for nestplate
//!
//! End-to-end tests that build real sites in temporary directories and render
//! them through the library and the compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: content placement, nesting, front matter, `parse: html`,
//!   indentation handling, and YAML lists
//! - **props**: property forwarding and scope isolation
//! - **build**: site builds, configuration, and dependency tracking
//! - **cli**: the `nestplate` binary

mod build;
mod cli;
mod props;
mod scenarios;
