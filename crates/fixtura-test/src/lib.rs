//! # Fixtura Test
//!
//! Test-suite integration for Fixtura.
//!
//! - [`FixturesTestCase`]: installs fixtures for one test and uninstalls them
//!   in reverse order when the test ends, including when it panics.
//! - [`fixtures`]: rstest fixtures providing a registry, a manager and a
//!   test case.

#![warn(missing_docs)]

pub mod fixtures;
pub mod testcase;

pub use testcase::FixturesTestCase;
