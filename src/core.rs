//! Resolution engine module.
//!
//! Definitions, the dependency graph, builders, hooks and the
//! [`FixturesManager`](fixtura_core::FixturesManager).
//!
//! # Examples
//!
//! ```rust
//! use fixtura::core::graph::DepGraph;
//! use fixtura::core::manager::FixturesManager;
//! ```

pub use fixtura_core::*;
