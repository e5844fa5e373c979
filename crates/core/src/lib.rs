//! Domain types and pure logic shared by every relift crate.
//!
//! Nothing in here performs I/O. Stage output shapes, run and log
//! records, the status machine, the quality formula, hook definitions,
//! and payload sanitisation all live here so the persistence, tool, and
//! pipeline crates agree on one vocabulary.

pub mod analysis;
pub mod config;
pub mod deployment;
pub mod error;
pub mod hooks;
pub mod plan;
pub mod project;
pub mod providers;
pub mod quality;
pub mod records;
pub mod sanitize;
pub mod status;
pub mod types;
