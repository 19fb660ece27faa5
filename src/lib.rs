//! A declarative schema and sanitizing query-templating layer over a
//! relational driver.
//!
//! Columns are declared lazily with a fluent builder and replayed against
//! the driver at `init()`; statements go through sanitizing templates
//! that support single-row and batched binding without name collisions;
//! every write is checked against per-column validators before it reaches
//! the driver.

pub mod driver;
pub mod engine;
pub mod error;
pub mod tables;
