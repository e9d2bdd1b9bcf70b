//! Infrastructure: reference implementations of the billing store traits.
//!
//! The in-memory stores here are the single-writer baseline used by tests,
//! examples, and benches. A SQL-backed deployment implements the same traits
//! with its own uniqueness constraints; the billing core does not change.

pub mod memory;

pub use memory::{InMemoryInvoiceStore, InMemoryServiceDirectory};

#[cfg(test)]
mod integration_tests;
