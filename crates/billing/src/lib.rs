//! Renewal invoice generation.
//!
//! The billing core of the reseller CRM: reads active services nearing expiry
//! from a [`ServiceDirectory`], decides whether each needs a renewal invoice,
//! computes amount/cycle/due date, and persists through an [`InvoiceStore`].
//! Both stores are injected traits; there is no global state and no direct
//! persistence in this crate.
//!
//! Invoice numbers are allocated through [`InvoiceNumberAllocator`], which
//! implementations must serialize per year+month bucket. The generator
//! additionally retries on duplicate-number conflicts so a backend that
//! enforces uniqueness instead of serializing also works.

pub mod generator;
pub mod store;

pub use generator::{BillingError, BillingPolicy, InvoiceGenerator, RunSummary};
pub use store::{InvoiceNumberAllocator, InvoiceStore, ServiceDirectory, StoreError};
