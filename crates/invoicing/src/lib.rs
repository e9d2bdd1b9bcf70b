//! Invoicing domain module.
//!
//! This crate contains the billable records produced by renewal billing,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Invoice creation is driven by `hostcrm-billing`; downstream
//! payment flows own the later status transitions.

pub mod invoice;
pub mod number;

pub use invoice::{BillingCycle, Invoice, InvoiceStatus, InvoiceType};
pub use number::{InvoiceNumber, NumberBucket};
