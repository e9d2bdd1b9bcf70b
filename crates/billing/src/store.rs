//! Store traits the generator is wired against.
//!
//! These replace the original active-record access pattern with explicit
//! repository seams: the generator owns the billing rules, implementations
//! own persistence and its uniqueness guarantees.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use hostcrm_core::ServiceId;
use hostcrm_invoicing::{Invoice, InvoiceNumber, NumberBucket};
use hostcrm_services::Service;

/// Persistence-layer failure surfaced to the billing core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An invoice with this number already exists. Retriable with a fresh
    /// allocation.
    #[error("duplicate invoice number: {0}")]
    DuplicateNumber(String),

    /// A renewal invoice already covers this service's billing period. Not
    /// retriable; the period is billed.
    #[error("renewal invoice already exists for service {service_id}, period {period_start}")]
    DuplicatePeriod {
        service_id: ServiceId,
        period_start: NaiveDate,
    },

    /// The backend itself failed (connectivity, I/O, ...).
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Read-only view of provisioned services.
pub trait ServiceDirectory: Send + Sync {
    /// Services with status `active` and expiry in `(window_start, window_end]`,
    /// ordered by expiry ascending.
    fn list_active_expiring(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Service>, StoreError>;
}

/// Invoice persistence.
pub trait InvoiceStore: Send + Sync {
    /// Whether a renewal invoice for this service has a due date in
    /// `[window_start, window_end]`.
    fn renewal_exists_in_window(
        &self,
        service_id: ServiceId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Whether a renewal invoice already covers `(service_id, period_start)`.
    fn renewal_exists_for_period(
        &self,
        service_id: ServiceId,
        period_start: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// The invoice with the highest number under `prefix`, if any.
    fn latest_with_prefix(&self, prefix: &str) -> Result<Option<Invoice>, StoreError>;

    /// Persist a new invoice. Must reject duplicate numbers and duplicate
    /// renewal periods with the corresponding [`StoreError`] variant.
    fn create(&self, invoice: Invoice) -> Result<Invoice, StoreError>;
}

/// Serialized invoice number allocation.
///
/// Implementations must hand out strictly increasing sequences per bucket
/// even under concurrent callers; "find max, add one" without serialization
/// is exactly the race this trait exists to prevent.
pub trait InvoiceNumberAllocator: Send + Sync {
    fn next(&self, bucket: NumberBucket) -> Result<InvoiceNumber, StoreError>;
}

impl<T> ServiceDirectory for Arc<T>
where
    T: ServiceDirectory + ?Sized,
{
    fn list_active_expiring(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Service>, StoreError> {
        (**self).list_active_expiring(window_start, window_end)
    }
}

impl<T> InvoiceStore for Arc<T>
where
    T: InvoiceStore + ?Sized,
{
    fn renewal_exists_in_window(
        &self,
        service_id: ServiceId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).renewal_exists_in_window(service_id, window_start, window_end)
    }

    fn renewal_exists_for_period(
        &self,
        service_id: ServiceId,
        period_start: NaiveDate,
    ) -> Result<bool, StoreError> {
        (**self).renewal_exists_for_period(service_id, period_start)
    }

    fn latest_with_prefix(&self, prefix: &str) -> Result<Option<Invoice>, StoreError> {
        (**self).latest_with_prefix(prefix)
    }

    fn create(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        (**self).create(invoice)
    }
}

impl<T> InvoiceNumberAllocator for Arc<T>
where
    T: InvoiceNumberAllocator + ?Sized,
{
    fn next(&self, bucket: NumberBucket) -> Result<InvoiceNumber, StoreError> {
        (**self).next(bucket)
    }
}
