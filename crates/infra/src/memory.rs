//! In-memory stores for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};

use hostcrm_billing::{InvoiceNumberAllocator, InvoiceStore, ServiceDirectory, StoreError};
use hostcrm_core::{Entity, ServiceId};
use hostcrm_invoicing::{Invoice, InvoiceNumber, NumberBucket};
use hostcrm_services::Service;

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} lock poisoned"))
}

/// In-memory service directory.
#[derive(Debug, Default)]
pub struct InMemoryServiceDirectory {
    services: RwLock<Vec<Service>>,
}

impl InMemoryServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a service by id.
    pub fn upsert(&self, service: Service) {
        if let Ok(mut services) = self.services.write() {
            match services.iter_mut().find(|s| s.id() == service.id()) {
                Some(existing) => *existing = service,
                None => services.push(service),
            }
        }
    }
}

impl ServiceDirectory for InMemoryServiceDirectory {
    fn list_active_expiring(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Service>, StoreError> {
        let services = self
            .services
            .read()
            .map_err(|_| poisoned("service directory"))?;

        let mut matches: Vec<Service> = services
            .iter()
            .filter(|s| s.is_active() && s.expires_at > window_start && s.expires_at <= window_end)
            .cloned()
            .collect();
        matches.sort_by_key(|s| s.expires_at);
        Ok(matches)
    }
}

#[derive(Debug, Default)]
struct InvoiceState {
    invoices: Vec<Invoice>,
    numbers: HashSet<InvoiceNumber>,
    renewal_periods: HashSet<(ServiceId, NaiveDate)>,
    /// High-water sequence per bucket. Never decreases, so numbers are not
    /// reused even if invoices vanish out-of-band.
    sequences: HashMap<NumberBucket, u32>,
}

/// In-memory invoice store.
///
/// Also serves as the [`InvoiceNumberAllocator`]: allocations go through the
/// store's own write lock, which is what serializes the per-bucket counter.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    inner: RwLock<InvoiceState>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Invoice> {
        match self.inner.read() {
            Ok(state) => state.invoices.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(state) => state.invoices.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn renewal_exists_in_window(
        &self,
        service_id: ServiceId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned("invoice store"))?;
        Ok(state.invoices.iter().any(|i| {
            i.is_renewal()
                && i.service_id == service_id
                && i.due_at >= window_start
                && i.due_at <= window_end
        }))
    }

    fn renewal_exists_for_period(
        &self,
        service_id: ServiceId,
        period_start: NaiveDate,
    ) -> Result<bool, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned("invoice store"))?;
        Ok(state.renewal_periods.contains(&(service_id, period_start)))
    }

    fn latest_with_prefix(&self, prefix: &str) -> Result<Option<Invoice>, StoreError> {
        let state = self.inner.read().map_err(|_| poisoned("invoice store"))?;
        Ok(state
            .invoices
            .iter()
            .filter(|i| i.number.to_string().starts_with(prefix))
            .max_by_key(|i| i.number)
            .cloned())
    }

    fn create(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned("invoice store"))?;

        if state.numbers.contains(&invoice.number) {
            return Err(StoreError::DuplicateNumber(invoice.number.to_string()));
        }
        let period_key = (invoice.service_id, invoice.period_start);
        if invoice.is_renewal() && state.renewal_periods.contains(&period_key) {
            return Err(StoreError::DuplicatePeriod {
                service_id: invoice.service_id,
                period_start: invoice.period_start,
            });
        }

        state.numbers.insert(invoice.number);
        if invoice.is_renewal() {
            state.renewal_periods.insert(period_key);
        }
        // Keep the counter at or above any number persisted past the
        // allocator (e.g. imported invoices).
        let bucket = invoice.number.bucket();
        let seq = invoice.number.sequence();
        let high_water = state.sequences.entry(bucket).or_insert(0);
        if *high_water < seq {
            *high_water = seq;
        }

        state.invoices.push(invoice.clone());
        tracing::trace!(invoice = %invoice.number, "invoice stored");
        Ok(invoice)
    }
}

impl InvoiceNumberAllocator for InMemoryInvoiceStore {
    fn next(&self, bucket: NumberBucket) -> Result<InvoiceNumber, StoreError> {
        let mut state = self.inner.write().map_err(|_| poisoned("invoice store"))?;

        let current = match state.sequences.get(&bucket) {
            Some(&seq) => seq,
            // First allocation in this bucket: seed from the persisted maximum.
            None => state
                .invoices
                .iter()
                .filter(|i| i.number.bucket() == bucket)
                .map(|i| i.number.sequence())
                .max()
                .unwrap_or(0),
        };

        let next = current + 1;
        state.sequences.insert(bucket, next);
        InvoiceNumber::new(bucket, next).map_err(|e| StoreError::Backend(e.to_string()))
    }
}
