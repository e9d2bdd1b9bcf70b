//! The renewal invoice generator.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hostcrm_core::{InvoiceId, ServiceId};
use hostcrm_invoicing::{BillingCycle, Invoice, InvoiceStatus, InvoiceType, NumberBucket};
use hostcrm_services::{Service, ServiceType};

use crate::store::{InvoiceNumberAllocator, InvoiceStore, ServiceDirectory, StoreError};

/// Attempts at persisting under a freshly allocated number before giving up.
const NUMBER_CONFLICT_RETRIES: u32 = 3;

/// Billing policy knobs.
///
/// All values have the production defaults; override per deployment via the
/// usual serde config layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    /// Default lookahead window for renewal runs, in days.
    pub days_before: u32,
    /// Renewal invoices fall due this many days before service expiry.
    pub renewal_grace_days: u32,
    /// Setup invoices fall due this many days after issue.
    pub setup_due_days: u32,
    /// Flat renewal price for domain services, in smallest currency unit.
    pub domain_renewal_price: u64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            days_before: 30,
            renewal_grace_days: 7,
            setup_due_days: 14,
            domain_renewal_price: 150_000,
        }
    }
}

/// Billing-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A hosting service reached billing without a priceable plan. Surfaced
    /// instead of silently billing zero.
    #[error("hosting service {service_id} has no plan to price its renewal")]
    MissingPlanPrice { service_id: ServiceId },

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Outcome of one renewal billing run.
///
/// `created` is the count callers of the batch entry point care about;
/// failures are already logged per service by the time this is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub created: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Generates renewal (and setup) invoices for services nearing expiry.
///
/// Stateless between runs; all state lives behind the injected stores, so a
/// run is idempotent given identical inputs and no new services entering the
/// window.
pub struct InvoiceGenerator<D, S, N> {
    directory: D,
    invoices: S,
    numbers: N,
    policy: BillingPolicy,
}

impl<D, S, N> InvoiceGenerator<D, S, N>
where
    D: ServiceDirectory,
    S: InvoiceStore,
    N: InvoiceNumberAllocator,
{
    pub fn new(directory: D, invoices: S, numbers: N) -> Self {
        Self {
            directory,
            invoices,
            numbers,
            policy: BillingPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BillingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Run with the policy's default lookahead window.
    pub fn run(&self) -> Result<RunSummary, BillingError> {
        self.generate_renewal_invoices(self.policy.days_before)
    }

    /// Ensure every active service expiring within `days_before` days has a
    /// pending renewal invoice. Returns how many were created.
    pub fn generate_renewal_invoices(&self, days_before: u32) -> Result<RunSummary, BillingError> {
        self.run_at(Utc::now(), days_before)
    }

    /// Deterministic variant of [`generate_renewal_invoices`] with an explicit
    /// clock, used by tests and backfills.
    ///
    /// [`generate_renewal_invoices`]: Self::generate_renewal_invoices
    pub fn run_at(
        &self,
        now: DateTime<Utc>,
        days_before: u32,
    ) -> Result<RunSummary, BillingError> {
        if days_before == 0 {
            return Err(BillingError::Validation(
                "lookahead window must be at least one day".to_string(),
            ));
        }

        let window_end = now + Duration::days(i64::from(days_before));
        let services = self.directory.list_active_expiring(now, window_end)?;

        let mut summary = RunSummary::default();
        for service in &services {
            // One service's failure must not starve the rest of the window.
            match self.process_service(service, now) {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        service_id = %service.id,
                        domain = %service.domain_name,
                        error = %err,
                        "renewal invoice creation failed"
                    );
                }
            }
        }

        tracing::info!(
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            days_before,
            "renewal billing run finished"
        );
        Ok(summary)
    }

    fn process_service(
        &self,
        service: &Service,
        now: DateTime<Utc>,
    ) -> Result<bool, BillingError> {
        if !service.is_active() {
            tracing::debug!(service_id = %service.id, "directory returned non-active service, skipping");
            return Ok(false);
        }
        if !self.should_generate_invoice(service)? {
            return Ok(false);
        }
        self.create_renewal_invoice_at(service, now)?;
        Ok(true)
    }

    /// Duplicate-prevention guard.
    ///
    /// False if the service's upcoming billing period (keyed by expiry date)
    /// is already invoiced, or if a renewal invoice has a due date within the
    /// grace window `[expiry − grace, expiry]`. The period key is the real
    /// uniqueness guarantee; the due-date window is kept as a secondary guard
    /// against expiry dates shifting by less than the grace window.
    pub fn should_generate_invoice(&self, service: &Service) -> Result<bool, BillingError> {
        let period_start = service.expires_at.date_naive();
        if self
            .invoices
            .renewal_exists_for_period(service.id, period_start)?
        {
            return Ok(false);
        }

        let grace = Duration::days(i64::from(self.policy.renewal_grace_days));
        let window_start = service.expires_at - grace;
        if self
            .invoices
            .renewal_exists_in_window(service.id, window_start, service.expires_at)?
        {
            return Ok(false);
        }

        Ok(true)
    }

    /// Create a renewal invoice for `service`, issued now.
    pub fn create_renewal_invoice(&self, service: &Service) -> Result<Invoice, BillingError> {
        self.create_renewal_invoice_at(service, Utc::now())
    }

    pub fn create_renewal_invoice_at(
        &self,
        service: &Service,
        now: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        let amount = self.renewal_amount(service)?;
        let cycle = BillingCycle::for_months(whole_months_between(now, service.expires_at));
        let grace = Duration::days(i64::from(self.policy.renewal_grace_days));
        let due_at = service.expires_at - grace;
        let note = format!(
            "Renewal invoice for {} ({})",
            service.domain_name, service.service_type
        );

        self.persist(
            service,
            InvoiceType::Renewal,
            amount,
            now,
            due_at,
            cycle,
            note,
        )
    }

    /// Create a one-time setup invoice with a caller-supplied amount, issued
    /// now and due after the policy's setup terms.
    pub fn create_setup_invoice(
        &self,
        service: &Service,
        amount: u64,
    ) -> Result<Invoice, BillingError> {
        self.create_setup_invoice_at(service, amount, Utc::now())
    }

    pub fn create_setup_invoice_at(
        &self,
        service: &Service,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        let cycle = BillingCycle::for_months(whole_months_between(now, service.expires_at));
        let due_at = now + Duration::days(i64::from(self.policy.setup_due_days));
        let note = format!(
            "Setup invoice for {} ({})",
            service.domain_name, service.service_type
        );

        self.persist(service, InvoiceType::Setup, amount, now, due_at, cycle, note)
    }

    /// Renewal amount rule: hosting bills its plan's selling price, domains
    /// bill the flat policy price. A hosting service without a plan is an
    /// error, never a zero-amount invoice.
    pub fn renewal_amount(&self, service: &Service) -> Result<u64, BillingError> {
        renewal_amount(&self.policy, service)
    }

    fn persist(
        &self,
        service: &Service,
        invoice_type: InvoiceType,
        amount: u64,
        issued_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
        cycle: BillingCycle,
        note: String,
    ) -> Result<Invoice, BillingError> {
        let bucket = NumberBucket::for_timestamp(issued_at);
        // Renewals key their billing period on the expiry they fund; setup
        // invoices are one-shot and key on the issue date.
        let period_start = match invoice_type {
            InvoiceType::Renewal => service.expires_at.date_naive(),
            InvoiceType::Setup => issued_at.date_naive(),
        };

        let mut attempts = 0;
        loop {
            let number = self.numbers.next(bucket)?;
            let invoice = Invoice {
                id: InvoiceId::new(),
                number,
                invoice_type,
                service_id: service.id,
                customer_id: service.customer_id,
                amount,
                issued_at,
                due_at,
                cycle,
                status: InvoiceStatus::Pending,
                period_start,
                note: note.clone(),
            };

            match self.invoices.create(invoice) {
                Ok(stored) => {
                    tracing::debug!(
                        invoice = %stored.number,
                        service_id = %service.id,
                        amount,
                        "invoice created"
                    );
                    return Ok(stored);
                }
                Err(StoreError::DuplicateNumber(num)) => {
                    attempts += 1;
                    if attempts >= NUMBER_CONFLICT_RETRIES {
                        return Err(StoreError::DuplicateNumber(num).into());
                    }
                    tracing::debug!(number = %num, attempts, "invoice number collision, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn renewal_amount(policy: &BillingPolicy, service: &Service) -> Result<u64, BillingError> {
    match service.service_type {
        ServiceType::Hosting => service
            .plan
            .as_ref()
            .map(|plan| plan.selling_price)
            .ok_or(BillingError::MissingPlanPrice {
                service_id: service.id,
            }),
        ServiceType::Domain => Ok(policy.domain_renewal_price),
    }
}

/// Whole calendar months from `from` to `to` (floor; negative if `to` is in
/// the past).
fn whole_months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let mut months = i64::from(to.year() - from.year()) * 12
        + (i64::from(to.month()) - i64::from(from.month()));
    if to.day() < from.day() {
        months -= 1;
    }
    months
}
