//! End-to-end runs of the invoice generator against the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use hostcrm_billing::{BillingError, InvoiceGenerator, InvoiceStore, StoreError};
use hostcrm_core::{CustomerId, PlanId, ServiceId};
use hostcrm_invoicing::{BillingCycle, InvoiceStatus, InvoiceType, NumberBucket};
use hostcrm_services::{Plan, Service, ServiceStatus, ServiceType};

use crate::memory::{InMemoryInvoiceStore, InMemoryServiceDirectory};

type Generator =
    InvoiceGenerator<Arc<InMemoryServiceDirectory>, Arc<InMemoryInvoiceStore>, Arc<InMemoryInvoiceStore>>;

fn setup() -> (Arc<InMemoryServiceDirectory>, Arc<InMemoryInvoiceStore>, Generator) {
    let directory = Arc::new(InMemoryServiceDirectory::new());
    let store = Arc::new(InMemoryInvoiceStore::new());
    let generator = InvoiceGenerator::new(Arc::clone(&directory), Arc::clone(&store), Arc::clone(&store));
    (directory, store, generator)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 29, 9, 0, 0).unwrap()
}

fn hosting(expires_at: DateTime<Utc>, price: u64) -> Service {
    Service {
        id: ServiceId::new(),
        customer_id: CustomerId::new(),
        service_type: ServiceType::Hosting,
        status: ServiceStatus::Active,
        domain_name: "example.com".to_string(),
        plan: Some(Plan::new(PlanId::new(), "Starter", price)),
        expires_at,
    }
}

fn domain(expires_at: DateTime<Utc>) -> Service {
    Service {
        id: ServiceId::new(),
        customer_id: CustomerId::new(),
        service_type: ServiceType::Domain,
        status: ServiceStatus::Active,
        domain_name: "example.org".to_string(),
        plan: None,
        expires_at,
    }
}

#[test]
fn eligible_hosting_service_gets_one_renewal_invoice() {
    let (directory, store, generator) = setup();
    let now = now();
    let service = hosting(now + Duration::days(10), 50_000);
    directory.upsert(service.clone());

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);

    let invoices = store.all();
    assert_eq!(invoices.len(), 1);
    let invoice = &invoices[0];
    assert_eq!(invoice.invoice_type, InvoiceType::Renewal);
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.amount, 50_000);
    assert_eq!(invoice.service_id, service.id);
    assert_eq!(invoice.customer_id, service.customer_id);
    assert_eq!(invoice.issued_at, now);
    assert_eq!(invoice.due_at, service.expires_at - Duration::days(7));
    assert_eq!(invoice.cycle, BillingCycle::Monthly);
    assert_eq!(invoice.period_start, service.expires_at.date_naive());
    assert_eq!(invoice.number.to_string(), "INV-2026-08-0001");
    assert!(invoice.note.contains("example.com"));
    assert!(invoice.note.contains("hosting"));
}

#[test]
fn second_run_creates_nothing_new() {
    let (directory, store, generator) = setup();
    let now = now();
    directory.upsert(hosting(now + Duration::days(10), 50_000));

    let first = generator.run_at(now, 30).unwrap();
    assert_eq!(first.created, 1);

    let second = generator.run_at(now, 30).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn services_outside_the_window_are_not_billed() {
    let (directory, store, generator) = setup();
    let now = now();
    directory.upsert(hosting(now + Duration::days(45), 50_000));
    directory.upsert(hosting(now - Duration::days(1), 50_000));

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 0);
    assert!(store.is_empty());
}

#[test]
fn suspended_services_are_not_billed() {
    let (directory, store, generator) = setup();
    let now = now();
    let mut service = hosting(now + Duration::days(10), 50_000);
    service.status = ServiceStatus::Suspended;
    directory.upsert(service);

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 0);
    assert!(store.is_empty());
}

#[test]
fn domain_services_bill_the_flat_price() {
    let (directory, store, generator) = setup();
    let now = now();
    directory.upsert(domain(now + Duration::days(20)));

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);

    let invoice = &store.all()[0];
    assert_eq!(invoice.amount, 150_000);
    assert!(invoice.note.contains("example.org"));
    assert!(invoice.note.contains("domain"));
}

#[test]
fn numbers_increase_by_one_across_a_run() {
    let (directory, store, generator) = setup();
    let now = now();
    directory.upsert(hosting(now + Duration::days(5), 10_000));
    directory.upsert(hosting(now + Duration::days(15), 20_000));
    directory.upsert(hosting(now + Duration::days(25), 30_000));

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 3);

    let mut sequences: Vec<u32> = store.all().iter().map(|i| i.number.sequence()).collect();
    sequences.sort_unstable();
    assert_eq!(sequences, vec![1, 2, 3]);

    let bucket = NumberBucket::for_timestamp(now);
    for invoice in store.all() {
        assert_eq!(invoice.number.bucket(), bucket);
    }
}

#[test]
fn hosting_without_plan_fails_without_creating_an_invoice() {
    let (directory, store, generator) = setup();
    let now = now();
    let mut service = hosting(now + Duration::days(10), 0);
    service.plan = None;
    directory.upsert(service);

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.failed, 1);
    assert!(store.is_empty());
}

#[test]
fn one_failing_service_does_not_starve_the_rest() {
    let (directory, store, generator) = setup();
    let now = now();

    // Fails first (earliest expiry): hosting without a priceable plan.
    let mut broken = hosting(now + Duration::days(5), 0);
    broken.plan = None;
    directory.upsert(broken);
    directory.upsert(hosting(now + Duration::days(15), 75_000));

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.all()[0].amount, 75_000);
}

#[test]
fn shortened_expiry_within_grace_is_still_suppressed() {
    let (directory, store, generator) = setup();
    let now = now();
    let mut service = hosting(now + Duration::days(10), 50_000);
    directory.upsert(service.clone());

    assert_eq!(generator.run_at(now, 30).unwrap().created, 1);

    // Expiry pulled in by less than the 7-day grace window: the period key
    // changes, but the existing invoice's due date still falls inside
    // [new expiry − 7d, new expiry].
    service.expires_at = now + Duration::days(7);
    directory.upsert(service);

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn extended_expiry_is_a_new_billing_period() {
    let (directory, store, generator) = setup();
    let now = now();
    let mut service = hosting(now + Duration::days(10), 50_000);
    directory.upsert(service.clone());

    assert_eq!(generator.run_at(now, 30).unwrap().created, 1);

    // Expiry pushed out past the grace window: the upcoming period is now a
    // different one and gets its own invoice.
    service.expires_at = now + Duration::days(25);
    directory.upsert(service);

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn setup_invoice_is_due_fourteen_days_after_issue() {
    let (_, store, generator) = setup();
    let now = now();
    let service = hosting(now + Duration::days(90), 50_000);

    let invoice = generator.create_setup_invoice_at(&service, 25_000, now).unwrap();
    assert_eq!(invoice.invoice_type, InvoiceType::Setup);
    assert_eq!(invoice.amount, 25_000);
    assert_eq!(invoice.issued_at, now);
    assert_eq!(invoice.due_at, now + Duration::days(14));
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.note.contains("Setup"));
    assert_eq!(store.len(), 1);
}

#[test]
fn setup_invoices_do_not_block_renewal_billing() {
    let (directory, store, generator) = setup();
    let now = now();
    let service = hosting(now + Duration::days(10), 50_000);
    directory.upsert(service.clone());

    generator.create_setup_invoice_at(&service, 25_000, now).unwrap();

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn zero_day_window_is_rejected() {
    let (_, _, generator) = setup();
    let err = generator.run_at(now(), 0).unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));
}

#[test]
fn quarterly_and_annual_cycles_are_classified() {
    let (directory, store, generator) = setup();
    let now = now();
    directory.upsert(hosting(now + Duration::days(80), 50_000));

    let summary = generator.run_at(now, 90).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(store.all()[0].cycle, BillingCycle::Quarterly);

    let (directory, store, generator) = setup();
    directory.upsert(hosting(now + Duration::days(400), 50_000));
    let summary = generator.run_at(now, 450).unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(store.all()[0].cycle, BillingCycle::Annually);
}

#[test]
fn sequence_continues_from_invoices_created_before_the_run() {
    let (directory, store, generator) = setup();
    let now = now();
    let service = hosting(now + Duration::days(60), 50_000);
    directory.upsert(hosting(now + Duration::days(10), 50_000));

    // A setup invoice issued earlier this month takes sequence 1.
    generator.create_setup_invoice_at(&service, 25_000, now - Duration::days(3)).unwrap();

    let summary = generator.run_at(now, 30).unwrap();
    assert_eq!(summary.created, 1);

    let latest = store.latest_with_prefix("INV-2026-08-").unwrap().unwrap();
    assert_eq!(latest.number.sequence(), 2);
    assert_eq!(latest.invoice_type, InvoiceType::Renewal);
}

#[test]
fn directory_failure_aborts_the_run() {
    struct FailingDirectory;

    impl hostcrm_billing::ServiceDirectory for FailingDirectory {
        fn list_active_expiring(
            &self,
            _window_start: DateTime<Utc>,
            _window_end: DateTime<Utc>,
        ) -> Result<Vec<Service>, StoreError> {
            Err(StoreError::Backend("directory offline".to_string()))
        }
    }

    let store = Arc::new(InMemoryInvoiceStore::new());
    let generator = InvoiceGenerator::new(FailingDirectory, Arc::clone(&store), Arc::clone(&store));
    let err = generator.run_at(now(), 30).unwrap_err();
    assert!(matches!(err, BillingError::Store(StoreError::Backend(_))));
}
