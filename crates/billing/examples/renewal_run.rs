//! Seed the in-memory stores with a handful of services and execute one
//! renewal billing run, printing the outcome as JSON.
//!
//! Run with `RUST_LOG=debug` to see the per-invoice log lines.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use hostcrm_billing::InvoiceGenerator;
use hostcrm_core::{CustomerId, PlanId, ServiceId};
use hostcrm_infra::{InMemoryInvoiceStore, InMemoryServiceDirectory};
use hostcrm_services::{Plan, Service, ServiceStatus, ServiceType};

fn service(
    service_type: ServiceType,
    domain_name: &str,
    plan: Option<Plan>,
    expires_in_days: i64,
) -> Service {
    Service {
        id: ServiceId::new(),
        customer_id: CustomerId::new(),
        service_type,
        status: ServiceStatus::Active,
        domain_name: domain_name.to_string(),
        plan,
        expires_at: Utc::now() + Duration::days(expires_in_days),
    }
}

fn main() -> Result<()> {
    hostcrm_observability::init();

    let directory = Arc::new(InMemoryServiceDirectory::new());
    directory.upsert(service(
        ServiceType::Hosting,
        "alpha.example",
        Some(Plan::new(PlanId::new(), "Starter", 99_000)),
        10,
    ));
    directory.upsert(service(ServiceType::Domain, "beta.example", None, 25));
    // Outside the default 30-day window; should be skipped entirely.
    directory.upsert(service(
        ServiceType::Hosting,
        "gamma.example",
        Some(Plan::new(PlanId::new(), "Business", 249_000)),
        120,
    ));

    let store = Arc::new(InMemoryInvoiceStore::new());
    let generator =
        InvoiceGenerator::new(Arc::clone(&directory), Arc::clone(&store), Arc::clone(&store));

    let summary = generator.run()?;
    println!("summary: {}", serde_json::to_string(&summary)?);

    for invoice in store.all() {
        println!("{}", serde_json::to_string_pretty(&invoice)?);
    }

    Ok(())
}
