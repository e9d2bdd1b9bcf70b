use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use hostcrm_core::{CustomerId, Entity, InvoiceId, ServiceId};

use crate::number::InvoiceNumber;

/// What an invoice bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    /// Bill generated ahead of a service's expiry to fund its next period.
    Renewal,
    /// One-time bill issued at provisioning time.
    Setup,
}

/// Invoice status lifecycle.
///
/// Billing only ever creates `Pending` invoices; `Paid`/`Cancelled` are owned
/// by downstream payment flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

/// Descriptive classification of how far out a renewal falls.
///
/// Labels only; the cycle never changes amounts or due dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl BillingCycle {
    /// Bucket a whole-month distance: ≤1 monthly, ≤3 quarterly, ≤6
    /// semi-annually, else annually. Negative distances clamp to monthly.
    pub fn for_months(whole_months: i64) -> Self {
        match whole_months {
            m if m <= 1 => BillingCycle::Monthly,
            m if m <= 3 => BillingCycle::Quarterly,
            m if m <= 6 => BillingCycle::SemiAnnually,
            _ => BillingCycle::Annually,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::SemiAnnually => "semi_annually",
            BillingCycle::Annually => "annually",
        }
    }
}

/// A billable record tied to exactly one service and, transitively, one
/// customer. A service accrues one renewal invoice per billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: InvoiceNumber,
    pub invoice_type: InvoiceType,
    pub service_id: ServiceId,
    pub customer_id: CustomerId,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount: u64,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub cycle: BillingCycle,
    pub status: InvoiceStatus,
    /// Billing-period key: the service expiry date this invoice covers.
    /// At most one renewal invoice may exist per `(service_id, period_start)`.
    pub period_start: NaiveDate,
    /// Human-readable note embedding the service's domain name and type.
    pub note: String,
}

impl Invoice {
    pub fn is_renewal(&self) -> bool {
        self.invoice_type == InvoiceType::Renewal
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
