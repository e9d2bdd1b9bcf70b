use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use hostcrm_core::{CustomerId, Entity, ServiceId};

use crate::plan::Plan;

/// Kind of product a service represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Hosting,
    Domain,
}

impl ServiceType {
    /// Stable lowercase label, used in invoice notes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Hosting => "hosting",
            ServiceType::Domain => "domain",
        }
    }
}

impl core::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service status lifecycle.
///
/// Only `Active` services are eligible for renewal billing; the other states
/// are owned by provisioning/suspension flows outside this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Active,
    Suspended,
    Expired,
    Cancelled,
}

/// A customer's purchased hosting or domain product.
///
/// Read-only from the billing core's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub customer_id: CustomerId,
    pub service_type: ServiceType,
    pub status: ServiceStatus,
    /// Display name only; availability/registration is out of scope here.
    pub domain_name: String,
    /// Attached plan. Expected for hosting services, absent for domains.
    pub plan: Option<Plan>,
    pub expires_at: DateTime<Utc>,
}

impl Service {
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }

    /// Whether this service falls inside the renewal lookahead window
    /// `(now, now + days_before]`.
    ///
    /// Already-expired services are excluded: past-due recovery is a dunning
    /// concern, not renewal pre-billing.
    pub fn is_renewable_within(&self, now: DateTime<Utc>, days_before: u32) -> bool {
        let window_end = now + Duration::days(i64::from(days_before));
        self.is_active() && self.expires_at > now && self.expires_at <= window_end
    }
}

impl Entity for Service {
    type Id = ServiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
