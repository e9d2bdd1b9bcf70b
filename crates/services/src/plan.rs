use serde::{Deserialize, Serialize};

use hostcrm_core::{Entity, PlanId};

/// A hosting plan a service can be subscribed to.
///
/// Carries the price renewal billing charges for hosting services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    /// Selling price per billing period in smallest currency unit (e.g., cents).
    pub selling_price: u64,
}

impl Plan {
    pub fn new(id: PlanId, name: impl Into<String>, selling_price: u64) -> Self {
        Self {
            id,
            name: name.into(),
            selling_price,
        }
    }
}

impl Entity for Plan {
    type Id = PlanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_carries_selling_price() {
        let plan = Plan::new(PlanId::new(), "Starter", 99_000);
        assert_eq!(plan.selling_price, 99_000);
        assert_eq!(plan.name, "Starter");
    }
}
