use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use protelab_core::{LabId, Money, Percentage};
use protelab_labs::{ExecutionPolicy, Lab, ServiceOffering, ServiceType};

/// A lab that can take subcontracted work for one service type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleLabView {
    pub id: LabId,
    pub name: String,
    pub email: String,
    pub registration: String,
    pub specialization: Option<String>,
    pub service_type: ServiceType,
    pub policy: ExecutionPolicy,
    pub min_subcontract_percentage: Option<Percentage>,
    pub subcontracted_price: Option<Money>,
    pub subcontracted_lead_time_days: Option<u32>,
    pub subcontract_score: Option<Decimal>,
    pub subcontract_count: u32,
}

impl EligibleLabView {
    pub fn new(lab: &Lab, offering: &ServiceOffering) -> Self {
        Self {
            id: lab.id,
            name: lab.name.clone(),
            email: lab.email.clone(),
            registration: lab.registration.clone(),
            specialization: lab.specialization.clone(),
            service_type: offering.service_type,
            policy: offering.policy,
            min_subcontract_percentage: lab.min_subcontract_percentage,
            subcontracted_price: offering.subcontracted_price,
            subcontracted_lead_time_days: offering.subcontracted_lead_time_days,
            subcontract_score: lab.subcontract_score,
            subcontract_count: lab.subcontract_count,
        }
    }
}
