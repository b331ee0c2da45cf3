//! Prosthetics lab entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use protelab_core::{Entity, LabId, Percentage};

/// A prosthetics lab. Owns orders as primary lab and may take subcontracted
/// work from other labs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lab {
    pub id: LabId,
    pub name: String,
    pub email: String,
    pub registration: String,
    pub specialization: Option<String>,
    /// Lab-wide switch; a lab that opts out never receives subcontract requests.
    pub accepts_subcontracting: bool,
    /// Lowest share of an order's value this lab will take on.
    pub min_subcontract_percentage: Option<Percentage>,
    pub subcontract_score: Option<Decimal>,
    pub subcontract_count: u32,
}

impl Lab {
    pub fn new(id: LabId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            registration: String::new(),
            specialization: None,
            accepts_subcontracting: true,
            min_subcontract_percentage: None,
            subcontract_score: None,
            subcontract_count: 0,
        }
    }

    /// Whether `percentage` meets this lab's minimum (labs without a minimum
    /// take any share).
    pub fn accepts_percentage(&self, percentage: Percentage) -> bool {
        self.min_subcontract_percentage
            .is_none_or(|min| percentage >= min)
    }

    pub fn summary(&self) -> LabSummary {
        LabSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            registration: self.registration.clone(),
        }
    }
}

impl Entity for Lab {
    type Id = LabId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Public fields of a lab, safe to show to other labs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabSummary {
    pub id: LabId,
    pub name: String,
    pub email: String,
    pub registration: String,
}
