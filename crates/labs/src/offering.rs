use core::str::FromStr;

use serde::{Deserialize, Serialize};

use protelab_core::{DomainError, LabId, Money};

/// Kind of prosthetic work an order asks for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Crown,
    FixedBridge,
    Provisional,
    CompleteDenture,
    PartialDenture,
    Zirconia,
    Resin,
    Implant,
    Orthodontics,
    Other,
}

impl ServiceType {
    pub const ALL: [ServiceType; 10] = [
        ServiceType::Crown,
        ServiceType::FixedBridge,
        ServiceType::Provisional,
        ServiceType::CompleteDenture,
        ServiceType::PartialDenture,
        ServiceType::Zirconia,
        ServiceType::Resin,
        ServiceType::Implant,
        ServiceType::Orthodontics,
        ServiceType::Other,
    ];

    /// Wire name, also used as the default requested-service description.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Crown => "crown",
            ServiceType::FixedBridge => "fixed_bridge",
            ServiceType::Provisional => "provisional",
            ServiceType::CompleteDenture => "complete_denture",
            ServiceType::PartialDenture => "partial_denture",
            ServiceType::Zirconia => "zirconia",
            ServiceType::Resin => "resin",
            ServiceType::Implant => "implant",
            ServiceType::Orthodontics => "orthodontics",
            ServiceType::Other => "other",
        }
    }
}

impl core::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

impl FromStr for ServiceType {
    type Err = DomainError;

    /// Lenient parse: case/space/hyphen-insensitive, `bridge` is accepted for
    /// `fixed_bridge`, and any other non-empty name falls back to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        if normalized.is_empty() {
            return Err(DomainError::invalid_argument("service type must not be empty"));
        }
        if normalized == "bridge" {
            return Ok(ServiceType::FixedBridge);
        }
        Ok(ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .unwrap_or(ServiceType::Other))
    }
}

/// How a lab executes a service it lists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    Own,
    Subcontracted,
    OwnOrSubcontracted,
    NotOffered,
}

impl ExecutionPolicy {
    /// Whether another lab may hand this service over to the offering lab.
    pub fn permits_subcontracting(&self) -> bool {
        matches!(
            self,
            ExecutionPolicy::Subcontracted | ExecutionPolicy::OwnOrSubcontracted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPolicy::Own => "own",
            ExecutionPolicy::Subcontracted => "subcontracted",
            ExecutionPolicy::OwnOrSubcontracted => "own_or_subcontracted",
            ExecutionPolicy::NotOffered => "not_offered",
        }
    }
}

impl core::fmt::Display for ExecutionPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPolicy {
    type Err = core::convert::Infallible;

    /// Unknown or empty input means the service is not offered.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match normalize(s).as_str() {
            "own" => ExecutionPolicy::Own,
            "subcontracted" => ExecutionPolicy::Subcontracted,
            "own_or_subcontracted" => ExecutionPolicy::OwnOrSubcontracted,
            _ => ExecutionPolicy::NotOffered,
        })
    }
}

/// A lab's declared willingness, price and policy for one service type.
///
/// At most one offering exists per `(lab_id, service_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub lab_id: LabId,
    pub service_type: ServiceType,
    pub active: bool,
    pub policy: ExecutionPolicy,
    pub price: Option<Money>,
    pub subcontracted_price: Option<Money>,
    pub subcontracted_lead_time_days: Option<u32>,
    pub preferred_subcontractor: Option<LabId>,
}

impl ServiceOffering {
    pub fn new(lab_id: LabId, service_type: ServiceType, policy: ExecutionPolicy) -> Self {
        Self {
            lab_id,
            service_type,
            active: true,
            policy,
            price: None,
            subcontracted_price: None,
            subcontracted_lead_time_days: None,
            preferred_subcontractor: None,
        }
    }

    pub fn key(&self) -> (LabId, ServiceType) {
        (self.lab_id, self.service_type)
    }

    /// Active and with a policy that lets other labs subcontract to it.
    pub fn accepts_subcontracted_work(&self) -> bool {
        self.active && self.policy.permits_subcontracting()
    }
}
