//! Demo labs and offerings for local runs and tests.

use rust_decimal::Decimal;

use protelab_core::{LabId, Money, Percentage};
use protelab_labs::{ExecutionPolicy, Lab, ServiceOffering, ServiceType};

use crate::error::ServiceResult;
use crate::store::Store;

fn percentage(value: i64) -> ServiceResult<Percentage> {
    Ok(Percentage::new(Decimal::from(value))?)
}

fn money(cents: i64) -> ServiceResult<Money> {
    Ok(Money::new(Decimal::new(cents, 2))?)
}

/// Three labs: Carlos Lab (zirconia/crown), Ana Protética (resin, does not
/// take subcontracts) and Lab Implantes (implant/zirconia).
///
/// Re-running replaces the same rows.
pub fn seed_demo<S: Store>(store: &S) -> ServiceResult<()> {
    let carlos = Lab {
        registration: "PRT123".to_string(),
        specialization: Some("Zirconia".to_string()),
        min_subcontract_percentage: Some(percentage(35)?),
        subcontract_score: Some(Decimal::new(45, 1)),
        subcontract_count: 10,
        ..Lab::new(LabId::new(1), "Carlos Lab", "carlos@lab.com")
    };
    let ana = Lab {
        registration: "PRT456".to_string(),
        specialization: Some("Resin".to_string()),
        accepts_subcontracting: false,
        ..Lab::new(LabId::new(2), "Ana Protética", "ana@lab.com")
    };
    let implantes = Lab {
        registration: "PRT789".to_string(),
        specialization: Some("Implants".to_string()),
        min_subcontract_percentage: Some(percentage(40)?),
        subcontract_score: Some(Decimal::new(48, 1)),
        subcontract_count: 15,
        ..Lab::new(LabId::new(3), "Lab Implantes", "implantes@lab.com")
    };

    let offerings = vec![
        ServiceOffering {
            price: Some(money(80000)?),
            subcontracted_price: Some(money(56000)?),
            subcontracted_lead_time_days: Some(5),
            preferred_subcontractor: Some(implantes.id),
            ..ServiceOffering::new(carlos.id, ServiceType::Zirconia, ExecutionPolicy::OwnOrSubcontracted)
        },
        ServiceOffering {
            price: Some(money(45000)?),
            subcontracted_price: Some(money(30000)?),
            subcontracted_lead_time_days: Some(4),
            ..ServiceOffering::new(carlos.id, ServiceType::Crown, ExecutionPolicy::OwnOrSubcontracted)
        },
        ServiceOffering {
            price: Some(money(25000)?),
            ..ServiceOffering::new(ana.id, ServiceType::Resin, ExecutionPolicy::Own)
        },
        // Listed, but Ana's lab-wide switch keeps it out of subcontracting.
        ServiceOffering::new(ana.id, ServiceType::Zirconia, ExecutionPolicy::OwnOrSubcontracted),
        ServiceOffering {
            price: Some(money(150000)?),
            subcontracted_price: Some(money(120000)?),
            subcontracted_lead_time_days: Some(10),
            ..ServiceOffering::new(implantes.id, ServiceType::Implant, ExecutionPolicy::OwnOrSubcontracted)
        },
        ServiceOffering {
            price: Some(money(85000)?),
            subcontracted_price: Some(money(60000)?),
            subcontracted_lead_time_days: Some(6),
            ..ServiceOffering::new(implantes.id, ServiceType::Zirconia, ExecutionPolicy::OwnOrSubcontracted)
        },
    ];

    store.transaction(|tx| -> ServiceResult<()> {
        for lab in [carlos, ana, implantes] {
            tx.labs_mut().insert_lab(lab)?;
        }
        for offering in offerings {
            tx.offerings_mut().upsert_offering(offering)?;
        }
        Ok(())
    })?;

    tracing::info!(labs = 3, "demo labs seeded");
    Ok(())
}
