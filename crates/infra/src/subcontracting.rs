//! Subcontracting service: one lab handing (part of) an order to another.
//!
//! Every call loads the order, checks which lab is asking, runs the aggregate
//! operation and writes the order together with its history record in a
//! single transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use protelab_core::{AggregateRoot, DomainError, ExpectedVersion, LabId, OrderId, Percentage};
use protelab_labs::{Lab, ServiceType};
use protelab_orders::{Order, SubcontractRecord, SubcontractStatus, SubcontractType, is_active};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle::load_order;
use crate::projections::{EligibleLabView, SubcontractView};
use crate::store::{Store, Transaction};

/// What the primary lab asks of the target lab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcontractRequest {
    pub target_lab: LabId,
    /// Share of the order's value, in `(0, 100]`.
    pub percentage: Option<Decimal>,
    pub kind: SubcontractType,
    pub reason: Option<String>,
    /// Defaults to the order's service type.
    pub service_description: Option<String>,
}

impl SubcontractRequest {
    pub fn to(target_lab: LabId) -> Self {
        Self {
            target_lab,
            percentage: None,
            kind: SubcontractType::default(),
            reason: None,
            service_description: None,
        }
    }
}

/// Which side of the subcontract a lab is on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Party {
    Requester,
    Executor,
}

fn load_lab(tx: &dyn Transaction, lab_id: LabId) -> ServiceResult<Lab> {
    tx.labs()
        .find_by_id(lab_id)?
        .ok_or_else(|| ServiceError::not_found(format!("lab {lab_id} not found")))
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Labs that take subcontracted `service_type` work, ordered by lab id.
fn eligible_labs(
    tx: &dyn Transaction,
    service_type: ServiceType,
    exclude: Option<LabId>,
) -> ServiceResult<Vec<EligibleLabView>> {
    let mut labs = Vec::new();
    for offering in tx
        .offerings()
        .find_active_offerings_by_service_type(service_type)?
    {
        if !offering.accepts_subcontracted_work() || Some(offering.lab_id) == exclude {
            continue;
        }
        match tx.labs().find_by_id(offering.lab_id)? {
            Some(lab) if lab.accepts_subcontracting => {
                labs.push(EligibleLabView::new(&lab, &offering));
            }
            _ => {}
        }
    }
    Ok(labs)
}

fn build_view(
    tx: &dyn Transaction,
    order: &Order,
    record: Option<&SubcontractRecord>,
) -> ServiceResult<SubcontractView> {
    let details = order.subcontract().ok_or_else(|| never_subcontracted(order))?;
    let requesting = load_lab(tx, order.lab_id())?;
    let subcontracted = details
        .lab_id
        .or(record.map(|r| r.destination_lab))
        .map(|id| load_lab(tx, id))
        .transpose()?;
    Ok(SubcontractView::new(
        order,
        details,
        &requesting,
        subcontracted.as_ref(),
        record,
    ))
}

fn never_subcontracted(order: &Order) -> ServiceError {
    DomainError::transition_conflict(
        format!("order {} was never subcontracted", order.order_id()),
        order.subcontract_status(),
        "subcontract",
    )
    .into()
}

#[derive(Debug)]
pub struct SubcontractingService<S, C = SystemTimeSource> {
    store: S,
    clock: C,
}

impl<S> SubcontractingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemTimeSource,
        }
    }
}

impl<S, C> SubcontractingService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }
}

impl<S, C> SubcontractingService<S, C>
where
    S: Store,
    C: TimeSource,
{
    /// Primary lab asks `request.target_lab` to take over (part of) the order.
    pub fn request_subcontract(
        &self,
        order_id: OrderId,
        requesting_lab: LabId,
        request: SubcontractRequest,
    ) -> ServiceResult<SubcontractView> {
        let at = self.clock.now();
        let target_lab = request.target_lab;

        let result: ServiceResult<SubcontractView> = self.store.transaction(|tx| {
            let mut order = load_order(tx, order_id)?;
            if order.lab_id() != requesting_lab {
                return Err(ServiceError::forbidden(format!(
                    "lab {requesting_lab} is not the primary lab of order {order_id}"
                )));
            }
            if target_lab == requesting_lab {
                return Err(ServiceError::invalid_argument("cannot subcontract to self"));
            }

            let target = load_lab(tx, target_lab)?;
            let service_type = order.service_type();
            let offering = tx
                .offerings()
                .find_by_lab_and_service_type(target_lab, service_type)?
                .ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "lab {target_lab} does not offer {service_type}"
                    ))
                })?;
            if !offering.accepts_subcontracted_work() {
                return Err(ServiceError::invalid_argument(format!(
                    "lab {target_lab} does not take subcontracted {service_type} work \
                     (policy {}, active {})",
                    offering.policy, offering.active
                )));
            }
            if !target.accepts_subcontracting {
                return Err(ServiceError::invalid_argument(format!(
                    "lab {target_lab} does not accept subcontracting"
                )));
            }

            let percentage = request.percentage.map(Percentage::new).transpose()?;
            if let Some(pct) = percentage {
                if !target.accepts_percentage(pct) {
                    return Err(ServiceError::invalid_argument(format!(
                        "lab {target_lab} only accepts subcontracts from {} (got {pct})",
                        target
                            .min_subcontract_percentage
                            .map(|m| m.to_string())
                            .unwrap_or_default()
                    )));
                }
            }

            let duplicate = tx
                .history()
                .find_by_order_ids(&[order_id])?
                .iter()
                .any(|r| r.destination_lab == target_lab && is_active(r.status));
            if duplicate {
                return Err(ServiceError::conflict(format!(
                    "duplicate request: order {order_id} already has an open subcontract with lab {target_lab}"
                )));
            }

            let loaded = order.version();
            let reason = non_empty(request.reason.as_deref()).map(str::to_string);
            order.request_subcontract(target_lab, percentage, request.kind, reason.clone(), at)?;
            tx.orders_mut().save(&order, ExpectedVersion::Exact(loaded))?;

            let description = non_empty(request.service_description.as_deref())
                .unwrap_or(service_type.as_str())
                .to_string();
            let amount = order.subcontract().and_then(|d| d.amount);
            let record = tx.history_mut().save(SubcontractRecord::requested(
                order_id,
                requesting_lab,
                target_lab,
                description,
                reason,
                amount,
                at,
            ))?;

            build_view(tx, &order, Some(&record))
        });

        match result {
            Ok(view) => {
                tracing::info!(
                    order_id = %order_id,
                    from = %requesting_lab,
                    to = %target_lab,
                    kind = %view.kind,
                    "subcontract requested"
                );
                Ok(view)
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %order_id,
                    requesting_lab = %requesting_lab,
                    target_lab = %target_lab,
                    error = %err,
                    "subcontract request rejected"
                );
                Err(err)
            }
        }
    }

    pub fn accept(&self, order_id: OrderId, responding_lab: LabId) -> ServiceResult<SubcontractView> {
        self.update(
            order_id,
            responding_lab,
            SubcontractStatus::Accepted,
            &[Party::Executor],
            |order, _, at| {
                order.accept_subcontract(at)?;
                Ok(None)
            },
        )
    }

    /// The subcontractor declines. A non-empty `reason` is kept as
    /// `Refused: <reason>`.
    pub fn refuse(
        &self,
        order_id: OrderId,
        responding_lab: LabId,
        reason: Option<&str>,
    ) -> ServiceResult<SubcontractView> {
        let note = non_empty(reason).map(|r| format!("Refused: {r}"));
        self.update(
            order_id,
            responding_lab,
            SubcontractStatus::Refused,
            &[Party::Executor],
            |order, _, at| {
                order.refuse_subcontract(at)?;
                Ok(note)
            },
        )
    }

    pub fn start(&self, order_id: OrderId, responding_lab: LabId) -> ServiceResult<SubcontractView> {
        self.update(
            order_id,
            responding_lab,
            SubcontractStatus::InProgress,
            &[Party::Executor],
            |order, _, at| {
                order.start_subcontract_execution(at)?;
                Ok(None)
            },
        )
    }

    pub fn complete(&self, order_id: OrderId, responding_lab: LabId) -> ServiceResult<SubcontractView> {
        self.update(
            order_id,
            responding_lab,
            SubcontractStatus::Completed,
            &[Party::Executor],
            |order, _, at| {
                order.complete_subcontract(at)?;
                Ok(None)
            },
        )
    }

    /// Either side withdraws from an open subcontract.
    pub fn cancel(
        &self,
        order_id: OrderId,
        requester: LabId,
        reason: Option<&str>,
    ) -> ServiceResult<SubcontractView> {
        let reason = non_empty(reason).map(str::to_string);
        self.update(
            order_id,
            requester,
            SubcontractStatus::Cancelled,
            &[Party::Requester, Party::Executor],
            move |order, party, at| {
                order.cancel_subcontract(at)?;
                let side = match party {
                    Party::Requester => "Cancelled by requester",
                    Party::Executor => "Cancelled by executor",
                };
                Ok(Some(match reason {
                    Some(reason) => format!("{side}: {reason}"),
                    None => side.to_string(),
                }))
            },
        )
    }

    /// Labs that could take `service_type` work, optionally leaving one out.
    pub fn list_eligible_labs(
        &self,
        service_type: ServiceType,
        exclude: Option<LabId>,
    ) -> ServiceResult<Vec<EligibleLabView>> {
        tracing::debug!(service_type = %service_type, "listing eligible labs");
        self.store
            .read(|tx| eligible_labs(tx, service_type, exclude))
    }

    /// The lab's configured preferred subcontractor for `service_type` when it
    /// can take the work, otherwise the first eligible lab.
    pub fn suggest_preferred_subcontractor(
        &self,
        lab_id: LabId,
        service_type: ServiceType,
    ) -> ServiceResult<Option<EligibleLabView>> {
        tracing::debug!(lab_id = %lab_id, service_type = %service_type, "suggesting subcontractor");
        self.store.read(|tx| {
            let preferred = tx
                .offerings()
                .find_by_lab_and_service_type(lab_id, service_type)?
                .and_then(|own| own.preferred_subcontractor)
                .filter(|preferred| *preferred != lab_id);

            if let Some(preferred) = preferred {
                let offering = tx
                    .offerings()
                    .find_by_lab_and_service_type(preferred, service_type)?;
                let lab = tx.labs().find_by_id(preferred)?;
                if let (Some(offering), Some(lab)) = (offering, lab) {
                    if offering.accepts_subcontracted_work() && lab.accepts_subcontracting {
                        return Ok(Some(EligibleLabView::new(&lab, &offering)));
                    }
                }
            }

            Ok(eligible_labs(tx, service_type, Some(lab_id))?.into_iter().next())
        })
    }

    pub fn find_by_order(&self, order_id: OrderId) -> ServiceResult<SubcontractView> {
        tracing::debug!(order_id = %order_id, "loading subcontract");
        self.store.read(|tx| {
            let order = load_order(tx, order_id)?;
            let record = tx.history().find_latest_by_order_id(order_id)?;
            build_view(tx, &order, record.as_ref())
        })
    }

    /// Subcontracts where `lab_id` is the primary lab or the current
    /// subcontractor, ordered by order id.
    pub fn list_for_lab(&self, lab_id: LabId) -> ServiceResult<Vec<SubcontractView>> {
        tracing::debug!(lab_id = %lab_id, "listing subcontracts for lab");
        self.store.read(|tx| {
            load_lab(tx, lab_id)?;
            let orders: Vec<Order> = tx
                .orders()
                .find_by_lab(lab_id)?
                .into_iter()
                .filter(|o| o.subcontract().is_some())
                .collect();
            let ids: Vec<OrderId> = orders.iter().map(Order::order_id).collect();
            let records = tx.history().find_by_order_ids(&ids)?;

            orders
                .iter()
                .map(|order| {
                    let latest = records
                        .iter()
                        .rev()
                        .find(|r| r.order_id == order.order_id());
                    build_view(tx, order, latest)
                })
                .collect()
        })
    }

    /// Shared path for every call made on an existing subcontract.
    ///
    /// `op` runs the aggregate operation and may return a note, which is
    /// appended to both the order's reason and the history record.
    fn update<F>(
        &self,
        order_id: OrderId,
        lab_id: LabId,
        attempted: SubcontractStatus,
        allowed: &[Party],
        op: F,
    ) -> ServiceResult<SubcontractView>
    where
        F: FnOnce(&mut Order, Party, DateTime<Utc>) -> ServiceResult<Option<String>>,
    {
        let at = self.clock.now();
        let result: ServiceResult<(SubcontractStatus, SubcontractView)> =
            self.store.transaction(|tx| {
                let mut order = load_order(tx, order_id)?;
                if order.subcontract().is_none() {
                    return Err(never_subcontracted(&order));
                }
                let latest = tx.history().find_latest_by_order_id(order_id)?;

                // After a refusal or cancellation the order forgets the
                // subcontractor; the history still knows who it was.
                let executor = order
                    .subcontracted_lab()
                    .or(latest.as_ref().map(|r| r.destination_lab));
                let party = if allowed.contains(&Party::Executor) && executor == Some(lab_id) {
                    Party::Executor
                } else if allowed.contains(&Party::Requester) && order.lab_id() == lab_id {
                    Party::Requester
                } else {
                    return Err(ServiceError::forbidden(format!(
                        "lab {lab_id} may not move the subcontract of order {order_id} to {attempted}"
                    )));
                };

                let from = order.subcontract_status();
                let loaded = order.version();
                let note = op(&mut order, party, at)?;
                if let Some(note) = &note {
                    order.append_subcontract_note(note)?;
                }
                tx.orders_mut().save(&order, ExpectedVersion::Exact(loaded))?;

                let record = match latest {
                    Some(mut record) => {
                        record.record_status(order.subcontract_status(), at);
                        if let Some(note) = &note {
                            record.append_note(note);
                        }
                        Some(tx.history_mut().save(record)?)
                    }
                    None => None,
                };

                Ok((from, build_view(tx, &order, record.as_ref())?))
            });

        match result {
            Ok((from, view)) => {
                tracing::info!(
                    order_id = %order_id,
                    lab_id = %lab_id,
                    from = %from,
                    to = %view.status,
                    "subcontract status changed"
                );
                Ok(view)
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %order_id,
                    lab_id = %lab_id,
                    attempted = %attempted,
                    error = %err,
                    "subcontract operation rejected"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    use protelab_core::{DentistId, Money};
    use protelab_labs::{ExecutionPolicy, ServiceOffering};
    use protelab_orders::{NewOrder, OrderStatus};

    use crate::clock::FixedTimeSource;
    use crate::lifecycle::OrderLifecycleService;
    use crate::seed::seed_demo;
    use crate::store::InMemoryStore;

    const CARLOS: LabId = LabId::new(1);
    const ANA: LabId = LabId::new(2);
    const IMPLANTES: LabId = LabId::new(3);
    const CERAMICA: LabId = LabId::new(4);

    struct Fixture {
        store: Arc<InMemoryStore>,
        orders: OrderLifecycleService<Arc<InMemoryStore>, FixedTimeSource>,
        subcontracts: SubcontractingService<Arc<InMemoryStore>, FixedTimeSource>,
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        seed_demo(&store).unwrap();
        store
            .transaction(|tx| -> ServiceResult<()> {
                let mut lab = Lab::new(CERAMICA, "Lab Cerâmica", "ceramica@lab.com");
                lab.registration = "PRT999".to_string();
                tx.labs_mut().insert_lab(lab)?;
                tx.offerings_mut().upsert_offering(ServiceOffering::new(
                    CERAMICA,
                    ServiceType::Zirconia,
                    ExecutionPolicy::Subcontracted,
                ))?;
                Ok(())
            })
            .unwrap();

        let clock = FixedTimeSource(test_time());
        Fixture {
            orders: OrderLifecycleService::with_clock(store.clone(), clock),
            subcontracts: SubcontractingService::with_clock(store.clone(), clock),
            store,
        }
    }

    impl Fixture {
        /// Zirconia order of Carlos Lab, approved, charged 1000.00.
        fn approved_order(&self) -> OrderId {
            let view = self
                .orders
                .create_order(NewOrder {
                    dentist_id: DentistId::new(1),
                    lab_id: CARLOS,
                    service_type: ServiceType::Zirconia,
                    charged_amount: Some(Money::new(Decimal::new(100000, 2)).unwrap()),
                    expected_delivery: None,
                    details: None,
                })
                .unwrap();
            self.orders.approve(view.id).unwrap();
            view.id
        }

        fn request(&self, order_id: OrderId, target: LabId, pct: i64) -> ServiceResult<SubcontractView> {
            self.subcontracts.request_subcontract(
                order_id,
                CARLOS,
                SubcontractRequest {
                    percentage: Some(Decimal::from(pct)),
                    kind: SubcontractType::Capacity,
                    reason: Some("over capacity".to_string()),
                    ..SubcontractRequest::to(target)
                },
            )
        }
    }

    fn expect_conflict<T: core::fmt::Debug>(result: ServiceResult<T>) {
        match result {
            Err(ServiceError::Conflict { .. }) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    fn expect_forbidden<T: core::fmt::Debug>(result: ServiceResult<T>) {
        match result {
            Err(ServiceError::Forbidden(_)) => {}
            other => panic!("Expected Forbidden, got {other:?}"),
        }
    }

    fn expect_invalid<T: core::fmt::Debug>(result: ServiceResult<T>, needle: &str) {
        match result {
            Err(ServiceError::InvalidArgument(msg)) if msg.contains(needle) => {}
            other => panic!("Expected InvalidArgument containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn request_computes_share_and_records_history() {
        let fx = fixture();
        let id = fx.approved_order();

        let view = fx.request(id, IMPLANTES, 40).unwrap();
        assert_eq!(view.status, SubcontractStatus::Requested);
        assert_eq!(view.subcontracted_amount.unwrap().amount(), Decimal::new(40000, 2));
        assert_eq!(view.requesting_lab.id, CARLOS);
        assert_eq!(view.subcontracted_lab.as_ref().unwrap().id, IMPLANTES);
        assert_eq!(view.kind, SubcontractType::Capacity);
        assert_eq!(view.service_description.as_deref(), Some("zirconia"));
        assert!(view.history_id.is_some());
        assert_eq!(view.order_status, OrderStatus::Approved);
    }

    #[test]
    fn only_primary_lab_may_request() {
        let fx = fixture();
        let id = fx.approved_order();
        expect_forbidden(fx.subcontracts.request_subcontract(
            id,
            IMPLANTES,
            SubcontractRequest::to(CERAMICA),
        ));
    }

    #[test]
    fn target_must_be_another_willing_lab() {
        let fx = fixture();
        let id = fx.approved_order();

        expect_invalid(fx.request(id, CARLOS, 40), "self");
        assert!(matches!(
            fx.request(id, LabId::new(77), 40),
            Err(ServiceError::NotFound(_))
        ));
        // Ana lists zirconia but does not take subcontracts at all.
        expect_invalid(fx.request(id, ANA, 40), "does not");
        // Below Lab Implantes' 40% minimum.
        expect_invalid(fx.request(id, IMPLANTES, 35), "only accepts");
        expect_invalid(fx.request(id, IMPLANTES, 0), "percentage");
        expect_invalid(fx.request(id, IMPLANTES, 101), "percentage");

        let view = fx.orders.get(id).unwrap();
        assert_eq!(view.subcontract_status, SubcontractStatus::NotSubcontracted);
        assert_eq!(view.version, 1);
    }

    #[test]
    fn target_must_offer_the_service() {
        let fx = fixture();
        let view = fx
            .orders
            .create_order(NewOrder {
                dentist_id: DentistId::new(2),
                lab_id: CARLOS,
                service_type: ServiceType::Orthodontics,
                charged_amount: None,
                expected_delivery: None,
                details: None,
            })
            .unwrap();
        fx.orders.approve(view.id).unwrap();
        assert!(matches!(
            fx.request(view.id, IMPLANTES, 50),
            Err(ServiceError::NotFound(_))
        ));
    }

    fn add_willing_lab(fx: &Fixture, id: LabId, offering: ServiceOffering) {
        fx.store
            .transaction(|tx| -> ServiceResult<()> {
                let mut lab = Lab::new(id, format!("Lab {}", id.value()), "extra@lab.com");
                lab.registration = format!("PRT{}", id.value());
                tx.labs_mut().insert_lab(lab)?;
                tx.offerings_mut().upsert_offering(offering)?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn target_offering_must_take_subcontracted_work() {
        let fx = fixture();
        let id = fx.approved_order();

        let own_only = LabId::new(5);
        add_willing_lab(
            &fx,
            own_only,
            ServiceOffering::new(own_only, ServiceType::Zirconia, ExecutionPolicy::Own),
        );
        let inactive = LabId::new(6);
        add_willing_lab(
            &fx,
            inactive,
            ServiceOffering {
                active: false,
                ..ServiceOffering::new(
                    inactive,
                    ServiceType::Zirconia,
                    ExecutionPolicy::OwnOrSubcontracted,
                )
            },
        );

        expect_invalid(fx.request(id, own_only, 40), "does not take subcontracted");
        expect_invalid(fx.request(id, inactive, 40), "does not take subcontracted");

        let view = fx.orders.get(id).unwrap();
        assert_eq!(view.subcontract_status, SubcontractStatus::NotSubcontracted);
        assert_eq!(view.version, 1);
    }

    #[test]
    fn oversized_share_is_rejected_and_store_stays_usable() {
        let fx = fixture();
        let view = fx
            .orders
            .create_order(NewOrder {
                dentist_id: DentistId::new(1),
                lab_id: CARLOS,
                service_type: ServiceType::Zirconia,
                charged_amount: Some(Money::new(Decimal::MAX).unwrap()),
                expected_delivery: None,
                details: None,
            })
            .unwrap();
        fx.orders.approve(view.id).unwrap();

        expect_invalid(fx.request(view.id, IMPLANTES, 40), "out of range");

        let after = fx.orders.get(view.id).unwrap();
        assert_eq!(after.subcontract_status, SubcontractStatus::NotSubcontracted);
        assert_eq!(after.version, 1);
        // A later request on a normal order still goes through.
        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();
    }

    #[test]
    fn order_must_be_approved_or_in_production() {
        let fx = fixture();
        let view = fx
            .orders
            .create_order(NewOrder {
                dentist_id: DentistId::new(1),
                lab_id: CARLOS,
                service_type: ServiceType::Zirconia,
                charged_amount: None,
                expected_delivery: None,
                details: None,
            })
            .unwrap();
        expect_conflict(fx.request(view.id, IMPLANTES, 40));
    }

    #[test]
    fn duplicate_request_conflicts() {
        let fx = fixture();
        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();
        match fx.request(id, IMPLANTES, 50) {
            Err(ServiceError::Conflict { message, .. }) => assert!(message.contains("duplicate")),
            other => panic!("Expected duplicate Conflict, got {other:?}"),
        }
        // A different lab is refused too: one open subcontract per order.
        expect_conflict(fx.request(id, CERAMICA, 40));
    }

    #[test]
    fn refuse_then_request_elsewhere() {
        let fx = fixture();
        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();

        expect_forbidden(fx.subcontracts.refuse(id, CERAMICA, Some("busy")));
        let refused = fx
            .subcontracts
            .refuse(id, IMPLANTES, Some("no capacity"))
            .unwrap();
        assert_eq!(refused.status, SubcontractStatus::Refused);
        assert_eq!(refused.subcontracted_lab.as_ref().unwrap().id, IMPLANTES);
        assert_eq!(
            refused.reason.as_deref(),
            Some("over capacity | Refused: no capacity")
        );
        assert_eq!(refused.notes.as_deref(), Some("over capacity | Refused: no capacity"));

        let order = fx.orders.get(id).unwrap();
        assert_eq!(order.subcontracted_lab_id, None);
        assert_eq!(order.status, OrderStatus::Approved);

        // The refusing lab cannot change its mind.
        expect_conflict(fx.subcontracts.accept(id, IMPLANTES));

        let again = fx.request(id, CERAMICA, 30).unwrap();
        assert_eq!(again.status, SubcontractStatus::Requested);
        assert_eq!(again.subcontracted_lab.unwrap().id, CERAMICA);
        assert_eq!(again.subcontracted_amount.unwrap().amount(), Decimal::new(30000, 2));
    }

    #[test]
    fn full_protocol_and_double_accept() {
        let fx = fixture();
        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();

        expect_forbidden(fx.subcontracts.accept(id, CARLOS));
        fx.subcontracts.accept(id, IMPLANTES).unwrap();
        expect_conflict(fx.subcontracts.accept(id, IMPLANTES));

        expect_conflict(fx.subcontracts.complete(id, IMPLANTES));
        fx.subcontracts.start(id, IMPLANTES).unwrap();
        let done = fx.subcontracts.complete(id, IMPLANTES).unwrap();

        assert_eq!(done.status, SubcontractStatus::Completed);
        assert_eq!(done.completed_at, Some(test_time()));
        assert_eq!(done.responded_at, Some(test_time()));

        let history = fx
            .store
            .read(|tx| tx.history().find_latest_by_order_id(id))
            .unwrap()
            .unwrap();
        assert_eq!(history.status, SubcontractStatus::Completed);
        assert_eq!(history.accepted_at, Some(test_time()));
        assert_eq!(history.completed_at, Some(test_time()));

        // Completed subcontracts free the order for finalization.
        fx.orders.start_production(id).unwrap();
        fx.orders.finalize(id).unwrap();
    }

    #[test]
    fn either_side_may_cancel_with_attributed_note() {
        let fx = fixture();

        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();
        expect_forbidden(fx.subcontracts.cancel(id, CERAMICA, None));
        let view = fx
            .subcontracts
            .cancel(id, CARLOS, Some("handled in-house"))
            .unwrap();
        assert_eq!(view.status, SubcontractStatus::Cancelled);
        assert!(view
            .notes
            .unwrap()
            .ends_with("Cancelled by requester: handled in-house"));
        expect_conflict(fx.subcontracts.cancel(id, CARLOS, None));

        let id = fx.approved_order();
        fx.request(id, IMPLANTES, 40).unwrap();
        fx.subcontracts.accept(id, IMPLANTES).unwrap();
        let view = fx.subcontracts.cancel(id, IMPLANTES, Some("  ")).unwrap();
        assert!(view.reason.unwrap().ends_with("Cancelled by executor"));
        assert_eq!(fx.orders.get(id).unwrap().subcontracted_lab_id, None);
    }

    #[test]
    fn never_subcontracted_order_has_no_view() {
        let fx = fixture();
        let id = fx.approved_order();
        expect_conflict(fx.subcontracts.find_by_order(id));
        expect_conflict(fx.subcontracts.accept(id, IMPLANTES));
        assert!(matches!(
            fx.subcontracts.find_by_order(OrderId::new(404)),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn eligible_labs_exclude_unwilling_and_requester() {
        let fx = fixture();

        let zirconia: Vec<LabId> = fx
            .subcontracts
            .list_eligible_labs(ServiceType::Zirconia, Some(CARLOS))
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(zirconia, vec![IMPLANTES, CERAMICA]);

        let crown = fx
            .subcontracts
            .list_eligible_labs(ServiceType::Crown, None)
            .unwrap();
        assert_eq!(crown.len(), 1);
        assert_eq!(crown[0].id, CARLOS);

        assert!(fx
            .subcontracts
            .list_eligible_labs(ServiceType::Resin, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn preferred_subcontractor_falls_back_to_first_eligible() {
        let fx = fixture();

        // Carlos Lab names Lab Implantes for zirconia work.
        let preferred = fx
            .subcontracts
            .suggest_preferred_subcontractor(CARLOS, ServiceType::Zirconia)
            .unwrap()
            .unwrap();
        assert_eq!(preferred.id, IMPLANTES);

        // A preferred lab that stops taking the work is skipped.
        fx.store
            .transaction(|tx| {
                tx.offerings_mut().upsert_offering(ServiceOffering::new(
                    IMPLANTES,
                    ServiceType::Crown,
                    ExecutionPolicy::Own,
                ))
            })
            .unwrap();
        let mut crown = ServiceOffering::new(CARLOS, ServiceType::Crown, ExecutionPolicy::Own);
        crown.preferred_subcontractor = Some(IMPLANTES);
        fx.store
            .transaction(|tx| tx.offerings_mut().upsert_offering(crown))
            .unwrap();
        assert!(fx
            .subcontracts
            .suggest_preferred_subcontractor(CARLOS, ServiceType::Crown)
            .unwrap()
            .is_none());

        // No preference configured: first eligible lab other than the asker.
        let fallback = fx
            .subcontracts
            .suggest_preferred_subcontractor(IMPLANTES, ServiceType::Zirconia)
            .unwrap()
            .unwrap();
        assert_eq!(fallback.id, CARLOS);

        assert!(fx
            .subcontracts
            .suggest_preferred_subcontractor(CARLOS, ServiceType::Orthodontics)
            .unwrap()
            .is_none());
    }

    #[test]
    fn labs_see_subcontracts_on_both_sides() {
        let fx = fixture();
        let first = fx.approved_order();
        let second = fx.approved_order();
        fx.approved_order();
        fx.request(first, IMPLANTES, 40).unwrap();
        fx.request(second, CERAMICA, 20).unwrap();

        let carlos: Vec<OrderId> = fx
            .subcontracts
            .list_for_lab(CARLOS)
            .unwrap()
            .into_iter()
            .map(|v| v.order_id)
            .collect();
        assert_eq!(carlos, vec![first, second]);

        let implantes = fx.subcontracts.list_for_lab(IMPLANTES).unwrap();
        assert_eq!(implantes.len(), 1);
        assert_eq!(implantes[0].order_id, first);

        assert!(fx.subcontracts.list_for_lab(ANA).unwrap().is_empty());
        assert!(matches!(
            fx.subcontracts.list_for_lab(LabId::new(77)),
            Err(ServiceError::NotFound(_))
        ));
    }
}
