//! Order lifecycle service.
//!
//! Each mutating operation runs as one store transaction:
//!
//! ```text
//! load order (NotFound) -> aggregate operation -> save (ExpectedVersion::Exact) -> OrderView
//! ```
//!
//! Rejections are logged at `warn`, successful status changes at `info`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use protelab_core::{AggregateRoot, ExpectedVersion, Money, OrderId};
use protelab_orders::{NewOrder, Order, OrderCancellation, OrderStatus, SubcontractStatus, is_active};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::error::{ServiceError, ServiceResult};
use crate::projections::OrderView;
use crate::store::{Store, Transaction};

pub(crate) const CANCELLED_WITH_ORDER: &str = "Cancelled with order";

pub(crate) fn load_order(tx: &dyn Transaction, order_id: OrderId) -> ServiceResult<Order> {
    tx.orders()
        .find_by_id(order_id)?
        .ok_or_else(|| ServiceError::not_found(format!("order {order_id} not found")))
}

/// Mirror an automatic subcontract cancellation into the history.
fn record_auto_cancel(
    tx: &mut dyn Transaction,
    order: &mut Order,
    outcome: OrderCancellation,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    if !outcome.cancelled_subcontract {
        return Ok(());
    }

    order.append_subcontract_note(CANCELLED_WITH_ORDER)?;
    if let Some(mut record) = tx.history().find_latest_by_order_id(order.order_id())? {
        if is_active(record.status) {
            record.record_status(SubcontractStatus::Cancelled, at);
            record.append_note(CANCELLED_WITH_ORDER);
            tx.history_mut().save(record)?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct OrderLifecycleService<S, C = SystemTimeSource> {
    store: S,
    clock: C,
}

impl<S> OrderLifecycleService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemTimeSource,
        }
    }
}

impl<S, C> OrderLifecycleService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }
}

impl<S, C> OrderLifecycleService<S, C>
where
    S: Store,
    C: TimeSource,
{
    /// Open a new order for an existing lab, awaiting approval.
    pub fn create_order(&self, new: NewOrder) -> ServiceResult<OrderView> {
        let at = self.clock.now();
        let lab_id = new.lab_id;

        let result: ServiceResult<Order> = self.store.transaction(|tx| {
            if tx.labs().find_by_id(lab_id)?.is_none() {
                return Err(ServiceError::not_found(format!("lab {lab_id} not found")));
            }
            if let Some(date) = new.expected_delivery {
                if date < at.date_naive() {
                    return Err(ServiceError::invalid_argument(format!(
                        "expected delivery {date} is in the past"
                    )));
                }
            }

            let id = tx.orders_mut().next_order_id()?;
            let order = Order::create(id, new, at);
            tx.orders_mut().save(&order, ExpectedVersion::Exact(0))?;
            Ok(order)
        });

        match result {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.order_id(),
                    code = order.code(),
                    lab_id = %lab_id,
                    service_type = %order.service_type(),
                    "order created"
                );
                Ok(OrderView::from(&order))
            }
            Err(err) => {
                tracing::warn!(lab_id = %lab_id, error = %err, "order creation rejected");
                Err(err)
            }
        }
    }

    pub fn get(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        tracing::debug!(order_id = %order_id, "loading order");
        self.store
            .read(|tx| load_order(tx, order_id))
            .map(|order| OrderView::from(&order))
    }

    pub fn find_by_code(&self, code: &str) -> ServiceResult<OrderView> {
        tracing::debug!(code, "loading order by code");
        let order = self.store.read(|tx| -> ServiceResult<Order> {
            tx.orders()
                .find_by_code(code.trim())?
                .ok_or_else(|| ServiceError::not_found(format!("order {code:?} not found")))
        })?;
        Ok(OrderView::from(&order))
    }

    pub fn approve(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        self.apply(order_id, OrderStatus::Approved.as_str(), |_, order, at| {
            Ok(order.approve(at)?)
        })
    }

    pub fn start_production(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        self.apply(order_id, OrderStatus::InProduction.as_str(), |_, order, at| {
            Ok(order.start_production(at)?)
        })
    }

    pub fn finalize(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        self.apply(order_id, OrderStatus::Finalized.as_str(), |_, order, at| {
            Ok(order.finalize(at)?)
        })
    }

    /// Cancel the order; an open subcontract is cancelled with it and its
    /// history record marked accordingly.
    pub fn cancel(&self, order_id: OrderId) -> ServiceResult<OrderView> {
        self.apply(order_id, OrderStatus::Cancelled.as_str(), |tx, order, at| {
            let outcome = order.cancel(at)?;
            record_auto_cancel(tx, order, outcome, at)
        })
    }

    /// Move the order to the status named by `target`.
    ///
    /// `target` is parsed before the order is loaded: an unknown status is an
    /// `InvalidArgument`, an unreachable one a `Conflict`.
    pub fn transition_to(&self, order_id: OrderId, target: &str) -> ServiceResult<OrderView> {
        let target: OrderStatus = target.parse()?;
        self.apply(order_id, target.as_str(), |tx, order, at| {
            let outcome = order.transition_to(target, at)?;
            record_auto_cancel(tx, order, outcome, at)
        })
    }

    pub fn possible_next_statuses(&self, order_id: OrderId) -> ServiceResult<Vec<OrderStatus>> {
        tracing::debug!(order_id = %order_id, "listing next statuses");
        self.store
            .read(|tx| load_order(tx, order_id))
            .map(|order| order.next_statuses())
    }

    pub fn update_charged_amount(
        &self,
        order_id: OrderId,
        amount: Decimal,
    ) -> ServiceResult<OrderView> {
        let amount = Money::new(amount)?;
        self.apply(order_id, "update_charged_amount", |_, order, at| {
            Ok(order.update_charged_amount(amount, at)?)
        })
    }

    pub fn reschedule_delivery(
        &self,
        order_id: OrderId,
        date: NaiveDate,
    ) -> ServiceResult<OrderView> {
        self.apply(order_id, "reschedule_delivery", |_, order, at| {
            Ok(order.reschedule_delivery(date, at)?)
        })
    }

    fn apply<F>(&self, order_id: OrderId, attempted: &str, op: F) -> ServiceResult<OrderView>
    where
        F: FnOnce(&mut dyn Transaction, &mut Order, DateTime<Utc>) -> ServiceResult<()>,
    {
        let at = self.clock.now();
        let result: ServiceResult<(OrderStatus, Order)> = self.store.transaction(|tx| {
            let mut order = load_order(tx, order_id)?;
            let from = order.status();
            let loaded = order.version();

            op(tx, &mut order, at)?;
            tx.orders_mut().save(&order, ExpectedVersion::Exact(loaded))?;
            Ok((from, order))
        });

        match result {
            Ok((from, order)) => {
                if from != order.status() {
                    tracing::info!(
                        order_id = %order_id,
                        from = %from,
                        to = %order.status(),
                        subcontract = %order.subcontract_status(),
                        "order status changed"
                    );
                } else {
                    tracing::info!(order_id = %order_id, operation = attempted, "order updated");
                }
                Ok(OrderView::from(&order))
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %order_id,
                    attempted,
                    error = %err,
                    "order operation rejected"
                );
                Err(err)
            }
        }
    }
}
