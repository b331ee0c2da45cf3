use std::collections::BTreeMap;
use std::sync::RwLock;

use protelab_core::{AggregateRoot, ExpectedVersion, HistoryId, LabId, OrderId};
use protelab_labs::{Lab, ServiceOffering, ServiceType};
use protelab_orders::{Order, SubcontractRecord};

use super::{
    LabRepository, OfferingRepository, OrderRepository, Store, StoreError, StoreResult,
    SubcontractHistoryRepository, Transaction,
};

#[derive(Debug, Clone, Default)]
struct OrderTable {
    rows: BTreeMap<OrderId, Order>,
    last_id: i64,
}

#[derive(Debug, Clone, Default)]
struct LabTable {
    rows: BTreeMap<LabId, Lab>,
}

#[derive(Debug, Clone, Default)]
struct OfferingTable {
    rows: BTreeMap<(LabId, ServiceType), ServiceOffering>,
}

#[derive(Debug, Clone, Default)]
struct HistoryTable {
    rows: BTreeMap<HistoryId, SubcontractRecord>,
    last_id: i64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: OrderTable,
    labs: LabTable,
    offerings: OfferingTable,
    history: HistoryTable,
}

/// In-memory transactional store for tests/dev.
///
/// A transaction runs against a staged copy of every table while holding the
/// write lock; the copy replaces the live tables only when the closure
/// succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    fn read<T, E>(&self, f: impl FnOnce(&dyn Transaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        f(&*tables)
    }

    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut tables = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        *tables = staged;
        Ok(out)
    }
}

impl Transaction for Tables {
    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }

    fn orders_mut(&mut self) -> &mut dyn OrderRepository {
        &mut self.orders
    }

    fn labs(&self) -> &dyn LabRepository {
        &self.labs
    }

    fn labs_mut(&mut self) -> &mut dyn LabRepository {
        &mut self.labs
    }

    fn offerings(&self) -> &dyn OfferingRepository {
        &self.offerings
    }

    fn offerings_mut(&mut self) -> &mut dyn OfferingRepository {
        &mut self.offerings
    }

    fn history(&self) -> &dyn SubcontractHistoryRepository {
        &self.history
    }

    fn history_mut(&mut self) -> &mut dyn SubcontractHistoryRepository {
        &mut self.history
    }
}

impl OrderRepository for OrderTable {
    fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn find_by_code(&self, code: &str) -> StoreResult<Option<Order>> {
        Ok(self.rows.values().find(|o| o.code() == code).cloned())
    }

    fn find_by_lab(&self, lab: LabId) -> StoreResult<Vec<Order>> {
        Ok(self
            .rows
            .values()
            .filter(|o| o.lab_id() == lab || o.subcontracted_lab() == Some(lab))
            .cloned()
            .collect())
    }

    fn next_order_id(&mut self) -> StoreResult<OrderId> {
        self.last_id += 1;
        Ok(OrderId::new(self.last_id))
    }

    fn save(&mut self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        let id = order.order_id();
        match self.rows.get(&id) {
            Some(stored) => expected
                .check(stored.version())
                .map_err(|err| StoreError::Concurrency(format!("order {id}: {err}")))?,
            None if expected != ExpectedVersion::Exact(0) => {
                return Err(StoreError::MissingRow(format!("order {id}")));
            }
            None => {}
        }

        self.last_id = self.last_id.max(id.value());
        self.rows.insert(id, order.clone());
        Ok(())
    }
}

impl LabRepository for LabTable {
    fn find_by_id(&self, id: LabId) -> StoreResult<Option<Lab>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn insert_lab(&mut self, lab: Lab) -> StoreResult<()> {
        self.rows.insert(lab.id, lab);
        Ok(())
    }
}

impl OfferingRepository for OfferingTable {
    fn find_by_lab_and_service_type(
        &self,
        lab: LabId,
        service_type: ServiceType,
    ) -> StoreResult<Option<ServiceOffering>> {
        Ok(self.rows.get(&(lab, service_type)).cloned())
    }

    fn find_active_offerings_by_service_type(
        &self,
        service_type: ServiceType,
    ) -> StoreResult<Vec<ServiceOffering>> {
        // Keys sort by lab id first.
        Ok(self
            .rows
            .values()
            .filter(|o| o.service_type == service_type && o.active)
            .cloned()
            .collect())
    }

    fn upsert_offering(&mut self, offering: ServiceOffering) -> StoreResult<()> {
        self.rows.insert(offering.key(), offering);
        Ok(())
    }
}

impl SubcontractHistoryRepository for HistoryTable {
    fn save(&mut self, mut record: SubcontractRecord) -> StoreResult<SubcontractRecord> {
        match record.id {
            Some(id) if !self.rows.contains_key(&id) => {
                return Err(StoreError::MissingRow(format!("subcontract history {id}")));
            }
            Some(_) => {}
            None => {
                self.last_id += 1;
                record.id = Some(HistoryId::new(self.last_id));
            }
        }

        let id = record.id.ok_or_else(|| StoreError::MissingRow("subcontract history id".to_string()))?;
        self.rows.insert(id, record.clone());
        Ok(record)
    }

    fn find_latest_by_order_id(&self, order_id: OrderId) -> StoreResult<Option<SubcontractRecord>> {
        Ok(self
            .rows
            .values()
            .rev()
            .find(|r| r.order_id == order_id)
            .cloned())
    }

    fn find_by_order_ids(&self, order_ids: &[OrderId]) -> StoreResult<Vec<SubcontractRecord>> {
        Ok(self
            .rows
            .values()
            .filter(|r| order_ids.contains(&r.order_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use protelab_core::{DentistId, DomainError};
    use protelab_labs::ExecutionPolicy;
    use protelab_orders::{NewOrder, SubcontractStatus};

    use crate::error::ServiceError;

    fn test_order(tx: &mut dyn Transaction) -> Order {
        let id = tx.orders_mut().next_order_id().unwrap();
        Order::create(
            id,
            NewOrder {
                dentist_id: DentistId::new(1),
                lab_id: LabId::new(1),
                service_type: ServiceType::Crown,
                charged_amount: None,
                expected_delivery: None,
                details: None,
            },
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let id = store
            .transaction(|tx| -> StoreResult<OrderId> {
                let order = test_order(tx);
                tx.orders_mut().save(&order, ExpectedVersion::Exact(0))?;
                Ok(order.order_id())
            })
            .unwrap();

        let found = store
            .read(|tx| tx.orders().find_by_id(id))
            .unwrap()
            .expect("order should be stored");
        assert_eq!(found.order_id(), id);

        let by_code = store
            .read(|tx| tx.orders().find_by_code(found.code()))
            .unwrap();
        assert_eq!(by_code.map(|o| o.order_id()), Some(id));
    }

    #[test]
    fn failed_transaction_rolls_back_every_write() {
        let store = InMemoryStore::new();
        let result: Result<(), ServiceError> = store.transaction(|tx| {
            let order = test_order(tx);
            tx.orders_mut().save(&order, ExpectedVersion::Exact(0))?;
            tx.labs_mut()
                .insert_lab(Lab::new(LabId::new(9), "Lab", "lab@lab.com"))?;
            Err(DomainError::conflict("history write failed").into())
        });
        assert!(result.is_err());

        let orders = store
            .read(|tx| tx.orders().find_by_lab(LabId::new(1)))
            .unwrap();
        assert!(orders.is_empty());
        assert!(store.read(|tx| tx.labs().find_by_id(LabId::new(9))).unwrap().is_none());

        // The reserved id was rolled back too.
        let id = store
            .transaction(|tx| tx.orders_mut().next_order_id())
            .unwrap();
        assert_eq!(id, OrderId::new(1));
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = InMemoryStore::new();
        let mut order = store
            .transaction(|tx| -> StoreResult<Order> {
                let order = test_order(tx);
                tx.orders_mut().save(&order, ExpectedVersion::Exact(0))?;
                Ok(order)
            })
            .unwrap();

        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        order.approve(at).unwrap();
        store
            .transaction(|tx| tx.orders_mut().save(&order, ExpectedVersion::Exact(0)))
            .unwrap();

        // Second writer computed from the version-0 read.
        let err = store
            .transaction(|tx| tx.orders_mut().save(&order, ExpectedVersion::Exact(0)))
            .unwrap_err();
        match err {
            StoreError::Concurrency(msg) => assert!(msg.contains("expected: Exact(0), actual: 1")),
            other => panic!("Expected Concurrency, got {other:?}"),
        }
    }

    #[test]
    fn updating_missing_order_fails() {
        let store = InMemoryStore::new();
        let err = store
            .transaction(|tx| {
                let order = test_order(tx);
                tx.orders_mut().save(&order, ExpectedVersion::Exact(3))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRow(_)));
    }

    #[test]
    fn one_offering_per_lab_and_service() {
        let store = InMemoryStore::new();
        store
            .transaction(|tx| -> StoreResult<()> {
                let offerings = tx.offerings_mut();
                offerings.upsert_offering(ServiceOffering::new(
                    LabId::new(3),
                    ServiceType::Implant,
                    ExecutionPolicy::Own,
                ))?;
                offerings.upsert_offering(ServiceOffering::new(
                    LabId::new(3),
                    ServiceType::Implant,
                    ExecutionPolicy::OwnOrSubcontracted,
                ))?;
                offerings.upsert_offering(ServiceOffering::new(
                    LabId::new(1),
                    ServiceType::Implant,
                    ExecutionPolicy::Subcontracted,
                ))?;
                let mut inactive =
                    ServiceOffering::new(LabId::new(2), ServiceType::Implant, ExecutionPolicy::Own);
                inactive.active = false;
                offerings.upsert_offering(inactive)
            })
            .unwrap();

        let active = store
            .read(|tx| tx.offerings().find_active_offerings_by_service_type(ServiceType::Implant))
            .unwrap();
        let labs: Vec<_> = active.iter().map(|o| o.lab_id).collect();
        assert_eq!(labs, vec![LabId::new(1), LabId::new(3)]);
        assert_eq!(active[1].policy, ExecutionPolicy::OwnOrSubcontracted);
    }

    #[test]
    fn history_ids_are_assigned_and_latest_wins() {
        let store = InMemoryStore::new();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let order_id = OrderId::new(5);

        let (first, second) = store
            .transaction(|tx| -> StoreResult<_> {
                let history = tx.history_mut();
                let first = history.save(SubcontractRecord::requested(
                    order_id,
                    LabId::new(1),
                    LabId::new(2),
                    "crown",
                    None,
                    None,
                    at,
                ))?;
                let mut refused = first.clone();
                refused.record_status(SubcontractStatus::Refused, at);
                history.save(refused)?;
                let second = history.save(SubcontractRecord::requested(
                    order_id,
                    LabId::new(1),
                    LabId::new(3),
                    "crown",
                    None,
                    None,
                    at,
                ))?;
                Ok((first, second))
            })
            .unwrap();

        assert_eq!(first.id, Some(HistoryId::new(1)));
        assert_eq!(second.id, Some(HistoryId::new(2)));

        let latest = store
            .read(|tx| tx.history().find_latest_by_order_id(order_id))
            .unwrap()
            .unwrap();
        assert_eq!(latest.destination_lab, LabId::new(3));

        let all = store
            .read(|tx| tx.history().find_by_order_ids(&[order_id, OrderId::new(99)]))
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, SubcontractStatus::Refused);
    }
}
