//! Concurrent reservation races over the real in-memory lock manager.
//!
//! Many tasks race to reserve the same unit; the per-unit lock must
//! serialize them so that exactly one wins and every loser observes a
//! definite outcome (`AlreadyReserved`), never a double reservation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ordercore::errors::ReservationError;
use ordercore::{
    Actor, ActorId, ActorRole, Channel, InventoryReservationManager, LockKey, LockManager, OrderId,
    ReservationConfig, ReservationTarget, SystemClock, Unit, UnitId, UnitStatus, UnitStore,
    VariantId,
};
use ordercore_memory::{InMemoryAuditStore, InMemoryLockManager, InMemoryUnitStore};

fn staff() -> Actor {
    Actor::human(ActorId::try_new("alice").unwrap(), ActorRole::Staff)
}

fn manager(
    store: InMemoryUnitStore,
) -> InventoryReservationManager<InMemoryUnitStore, InMemoryLockManager> {
    InventoryReservationManager::new(
        store,
        InMemoryLockManager::new(),
        Arc::new(SystemClock),
        ReservationConfig {
            lock_wait: Duration::from_secs(1),
            default_ttl: Duration::from_secs(900),
        },
    )
}

#[tokio::test]
async fn exactly_one_of_many_concurrent_reserves_wins() {
    let store = InMemoryUnitStore::new(InMemoryAuditStore::new());
    let unit_id = UnitId::try_new("SN-500").unwrap();
    store
        .insert(Unit::register_intake(
            unit_id.clone(),
            VariantId::try_new("VAR-A").unwrap(),
        ))
        .await
        .unwrap();
    let manager = manager(store.clone());

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        let unit_id = unit_id.clone();
        handles.push(tokio::spawn(async move {
            let order_id = OrderId::try_new(format!("ORD-{i}")).unwrap();
            let result = manager
                .reserve(
                    &ReservationTarget::Unit(unit_id),
                    Channel::try_new("ONLINE").unwrap(),
                    &order_id,
                    None,
                    &staff(),
                )
                .await;
            (order_id, result)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (order_id, result) = handle.await.unwrap();
        match result {
            Ok(reserved) => {
                assert_eq!(reserved, unit_id);
                winners.push(order_id);
            }
            Err(ReservationError::AlreadyReserved { .. }) => {}
            Err(other) => panic!("Expected a win or AlreadyReserved, got {other:?}"),
        }
    }
    assert_eq!(winners.len(), 1, "exactly one task must win the unit");

    let unit = store.load(&unit_id).await.unwrap();
    assert_eq!(unit.status(), UnitStatus::Reserved);
    assert_eq!(&unit.reservation().unwrap().order_id, &winners[0]);
}

#[tokio::test]
async fn losers_see_the_winning_order_as_holder() {
    let store = InMemoryUnitStore::new(InMemoryAuditStore::new());
    let unit_id = UnitId::try_new("SN-1").unwrap();
    store
        .insert(Unit::register_intake(
            unit_id.clone(),
            VariantId::try_new("VAR-A").unwrap(),
        ))
        .await
        .unwrap();
    let manager = manager(store);

    manager
        .reserve(
            &ReservationTarget::Unit(unit_id.clone()),
            Channel::try_new("POS").unwrap(),
            &OrderId::try_new("ORD-WINNER").unwrap(),
            None,
            &staff(),
        )
        .await
        .unwrap();

    let result = manager
        .reserve(
            &ReservationTarget::Unit(unit_id),
            Channel::try_new("ONLINE").unwrap(),
            &OrderId::try_new("ORD-LOSER").unwrap(),
            None,
            &staff(),
        )
        .await;
    match result {
        Err(ReservationError::AlreadyReserved { holder, .. }) => {
            assert_eq!(holder, OrderId::try_new("ORD-WINNER").unwrap());
        }
        other => panic!("Expected AlreadyReserved, got {other:?}"),
    }
}

#[tokio::test]
async fn reserve_times_out_while_the_unit_lock_is_held_elsewhere() {
    let store = InMemoryUnitStore::new(InMemoryAuditStore::new());
    let unit_id = UnitId::try_new("SN-1").unwrap();
    store
        .insert(Unit::register_intake(
            unit_id.clone(),
            VariantId::try_new("VAR-A").unwrap(),
        ))
        .await
        .unwrap();

    let locks = InMemoryLockManager::new();
    let manager = InventoryReservationManager::new(
        store.clone(),
        locks.clone(),
        Arc::new(SystemClock),
        ReservationConfig {
            lock_wait: Duration::from_millis(50),
            default_ttl: Duration::from_secs(900),
        },
    );

    // Hold the unit's lock out-of-band so the manager's bounded wait expires.
    let _guard = locks
        .acquire(&LockKey::unit(&unit_id), Duration::from_millis(50))
        .await
        .unwrap();

    let result = manager
        .reserve(
            &ReservationTarget::Unit(unit_id.clone()),
            Channel::try_new("POS").unwrap(),
            &OrderId::try_new("ORD-A").unwrap(),
            None,
            &staff(),
        )
        .await;
    assert!(matches!(result, Err(ReservationError::LockTimeout { .. })));

    // The timed-out attempt left the unit untouched.
    let unit = store.load(&unit_id).await.unwrap();
    assert_eq!(unit.status(), UnitStatus::Available);
}

#[tokio::test]
async fn mixed_unit_and_variant_reserves_yield_one_winner() {
    // One order targets the unit directly while another asks for "any
    // unit of the variant"; both paths end up contending on the same
    // unit lock, so exactly one may hold the single unit.
    let store = InMemoryUnitStore::new(InMemoryAuditStore::new());
    let unit_id = UnitId::try_new("SN-1").unwrap();
    let variant_id = VariantId::try_new("VAR-A").unwrap();
    store
        .insert(Unit::register_intake(unit_id.clone(), variant_id.clone()))
        .await
        .unwrap();
    let manager = manager(store.clone());

    let unit_task = {
        let manager = manager.clone();
        let unit_id = unit_id.clone();
        tokio::spawn(async move {
            manager
                .reserve(
                    &ReservationTarget::Unit(unit_id),
                    Channel::try_new("POS").unwrap(),
                    &OrderId::try_new("ORD-UNIT").unwrap(),
                    None,
                    &staff(),
                )
                .await
        })
    };
    let variant_task = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .reserve(
                    &ReservationTarget::Variant(variant_id),
                    Channel::try_new("ONLINE").unwrap(),
                    &OrderId::try_new("ORD-VARIANT").unwrap(),
                    None,
                    &staff(),
                )
                .await
        })
    };

    let outcomes = [
        ("ORD-UNIT", unit_task.await.unwrap()),
        ("ORD-VARIANT", variant_task.await.unwrap()),
    ];
    let mut winners = Vec::new();
    for (order, result) in outcomes {
        match result {
            Ok(reserved) => {
                assert_eq!(reserved, unit_id);
                winners.push(order);
            }
            Err(ReservationError::AlreadyReserved { .. }
            | ReservationError::VariantExhausted(_)) => {}
            Err(other) => panic!("Expected a win or a definite loss, got {other:?}"),
        }
    }
    assert_eq!(winners.len(), 1, "the single unit admits one reservation");

    let unit = store.load(&unit_id).await.unwrap();
    assert_eq!(unit.status(), UnitStatus::Reserved);
    assert_eq!(
        unit.reservation().unwrap().order_id,
        OrderId::try_new(winners[0]).unwrap()
    );
}

#[tokio::test]
async fn concurrent_variant_allocation_hands_out_distinct_units() {
    let store = InMemoryUnitStore::new(InMemoryAuditStore::new());
    let variant_id = VariantId::try_new("VAR-A").unwrap();
    for raw in ["SN-1", "SN-2", "SN-3"] {
        store
            .insert(Unit::register_intake(
                UnitId::try_new(raw).unwrap(),
                variant_id.clone(),
            ))
            .await
            .unwrap();
    }
    let manager = manager(store);

    let mut handles = Vec::new();
    for i in 0..3 {
        let manager = manager.clone();
        let variant_id = variant_id.clone();
        handles.push(tokio::spawn(async move {
            manager
                .reserve(
                    &ReservationTarget::Variant(variant_id),
                    Channel::try_new("ONLINE").unwrap(),
                    &OrderId::try_new(format!("ORD-{i}")).unwrap(),
                    None,
                    &staff(),
                )
                .await
        }));
    }

    let mut reserved = HashSet::new();
    for handle in handles {
        reserved.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(reserved.len(), 3, "each order must get its own unit");
}
