//! Integration tests for order placement.
//!
//! These tests drive `OrderService` end to end against the in-memory
//! store, covering the happy path, every rejection, stock-contention
//! retries, and concurrent placement of the same product.

use common::{CustomerId, Money, ProductId};
use domain::{CreateOrderRequest, ItemRequest, OrderError, OrderService};
use store::{Customer, InMemoryStore, Product};

/// Builds a service over a store seeded with one customer and two products.
async fn seeded_service() -> OrderService<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .insert_customer(Customer::new("c-001", "Ada Lovelace", "ada@example.com"))
        .await;
    store
        .insert_product(Product::new("P1", "Widget", Money::from_cents(500), 10))
        .await;
    store
        .insert_product(Product::new("P2", "Gadget", Money::from_cents(1250), 4))
        .await;
    OrderService::new(store)
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn order_is_persisted_with_snapshotted_prices() {
        let service = seeded_service().await;

        let order = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 3), ItemRequest::new("P2", 1)],
            ))
            .await
            .unwrap();

        assert_eq!(order.customer_id, CustomerId::new("c-001"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_amount().cents(), 3 * 500 + 1250);

        // The persisted copy matches the returned one.
        let stored = service.store().get_order(&order.id).await.unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.total_amount(), order.total_amount());

        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(7)
        );
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P2")).await,
            Some(3)
        );
    }

    #[tokio::test]
    async fn sequential_orders_draw_down_the_same_stock() {
        let service = seeded_service().await;

        service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 3)],
            ))
            .await
            .unwrap();

        // 7 remain; 8 must bounce with the current availability.
        let err = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 8)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 7,
                requested: 8,
                ..
            }
        ));
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(7)
        );
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn identical_requests_create_distinct_orders() {
        let service = seeded_service().await;
        let request = CreateOrderRequest::new("c-001", vec![ItemRequest::new("P1", 2)]);

        let first = service.create_order(request.clone()).await.unwrap();
        let second = service.create_order(request).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(service.store().order_count().await, 2);
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(6)
        );
    }

    #[tokio::test]
    async fn repricing_a_product_leaves_placed_orders_untouched() {
        let service = seeded_service().await;

        let order = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P2", 2)],
            ))
            .await
            .unwrap();
        assert_eq!(order.items[0].price, Money::from_cents(1250));

        service
            .store()
            .insert_product(Product::new("P2", "Gadget", Money::from_cents(1999), 2))
            .await;

        let stored = service.store().get_order(&order.id).await.unwrap();
        assert_eq!(stored.items[0].price, Money::from_cents(1250));
        assert_eq!(stored.total_amount().cents(), 2500);
    }
}

mod rejection {
    use super::*;

    #[tokio::test]
    async fn unknown_customer() {
        let service = seeded_service().await;

        let err = service
            .create_order(CreateOrderRequest::new(
                "c-404",
                vec![ItemRequest::new("P1", 1)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::CustomerNotFound(id) if id.as_str() == "c-404"));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_product_among_known_ones() {
        let service = seeded_service().await;

        let err = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 1), ItemRequest::new("P9", 1)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ProductNotFound(id) if id.as_str() == "P9"));
        // The satisfiable line must not have been applied.
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(10)
        );
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn no_known_products_at_all() {
        let service = seeded_service().await;

        let err = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("X1", 1), ItemRequest::new("X2", 1)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ProductsNotFound(ids) if ids.len() == 2));
    }

    #[tokio::test]
    async fn shortage_on_one_line_rejects_the_whole_order() {
        let service = seeded_service().await;

        let err = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 2), ItemRequest::new("P2", 5)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            }
        ));
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(10)
        );
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P2")).await,
            Some(4)
        );
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_requests_never_reach_the_store() {
        let service = seeded_service().await;

        for request in [
            CreateOrderRequest::new("", vec![ItemRequest::new("P1", 1)]),
            CreateOrderRequest::new("c-001", vec![]),
            CreateOrderRequest::new("c-001", vec![ItemRequest::new("P1", 0)]),
            CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 1), ItemRequest::new("P1", 1)],
            ),
        ] {
            let err = service.create_order(request).await.unwrap_err();
            assert!(matches!(err, OrderError::InvalidArgument(_)));
        }

        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(10)
        );
    }
}

mod contention {
    use super::*;

    #[tokio::test]
    async fn transient_conflict_is_retried_to_success() {
        let service = seeded_service().await;
        service.store().fail_next_placements(2).await;

        let order = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 4)],
            ))
            .await
            .unwrap();

        assert_eq!(order.items[0].quantity, 4);
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(6)
        );
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn persistent_conflict_surfaces_after_the_last_attempt() {
        let service = seeded_service().await;
        service.store().fail_next_placements(u32::MAX).await;

        let err = service
            .create_order(CreateOrderRequest::new(
                "c-001",
                vec![ItemRequest::new("P1", 4)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Conflict { attempts: 3 }));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(
            service.store().product_quantity(&ProductId::new("P1")).await,
            Some(10)
        );
    }

    #[tokio::test]
    async fn concurrent_buyers_cannot_oversell_a_product() {
        let store = InMemoryStore::new();
        store
            .insert_customer(Customer::new("c-001", "Ada", "ada@example.com"))
            .await;
        store
            .insert_customer(Customer::new("c-002", "Grace", "grace@example.com"))
            .await;
        store
            .insert_product(Product::new("P1", "Widget", Money::from_cents(500), 10))
            .await;

        // Two buyers race for 8 of 10 units each. At most one can win;
        // the loser re-reads, sees 2 left, and is rejected for shortage.
        let a = {
            let service = OrderService::new(store.clone());
            tokio::spawn(async move {
                service
                    .create_order(CreateOrderRequest::new(
                        "c-001",
                        vec![ItemRequest::new("P1", 8)],
                    ))
                    .await
            })
        };
        let b = {
            let service = OrderService::new(store.clone());
            tokio::spawn(async move {
                service
                    .create_order(CreateOrderRequest::new(
                        "c-002",
                        vec![ItemRequest::new("P1", 8)],
                    ))
                    .await
            })
        };

        let (a, b) = tokio::join!(a, b);
        let results = [a.unwrap(), b.unwrap()];

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let loss = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loss,
            Err(OrderError::InsufficientStock {
                available: 2,
                requested: 8,
                ..
            })
        ));

        assert_eq!(store.product_quantity(&ProductId::new("P1")).await, Some(2));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_buyers_both_succeed_when_stock_allows() {
        let store = InMemoryStore::new();
        store
            .insert_customer(Customer::new("c-001", "Ada", "ada@example.com"))
            .await;
        store
            .insert_product(Product::new("P1", "Widget", Money::from_cents(500), 10))
            .await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let service = OrderService::new(store.clone());
            handles.push(tokio::spawn(async move {
                service
                    .create_order(CreateOrderRequest::new(
                        "c-001",
                        vec![ItemRequest::new("P1", 3)],
                    ))
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }

        // All three fit into the initial 10 units; the conflict losers
        // retry against the fresh snapshot and succeed.
        assert_eq!(wins, 3);
        assert_eq!(store.product_quantity(&ProductId::new("P1")).await, Some(1));
        assert_eq!(store.order_count().await, 3);
    }
}
