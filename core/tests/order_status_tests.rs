// tests/order_status_tests.rs
mod common;

use common::*;
use orderflow::{LineItem, Order, OrderError, OrderEvent, OrderStatus};
use rust_decimal_macros::dec;
use serial_test::serial;
use std::time::Duration;
use uuid::Uuid;

async fn placed_order(shop: &TestShop) -> Order {
  let beans = shop.product(10);
  shop
    .service
    .create_order(order_request(Uuid::new_v4(), vec![LineItem::new(beans, 1, dec!(1000))], "cash"))
    .await
    .unwrap()
    .order
}

#[tokio::test]
#[serial]
async fn test_status_moves_forward_and_notifies_owner() {
  setup_tracing();
  let shop = TestShop::new();
  let order = placed_order(&shop).await;

  let update = shop
    .service
    .update_order_status(order.id, "inShipping")
    .await
    .unwrap();
  assert_eq!(update.modified_count, 1);
  assert_eq!(update.order.order_status, OrderStatus::InShipping);

  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(
    shop.notifier.events(),
    vec![(
      order.user_id,
      OrderEvent::StatusChanged {
        order_id: order.id,
        from: OrderStatus::Pending,
        to: OrderStatus::InShipping,
      }
    )]
  );
}

#[tokio::test]
#[serial]
async fn test_same_status_is_a_no_op() {
  setup_tracing();
  let shop = TestShop::new();
  let order = placed_order(&shop).await;

  let update = shop.service.update_order_status(order.id, "pending").await.unwrap();

  assert_eq!(update.modified_count, 0);
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert!(shop.notifier.events().is_empty());
}

#[tokio::test]
#[serial]
async fn test_terminal_statuses_never_regress() {
  setup_tracing();
  let shop = TestShop::new();

  for terminal in ["delivered", "rejected"] {
    let order = placed_order(&shop).await;
    shop.service.update_order_status(order.id, terminal).await.unwrap();

    for next in ["pending", "confirmed", "inShipping", "delivered", "rejected"] {
      if next == terminal {
        continue;
      }
      let err = shop.service.update_order_status(order.id, next).await.unwrap_err();
      assert!(matches!(err, OrderError::IllegalTransition { .. }), "{} -> {}", terminal, next);
    }
    let stored = shop.service.get_order(order.id).await.unwrap();
    assert_eq!(stored.order_status.as_str(), terminal);
  }
}

#[tokio::test]
#[serial]
async fn test_backward_transition_is_illegal() {
  setup_tracing();
  let shop = TestShop::new();
  let order = placed_order(&shop).await;
  shop.service.update_order_status(order.id, "inShipping").await.unwrap();

  let err = shop.service.update_order_status(order.id, "confirmed").await.unwrap_err();

  match err {
    OrderError::IllegalTransition { from, to } => {
      assert_eq!(from, OrderStatus::InShipping);
      assert_eq!(to, OrderStatus::Confirmed);
    }
    other => panic!("expected IllegalTransition, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_unknown_status_and_order_are_rejected() {
  setup_tracing();
  let shop = TestShop::new();
  let order = placed_order(&shop).await;

  let err = shop.service.update_order_status(order.id, "shipped").await.unwrap_err();
  assert!(matches!(err, OrderError::InvalidRequest(_)));

  let err = shop
    .service
    .update_order_status(Uuid::new_v4(), "confirmed")
    .await
    .unwrap_err();
  assert!(matches!(err, OrderError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn test_notification_failure_does_not_fail_update() {
  setup_tracing();
  let shop = TestShop::with_notifier(RecordingNotifier::failing());
  let order = placed_order(&shop).await;

  let update = shop.service.update_order_status(order.id, "confirmed").await.unwrap();
  assert_eq!(update.modified_count, 1);

  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(shop.notifier.events().len(), 1);
  let stored = shop.service.get_order(order.id).await.unwrap();
  assert_eq!(stored.order_status, OrderStatus::Confirmed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_updates_respect_the_table() {
  setup_tracing();
  let shop = std::sync::Arc::new(TestShop::new());
  let order = placed_order(&shop).await;

  let delivered = {
    let shop = shop.clone();
    tokio::spawn(async move { shop.service.update_order_status(order.id, "delivered").await })
  };
  let rejected = {
    let shop = shop.clone();
    tokio::spawn(async move { shop.service.update_order_status(order.id, "rejected").await })
  };
  let results = [delivered.await.unwrap(), rejected.await.unwrap()];

  let applied = results.iter().filter(|r| r.is_ok()).count();
  assert_eq!(applied, 1);
  assert!(results
    .iter()
    .any(|r| matches!(r, Err(OrderError::IllegalTransition { .. }))));
  assert!(shop.service.get_order(order.id).await.unwrap().order_status.is_terminal());
}
