// tests/capture_tests.rs
mod common;

use chrono::Utc;
use common::*;
use orderflow::store::{CaptureTransition, PaymentRecord};
use orderflow::{
  CaptureRequest, LineItem, Order, OrderError, OrderEvent, OrderStatus, OrderStore, PaymentMethod, PaymentStatus,
  PaypalPaymentRequest,
};
use rust_decimal_macros::dec;
use serial_test::serial;
use uuid::Uuid;

async fn paypal_order(shop: &TestShop, product_id: Uuid, quantity: i64) -> (Order, String) {
  let created = shop
    .service
    .create_order(order_request(
      Uuid::new_v4(),
      vec![LineItem::new(product_id, quantity, dec!(250000))],
      "paypal",
    ))
    .await
    .unwrap();
  let payment = shop
    .service
    .create_paypal_payment(PaypalPaymentRequest {
      order_id: Some(created.order.id),
      ..Default::default()
    })
    .await
    .unwrap();
  (created.order, payment.payment_id)
}

// An order written before reservation markers existed: its stock was never taken.
async fn unreserved_order(shop: &TestShop, method: PaymentMethod, product_id: Uuid, quantity: i64) -> Order {
  let now = Utc::now();
  let order = Order {
    id: Uuid::new_v4(),
    user_id: Uuid::new_v4(),
    line_items: vec![LineItem::new(product_id, quantity, dec!(50000))],
    address_id: Uuid::new_v4(),
    payment_method: method,
    payment_status: PaymentStatus::Pending,
    order_status: OrderStatus::Pending,
    raw_total: dec!(50000) * rust_decimal::Decimal::from(quantity),
    total_amount: dec!(50000) * rust_decimal::Decimal::from(quantity),
    voucher_code: None,
    discount: dec!(0),
    order_date: now,
    payment_id: None,
    payer_id: None,
    stock_reserved: false,
    updated_at: now,
  };
  shop.store.insert_order(&order).await.unwrap();
  order
}

#[tokio::test]
#[serial]
async fn test_paypal_capture_marks_paid_and_confirms() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, payment_id) = paypal_order(&shop, beans, 2).await;

  let captured = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id.clone(), "PAYER-1"))
    .await
    .unwrap();

  assert_eq!(captured.payment_status, PaymentStatus::Paid);
  assert_eq!(captured.order_status, OrderStatus::Confirmed);
  assert_eq!(captured.payment_id.as_deref(), Some(payment_id.as_str()));
  assert_eq!(captured.payer_id.as_deref(), Some("PAYER-1"));
  assert_eq!(shop.stock(beans).await, 3);
}

#[tokio::test]
#[serial]
async fn test_capture_twice_decrements_stock_once() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, payment_id) = paypal_order(&shop, beans, 2).await;

  let first = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id.clone(), "PAYER-1"))
    .await
    .unwrap();
  let second = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id, "PAYER-1"))
    .await
    .unwrap();

  assert_eq!(first, second);
  assert_eq!(shop.stock(beans).await, 3);
}

#[tokio::test]
#[serial]
async fn test_payment_for_another_order_is_not_approved() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (cheap, cheap_payment) = paypal_order(&shop, beans, 1).await;
  let (pricey, _) = paypal_order(&shop, beans, 2).await;

  let err = shop
    .service
    .capture(CaptureRequest::new(pricey.id, cheap_payment.clone(), "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::PaymentNotApproved { ref state } if state == "order_mismatch"));
  let stored = shop.service.get_order(pricey.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
  assert_eq!(stored.order_status, OrderStatus::Pending);

  // The refused attempt did not spend the payment.
  let captured = shop
    .service
    .capture(CaptureRequest::new(cheap.id, cheap_payment, "PAYER-1"))
    .await
    .unwrap();
  assert_eq!(captured.payment_status, PaymentStatus::Paid);
  assert_eq!(shop.stock(beans).await, 2);
}

#[tokio::test]
#[serial]
async fn test_bare_amount_payment_cannot_capture_an_order() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, _) = paypal_order(&shop, beans, 1).await;
  let bare = shop
    .service
    .create_paypal_payment(PaypalPaymentRequest {
      amount: Some(dec!(10.00)),
      ..Default::default()
    })
    .await
    .unwrap();

  let err = shop
    .service
    .capture(CaptureRequest::new(order.id, bare.payment_id, "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::PaymentNotApproved { .. }));
  let stored = shop.service.get_order(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_rejected_order_is_never_marked_paid() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, payment_id) = paypal_order(&shop, beans, 1).await;
  shop.service.update_order_status(order.id, "rejected").await.unwrap();

  // A capture that loaded the order before the rejection still reaches the write.
  let record = PaymentRecord {
    payment_id: payment_id.clone(),
    payer_id: "PAYER-1".to_string(),
    advance_to: Some(OrderStatus::Confirmed),
  };
  let transition = shop.store.mark_paid(order.id, &record).await.unwrap().unwrap();
  assert!(matches!(transition, CaptureTransition::Rejected(ref current) if current.payment_status == PaymentStatus::Pending));

  let err = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id, "PAYER-1"))
    .await
    .unwrap_err();
  assert!(matches!(err, OrderError::InvalidRequest(_)));
  let stored = shop.service.get_order(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
  assert_eq!(stored.order_status, OrderStatus::Rejected);
}

#[tokio::test]
#[serial]
async fn test_capture_reserves_unreserved_order_exactly_once() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let order = unreserved_order(&shop, PaymentMethod::Momo, beans, 2).await;
  let payment_id = momo_payment_id(&shop.service.retry_payment(order.id).await.unwrap().outcome);

  let first = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id.clone(), "PAYER-1"))
    .await
    .unwrap();
  shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id, "PAYER-1"))
    .await
    .unwrap();

  assert!(first.stock_reserved);
  assert_eq!(first.order_status, OrderStatus::Pending);
  assert_eq!(first.payment_status, PaymentStatus::Paid);
  assert_eq!(shop.stock(beans).await, 3);
}

#[tokio::test]
#[serial]
async fn test_capture_notifies_owner_once() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, payment_id) = paypal_order(&shop, beans, 1).await;

  for _ in 0..2 {
    shop
      .service
      .capture(CaptureRequest::new(order.id, payment_id.clone(), "PAYER-1"))
      .await
      .unwrap();
  }
  tokio::time::sleep(std::time::Duration::from_millis(20)).await;

  let events = shop.notifier.events();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0], (order.user_id, OrderEvent::PaymentCaptured { order_id: order.id }));
}

#[tokio::test]
#[serial]
async fn test_declined_payment_is_not_approved() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, payment_id) = paypal_order(&shop, beans, 1).await;

  let err = shop
    .service
    .capture(CaptureRequest::new(order.id, payment_id, "DECLINE-42"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::PaymentNotApproved { ref state } if state == "failed"));
  let stored = shop.service.get_order(order.id).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_capture_of_unknown_order_is_not_found() {
  setup_tracing();
  let shop = TestShop::new();

  let err = shop
    .service
    .capture(CaptureRequest::new(Uuid::new_v4(), "PAYID-X", "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn test_unknown_gateway_payment_is_gateway_error() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let (order, _) = paypal_order(&shop, beans, 1).await;

  let err = shop
    .service
    .capture(CaptureRequest::new(order.id, "PAYID-FORGED", "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::GatewayError(_)));
}

#[tokio::test]
#[serial]
async fn test_cash_orders_cannot_be_captured() {
  setup_tracing();
  let shop = TestShop::new();
  let beans = shop.product(5);
  let created = shop
    .service
    .create_order(order_request(Uuid::new_v4(), vec![LineItem::new(beans, 1, dec!(1000))], "cash"))
    .await
    .unwrap();

  let err = shop
    .service
    .capture(CaptureRequest::new(created.order.id, "PAYID-X", "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::InvalidRequest(_)));
}

#[tokio::test]
#[serial]
async fn test_capture_requires_payment_and_payer_ids() {
  setup_tracing();
  let shop = TestShop::new();

  let err = shop
    .service
    .capture(CaptureRequest::new(Uuid::new_v4(), "", "PAYER-1"))
    .await
    .unwrap_err();

  assert!(matches!(err, OrderError::InvalidRequest(_)));
}
