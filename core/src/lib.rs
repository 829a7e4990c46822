// orderflow/src/lib.rs

//! Orderflow: order creation, pricing, stock reservation and payment capture
//! for a retail storefront.
//!
//! The crate provides:
//!  - A Pricing Engine folding voucher discount policies over a cart total.
//!  - An Inventory Adjuster that reserves stock all-or-nothing per order.
//!  - The order status state machine with an explicit transition table.
//!  - A Payment Dispatcher routing cash, momo and paypal orders, and an
//!    idempotent Capture Handler.
//!  - Storage, gateway and notifier traits, an in-memory store and sandbox gateways.
//!  - The small step engine (`flow`) the workflows are written in.

pub mod error;
pub mod flow;
pub mod inventory;
pub mod model;
pub mod notify;
pub mod payment;
pub mod pricing;
pub mod store;
pub mod workflow;

// --- Re-exports for the Public API ---

pub use crate::error::{FlowError, FlowResult, OrderError, OrderResult};
pub use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult, Unmatched};

pub use crate::inventory::InventoryAdjuster;
pub use crate::model::{LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, ProductStock, Voucher, VoucherKind};
pub use crate::notify::{LogNotifier, NotificationDispatch, Notifier, OrderEvent};
pub use crate::payment::{CaptureRequest, PaymentDispatcher, PaymentOutcome};
pub use crate::pricing::{DiscountPolicy, Money, PriceBreakdown, PricingEngine};
pub use crate::store::{CartStore, MemoryStore, OrderStore, StockStore, VoucherStore};

// The order operations callers invoke
pub use crate::workflow::{
  CreateOrderRequest, CreatedOrder, Gateways, OrderService, PaypalPaymentCreated, PaypalPaymentRequest, StatusUpdate,
  Stores,
};
