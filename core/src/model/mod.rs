// orderflow/src/model/mod.rs

//! Records the order workflows read and write.

pub mod line_item;
pub mod order;
pub mod product;
pub mod voucher;

pub use line_item::LineItem;
pub use order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
pub use product::ProductStock;
pub use voucher::{Voucher, VoucherKind};
