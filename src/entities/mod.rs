pub mod blocked_customer;
pub mod bouquet;
pub mod bouquet_flower_type;
pub mod bouquet_type;
pub mod flower_type;
pub mod order;
pub mod order_item;
pub mod payment;

pub use order::{DeliveryMethod, OrderStatus};
pub use payment::{PaymentMethod, PaymentStatus};
