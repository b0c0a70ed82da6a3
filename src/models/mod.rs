//! Aggregates and transient values shared between the store, the services and the gateway

pub mod cart;
pub mod order_details;

pub use cart::CartLine;
pub use order_details::{OrderDetails, OrderLine};
