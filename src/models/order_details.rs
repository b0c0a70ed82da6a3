use crate::entities::{bouquet, order, order_item, payment};
use rust_decimal::Decimal;

/// An order line together with the bouquet it references
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item: order_item::Model,
    pub bouquet: Option<bouquet::Model>,
}

impl OrderLine {
    pub fn title(&self) -> &str {
        self.bouquet
            .as_ref()
            .map(|b| b.name.as_str())
            .unwrap_or("Bouquet")
    }

    pub fn line_total(&self) -> Decimal {
        self.item.line_total()
    }
}

/// Order aggregate: header, lines and payment record
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<OrderLine>,
    pub payment: Option<payment::Model>,
}
