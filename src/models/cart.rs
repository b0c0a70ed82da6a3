use rust_decimal::Decimal;
use uuid::Uuid;

/// A priced, stock-checked request for N units of a bouquet.
///
/// Produced by the cart resolver from live catalog data and consumed immediately
/// by order creation and the payment session request. Never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub bouquet_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub quantity: i32,
    /// Stock snapshot taken when the line was priced
    pub available: i32,
    /// Catalog price at resolution time
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of all line totals
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}
