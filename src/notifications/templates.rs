use std::fmt::Write as _;

use crate::entities::{OrderStatus, PaymentStatus};
use crate::models::OrderDetails;

use super::EmailMessage;

/// Human-readable status label
pub fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Awaiting payment",
        OrderStatus::Paid => "Paid",
        OrderStatus::Failed => "Payment failed",
        OrderStatus::Processing => "Processing",
        OrderStatus::Completed => "Completed",
        OrderStatus::Cancelled => "Cancelled",
    }
}

fn payment_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "Awaiting payment",
        PaymentStatus::Paid => "Paid",
        PaymentStatus::Failed => "Failed",
        PaymentStatus::Refunded => "Refunded",
    }
}

/// Escapes text for HTML bodies and Telegram HTML parse mode
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

struct DeliveryInfo {
    address: String,
    date: String,
    window: String,
}

fn delivery_info(details: &OrderDetails) -> Option<DeliveryInfo> {
    let order = &details.order;
    if order.is_pickup() {
        return None;
    }
    let address = order
        .delivery_address()
        .map(|a| escape(&a))
        .unwrap_or_else(|| "not specified".to_string());
    let date = order
        .delivery_date
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "not specified".to_string());
    let window = match (order.delivery_time_from, order.delivery_time_to) {
        (Some(from), Some(to)) => format!("{} - {}", from.format("%H:%M"), to.format("%H:%M")),
        _ => "not specified".to_string(),
    };
    Some(DeliveryInfo {
        address,
        date,
        window,
    })
}

/// Chat message for a freshly paid order
pub fn admin_payment_message(details: &OrderDetails) -> String {
    let order = &details.order;
    let mut text = String::new();

    let _ = writeln!(text, "<b>New paid order #{}</b>\n", order.id);
    let _ = writeln!(text, "<b>Customer:</b> {}", escape(&order.customer_name));
    let _ = writeln!(text, "<b>Phone:</b> {}", escape(&order.customer_phone));
    let _ = writeln!(text, "<b>Email:</b> {}\n", escape(&order.customer_email));
    let _ = writeln!(text, "<b>Recipient:</b> {}", escape(&order.recipient_name));
    let _ = writeln!(text, "<b>Recipient phone:</b> {}\n", escape(&order.recipient_phone));

    match delivery_info(details) {
        None => {
            let _ = writeln!(text, "<b>Pickup</b>\n");
        }
        Some(info) => {
            let _ = writeln!(text, "<b>Delivery</b>");
            let _ = writeln!(text, "<b>Address:</b> {}", info.address);
            let _ = writeln!(text, "<b>Delivery date:</b> {}", info.date);
            let _ = writeln!(text, "<b>Time:</b> {}\n", info.window);
        }
    }

    let _ = writeln!(text, "<b>Items:</b>");
    for line in &details.items {
        let _ = writeln!(
            text,
            "  • {} x{} - {} RUB",
            escape(line.title()),
            line.item.quantity,
            line.line_total()
        );
    }

    match &details.payment {
        Some(payment) => {
            let _ = writeln!(text, "\n<b>Amount:</b> {} RUB", payment.amount);
            let _ = writeln!(text, "<b>Payment status:</b> {}", payment_label(payment.status));
            if let Some(transaction_id) = &payment.transaction_id {
                let _ = writeln!(text, "<b>Transaction ID:</b> {}", escape(transaction_id));
            }
            if let Some(paid_at) = payment.payment_date {
                let _ = writeln!(text, "<b>Paid at:</b> {}", paid_at.format("%d.%m.%Y %H:%M"));
            }
        }
        None => {
            let _ = writeln!(text, "\n<b>Amount:</b> {} RUB", order.total_amount);
        }
    }

    if let Some(card) = &order.greeting_card_text {
        let _ = writeln!(text, "\n<b>Greeting card:</b> {}", escape(card));
    }
    if let Some(comment) = &order.comment {
        let _ = writeln!(text, "\n<b>Comment:</b> {}", escape(comment));
    }

    text
}

/// Chat message for a status change
pub fn admin_status_message(details: &OrderDetails, old_status: OrderStatus) -> String {
    let order = &details.order;
    format!(
        "<b>Order status changed</b>\n\n\
         <b>Order:</b> #{}\n\
         <b>Customer:</b> {}\n\
         <b>Email:</b> {}\n\
         <b>Phone:</b> {}\n\n\
         <b>Previous status:</b> {}\n\
         <b>New status:</b> {}\n",
        order.id,
        escape(&order.customer_name),
        escape(&order.customer_email),
        escape(&order.customer_phone),
        status_label(old_status),
        status_label(order.status),
    )
}

/// Confirmation e-mail sent once the order is paid
pub fn order_confirmation_email(details: &OrderDetails, shop_name: &str) -> EmailMessage {
    let order = &details.order;
    let mut html = String::from("<html><body>");

    let _ = write!(html, "<h2>Thank you for your order!</h2>");
    let _ = write!(html, "<p>Hello, {}!</p>", escape(&order.customer_name));
    let _ = write!(html, "<p>Your order #{} has been placed.</p>", order.id);
    let _ = write!(html, "<h3>Order details</h3>");
    let _ = write!(
        html,
        "<p><strong>Recipient:</strong> {}</p><p><strong>Recipient phone:</strong> {}</p>",
        escape(&order.recipient_name),
        escape(&order.recipient_phone)
    );

    match delivery_info(details) {
        None => {
            let _ = write!(html, "<p><strong>Fulfillment:</strong> Pickup</p>");
        }
        Some(info) => {
            let _ = write!(
                html,
                "<p><strong>Fulfillment:</strong> Delivery</p>\
                 <p><strong>Delivery address:</strong> {}</p>\
                 <p><strong>Delivery date:</strong> {}</p>\
                 <p><strong>Delivery time:</strong> {}</p>",
                info.address, info.date, info.window
            );
        }
    }

    let _ = write!(html, "<h3>Items</h3><ul>");
    for line in &details.items {
        let _ = write!(
            html,
            "<li>{} x{} - {} RUB</li>",
            escape(line.title()),
            line.item.quantity,
            line.line_total()
        );
    }
    let _ = write!(html, "</ul>");

    let payment_method = details
        .payment
        .as_ref()
        .map(|p| p.payment_method.to_string())
        .unwrap_or_else(|| "not specified".to_string());
    let _ = write!(
        html,
        "<p><strong>Total:</strong> {} RUB</p>\
         <p><strong>Payment method:</strong> {}</p>\
         <p><strong>Order status:</strong> {}</p>",
        order.total_amount,
        payment_method,
        status_label(order.status)
    );

    if let Some(card) = &order.greeting_card_text {
        let _ = write!(html, "<p><strong>Greeting card:</strong> {}</p>", escape(card));
    }
    if let Some(comment) = &order.comment {
        let _ = write!(html, "<p><strong>Comment:</strong> {}</p>", escape(comment));
    }

    let _ = write!(
        html,
        "<p>We will contact you shortly to confirm the order.</p>\
         <p>Best regards,<br>{}</p></body></html>",
        escape(shop_name)
    );

    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Order confirmation #{}", order.id),
        html,
    }
}

fn status_headline(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Paid => "Your order has been paid",
        OrderStatus::Processing => "Your order is being prepared",
        OrderStatus::Completed => "Your order is complete",
        OrderStatus::Cancelled => "Your order has been cancelled",
        _ => "Your order status has changed",
    }
}

/// Status-change e-mail for the customer
pub fn status_change_email(
    details: &OrderDetails,
    old_status: OrderStatus,
    shop_name: &str,
) -> EmailMessage {
    let order = &details.order;
    let html = format!(
        "<html><body>\
         <h2>Order status update</h2>\
         <p>Hello, {}!</p>\
         <p>The status of your order #{} has changed:</p>\
         <p><strong>Previous status:</strong> {}</p>\
         <p><strong>New status:</strong> {}</p>\
         <p><strong>{}</strong></p>\
         <p>Best regards,<br>{}</p>\
         </body></html>",
        escape(&order.customer_name),
        order.id,
        status_label(old_status),
        status_label(order.status),
        status_headline(order.status),
        escape(shop_name),
    );

    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Order status update #{}", order.id),
        html,
    }
}
