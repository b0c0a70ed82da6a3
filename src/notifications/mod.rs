//! Outbound customer e-mail and admin chat notifications.
//!
//! Services enqueue [`Notification`]s through a [`NotificationDispatcher`] and never
//! wait for delivery. A [`NotificationWorker`] drains the queue and hands each
//! message to the matching channel; delivery failures end in the log.

pub mod email;
pub mod telegram;
pub mod templates;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;
use crate::models::OrderDetails;

pub use email::HttpEmailChannel;
pub use telegram::TelegramChatChannel;

/// Message handed to the notification worker
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    AdminPaymentReceived(OrderDetails),
    CustomerOrderConfirmation(OrderDetails),
    CustomerStatusChanged {
        order: OrderDetails,
        old_status: OrderStatus,
    },
    AdminStatusChanged {
        order: OrderDetails,
        old_status: OrderStatus,
    },
}

impl Notification {
    pub fn order(&self) -> &OrderDetails {
        match self {
            Notification::AdminPaymentReceived(order)
            | Notification::CustomerOrderConfirmation(order)
            | Notification::CustomerStatusChanged { order, .. }
            | Notification::AdminStatusChanged { order, .. } => order,
        }
    }

    pub fn order_id(&self) -> Uuid {
        self.order().order.id
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::AdminPaymentReceived(_) => "admin_payment_received",
            Notification::CustomerOrderConfirmation(_) => "customer_order_confirmation",
            Notification::CustomerStatusChanged { .. } => "customer_status_changed",
            Notification::AdminStatusChanged { .. } => "admin_status_changed",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rejected by upstream with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rendered customer e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers e-mail to customers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Delivers messages to the shop admin chat
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn send(&self, text: String) -> Result<(), NotificationError>;
}

/// Enqueues notifications without waiting for delivery
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender }
    }

    /// Creates a dispatcher and the receiving end of its bounded queue
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Never blocks and never fails; a full or closed queue drops the message
    pub fn dispatch(&self, notification: Notification) {
        let order_id = notification.order_id();
        let kind = notification.kind();
        match self.sender.try_send(notification) {
            Ok(()) => debug!(order_id = %order_id, kind, "notification queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(order_id = %order_id, kind, "notification queue full, dropping message")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(order_id = %order_id, kind, "notification queue closed, dropping message")
            }
        }
    }
}

/// Routes queued notifications to their channel
#[derive(Clone)]
pub struct NotificationWorker {
    email: Arc<dyn EmailChannel>,
    chat: Arc<dyn ChatChannel>,
    shop_name: String,
}

impl NotificationWorker {
    pub fn new(email: Arc<dyn EmailChannel>, chat: Arc<dyn ChatChannel>, shop_name: String) -> Self {
        Self {
            email,
            chat,
            shop_name,
        }
    }

    pub async fn deliver(&self, notification: Notification) {
        let order_id = notification.order_id();
        let kind = notification.kind();

        let result = match &notification {
            Notification::AdminPaymentReceived(order) => {
                self.chat.send(templates::admin_payment_message(order)).await
            }
            Notification::AdminStatusChanged { order, old_status } => {
                self.chat
                    .send(templates::admin_status_message(order, *old_status))
                    .await
            }
            Notification::CustomerOrderConfirmation(order) => {
                self.email
                    .send(templates::order_confirmation_email(order, &self.shop_name))
                    .await
            }
            Notification::CustomerStatusChanged { order, old_status } => {
                self.email
                    .send(templates::status_change_email(
                        order,
                        *old_status,
                        &self.shop_name,
                    ))
                    .await
            }
        };

        match result {
            Ok(()) => info!(order_id = %order_id, kind, "notification delivered"),
            Err(e) => error!(order_id = %order_id, kind, error = %e, "notification delivery failed"),
        }
    }

    /// Drains the queue until every dispatcher is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<Notification>) {
        info!("Starting notification worker");
        while let Some(notification) = rx.recv().await {
            self.deliver(notification).await;
        }
        info!("Notification queue closed, worker stopping");
    }
}
