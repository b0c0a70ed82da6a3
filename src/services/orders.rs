use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::cart_resolver::{CartRequestLine, CartResolver};
use super::order_status::map_provider_status;
use crate::entities::{order, DeliveryMethod, OrderStatus, PaymentStatus};
use crate::errors::ServiceError;
use crate::models::{cart::cart_total, OrderDetails};
use crate::notifications::{Notification, NotificationDispatcher};
use crate::payments::{BillingContact, PaymentGateway, WebhookError, WebhookVerifier};
use crate::repositories::{CustomerRepository, NewOrder, OrderRepository, StatusTransition};

/// Attempts for a webhook-driven transition that keeps losing the version race
const WEBHOOK_TRANSITION_ATTEMPTS: u32 = 3;

/// Default page size of the admin order list
pub const DEFAULT_ORDER_PAGE_SIZE: u64 = 10;

/// Order placement input: header fields plus the requested lines
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order: NewOrder,
    pub lines: Vec<CartRequestLine>,
}

/// A persisted order and the hosted payment page the customer goes to next
#[derive(Debug, Clone)]
pub struct OrderCreated {
    pub order: order::Model,
    pub payment_url: String,
}

/// What the webhook handler did with a delivery. The provider always gets an ack.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Rejected(WebhookError),
    Ignored { event: String },
    NoChange,
    UnknownOrder(String),
    Duplicate { order_id: Uuid },
    Applied {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    Failed { order_id: Uuid, reason: String },
}

/// Coordinates cart pricing, persistence, the payment provider and notifications
#[derive(Clone)]
pub struct OrderWorkflow {
    orders: OrderRepository,
    cart: CartResolver,
    customers: CustomerRepository,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationDispatcher,
    verifier: WebhookVerifier,
}

impl OrderWorkflow {
    pub fn new(
        orders: OrderRepository,
        cart: CartResolver,
        customers: CustomerRepository,
        gateway: Arc<dyn PaymentGateway>,
        notifications: NotificationDispatcher,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            orders,
            cart,
            customers,
            gateway,
            notifications,
            verifier,
        }
    }

    /// Prices the cart from the catalog, persists the order and opens a payment session.
    ///
    /// When the provider cannot open a session the order is deleted again and
    /// the call fails with `OrderCreationFailed`. No notifications go out here.
    #[instrument(skip(self, request), fields(customer_email = %request.order.customer_email))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<OrderCreated, ServiceError> {
        validate_fulfillment(&request.order)?;

        if self
            .customers
            .is_blocked(
                &request.order.customer_email,
                Some(request.order.customer_phone.as_str()),
            )
            .await?
        {
            warn!("order rejected for blocked customer");
            return Err(ServiceError::Forbidden(
                "Customer is not allowed to place orders".to_string(),
            ));
        }

        let lines = self.cart.resolve(&request.lines).await?;
        let total = cart_total(&lines);
        let contact = BillingContact {
            phone: request.order.customer_phone.clone(),
            email: request.order.customer_email.clone(),
        };

        let order = self
            .orders
            .create_with_items(request.order, &lines, total)
            .await?;

        match self
            .gateway
            .create_payment_session(order.id, &lines, &contact)
            .await
        {
            Ok(payment_url) => {
                info!(order_id = %order.id, total = %total, "order placed");
                Ok(OrderCreated { order, payment_url })
            }
            Err(e) => {
                error!(order_id = %order.id, error = %e, "payment session failed, removing order");
                if let Err(delete_err) = self.orders.delete(order.id).await {
                    error!(order_id = %order.id, error = %delete_err, "compensating delete failed");
                }
                Err(ServiceError::OrderCreationFailed)
            }
        }
    }

    /// Reconciles a provider callback with the stored order. Never fails.
    #[instrument(skip(self, body), fields(body_len = body.len()))]
    pub async fn handle_payment_webhook(&self, body: &[u8]) -> WebhookOutcome {
        let payload = match self.verifier.decode(body).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "webhook rejected");
                return WebhookOutcome::Rejected(e);
            }
        };

        if !payload.is_status_update() {
            info!(event = %payload.event, "ignoring webhook event");
            return WebhookOutcome::Ignored {
                event: payload.event,
            };
        }

        let Some(provider_order) = payload.order else {
            warn!("status update without an order section");
            return WebhookOutcome::NoChange;
        };

        let Some((order_status, payment_status)) =
            map_provider_status(&provider_order.payment_status)
        else {
            info!(
                order_id = %provider_order.order_id,
                status = ?provider_order.payment_status,
                "provider status carries no change"
            );
            return WebhookOutcome::NoChange;
        };

        let Ok(order_id) = Uuid::parse_str(provider_order.order_id.trim()) else {
            warn!(order_id = %provider_order.order_id, "webhook references a malformed order id");
            return WebhookOutcome::UnknownOrder(provider_order.order_id);
        };

        let transition = match self
            .transition_with_retry(order_id, order_status, payment_status)
            .await
        {
            Ok(Some(transition)) => transition,
            Ok(None) => {
                warn!(order_id = %order_id, "webhook references an unknown order");
                return WebhookOutcome::UnknownOrder(provider_order.order_id);
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "webhook transition failed");
                return WebhookOutcome::Failed {
                    order_id,
                    reason: e.to_string(),
                };
            }
        };

        if !transition.order_status_changed() && !transition.payment_status_changed() {
            info!(order_id = %order_id, status = %transition.order.status, "duplicate webhook delivery");
            return WebhookOutcome::Duplicate { order_id };
        }

        info!(
            order_id = %order_id,
            from = %transition.previous_order_status,
            to = %transition.order.status,
            "order status updated from webhook"
        );
        self.notify_transition(&transition).await;

        WebhookOutcome::Applied {
            order_id,
            from: transition.previous_order_status,
            to: transition.order.status,
        }
    }

    async fn transition_with_retry(
        &self,
        order_id: Uuid,
        order_status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Option<StatusTransition>, ServiceError> {
        retry_on_conflict(WEBHOOK_TRANSITION_ATTEMPTS, move || {
            self.orders
                .apply_status_transition(order_id, Some(order_status), Some(payment_status), None)
        })
        .await
    }

    /// Admin-initiated status change, checked against the order state machine.
    pub async fn update_status_manually(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderDetails, ServiceError> {
        self.update_status_at_version(order_id, new_status, None).await
    }

    /// Like [`Self::update_status_manually`], but fails with `ConcurrentModification`
    /// (409) unless the order still carries `expected_version`. Without an expected
    /// version the one read here is used, so only a write racing this call conflicts.
    #[instrument(skip(self), fields(order_id = %order_id, status = %new_status))]
    pub async fn update_status_at_version(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        expected_version: Option<i32>,
    ) -> Result<OrderDetails, ServiceError> {
        let current = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?;

        let expected_version = expected_version.unwrap_or(current.version);
        if expected_version != current.version {
            warn!(expected_version, current_version = current.version, "stale order version");
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        if !current.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot change order status from {} to {}",
                current.status, new_status
            )));
        }

        let transition = self
            .orders
            .apply_status_transition(order_id, Some(new_status), None, Some(expected_version))
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?;

        let details = self
            .orders
            .get_with_relations(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?;

        if transition.order_status_changed() {
            info!(from = %transition.previous_order_status, "order status updated by admin");
            for notification in notifications_for(&details, transition.previous_order_status) {
                self.notifications.dispatch(notification);
            }
        }

        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        if !self.orders.delete(order_id).await? {
            return Err(ServiceError::order_not_found(order_id));
        }
        info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    /// Sets the archival flag on the order
    #[instrument(skip(self))]
    pub async fn archive_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        self.orders
            .set_active(order_id, true)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    pub async fn list_orders(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<order::Model>, ServiceError> {
        self.orders
            .list(
                limit.unwrap_or(DEFAULT_ORDER_PAGE_SIZE),
                offset.unwrap_or(0),
            )
            .await
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        self.orders
            .get_with_relations(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    async fn notify_transition(&self, transition: &StatusTransition) {
        let order_id = transition.order.id;
        match self.orders.get_with_relations(order_id).await {
            Ok(Some(details)) => {
                for notification in notifications_for(&details, transition.previous_order_status) {
                    self.notifications.dispatch(notification);
                }
            }
            Ok(None) => warn!(order_id = %order_id, "order vanished before notifications were sent"),
            Err(e) => error!(order_id = %order_id, error = %e, "could not load order for notifications"),
        }
    }
}

/// Runs `op` again while it fails with `ConcurrentModification`, at most `attempts` times in total
async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(ServiceError::ConcurrentModification(order_id)) if attempt < attempts => {
                warn!(order_id = %order_id, attempt, "status write conflicted, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Notifications for an order that just moved away from `old_status`
pub fn notifications_for(details: &OrderDetails, old_status: OrderStatus) -> Vec<Notification> {
    if details.order.status == OrderStatus::Paid {
        vec![
            Notification::AdminPaymentReceived(details.clone()),
            Notification::CustomerOrderConfirmation(details.clone()),
        ]
    } else {
        vec![
            Notification::CustomerStatusChanged {
                order: details.clone(),
                old_status,
            },
            Notification::AdminStatusChanged {
                order: details.clone(),
                old_status,
            },
        ]
    }
}

/// Delivery orders need an address; pickup orders ignore it.
pub fn validate_fulfillment(order: &NewOrder) -> Result<(), ServiceError> {
    if order.delivery_method == DeliveryMethod::Delivery {
        let missing: Vec<&str> = [
            ("delivery_city", &order.delivery_city),
            ("delivery_street", &order.delivery_street),
            ("delivery_house", &order.delivery_house),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Delivery orders require {}",
                missing.join(", ")
            )));
        }
    }

    if let (Some(from), Some(to)) = (order.delivery_time_from, order.delivery_time_to) {
        if from > to {
            return Err(ServiceError::ValidationError(
                "delivery_time_from must not be after delivery_time_to".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PaymentMethod;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn new_order(method: DeliveryMethod) -> NewOrder {
        NewOrder {
            customer_name: "Anna".into(),
            customer_phone: "+79990000000".into(),
            customer_email: "anna@example.com".into(),
            recipient_name: "Maria".into(),
            recipient_phone: "+79991111111".into(),
            delivery_method: method,
            delivery_city: None,
            delivery_street: None,
            delivery_house: None,
            delivery_apartment: None,
            delivery_floor: None,
            delivery_date: None,
            delivery_time_from: None,
            delivery_time_to: None,
            comment: None,
            greeting_card_text: None,
            payment_method: PaymentMethod::Card,
        }
    }

    fn details(status: OrderStatus) -> OrderDetails {
        OrderDetails {
            order: order::Model {
                id: Uuid::new_v4(),
                customer_name: "Anna".into(),
                customer_phone: "+79990000000".into(),
                customer_email: "anna@example.com".into(),
                recipient_name: "Maria".into(),
                recipient_phone: "+79991111111".into(),
                delivery_method: DeliveryMethod::Pickup,
                delivery_city: None,
                delivery_street: None,
                delivery_house: None,
                delivery_apartment: None,
                delivery_floor: None,
                delivery_date: None,
                delivery_time_from: None,
                delivery_time_to: None,
                comment: None,
                greeting_card_text: None,
                total_amount: dec!(2000),
                status,
                is_active: false,
                version: 2,
                created_at: Utc::now(),
                updated_at: None,
            },
            items: vec![],
            payment: None,
        }
    }

    #[test]
    fn pickup_needs_no_address() {
        assert!(validate_fulfillment(&new_order(DeliveryMethod::Pickup)).is_ok());
    }

    #[test]
    fn delivery_lists_missing_address_parts() {
        let mut order = new_order(DeliveryMethod::Delivery);
        order.delivery_city = Some("Moscow".into());
        order.delivery_street = Some("  ".into());
        let err = validate_fulfillment(&order).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("delivery_street") && msg.contains("delivery_house") && !msg.contains("delivery_city"));
    }

    #[test]
    fn inverted_delivery_window_is_rejected() {
        let mut order = new_order(DeliveryMethod::Pickup);
        let now = Utc::now();
        order.delivery_time_from = Some(now);
        order.delivery_time_to = Some(now - Duration::hours(1));
        assert_matches!(validate_fulfillment(&order), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn paid_orders_notify_admin_payment_and_customer_confirmation() {
        let kinds: Vec<_> = notifications_for(&details(OrderStatus::Paid), OrderStatus::Pending)
            .iter()
            .map(Notification::kind)
            .collect();
        assert_eq!(kinds, ["admin_payment_received", "customer_order_confirmation"]);
    }

    #[test]
    fn other_statuses_notify_with_previous_status() {
        let notifications =
            notifications_for(&details(OrderStatus::Completed), OrderStatus::Processing);
        assert_eq!(notifications.len(), 2);
        assert_matches!(
            &notifications[0],
            Notification::CustomerStatusChanged { old_status: OrderStatus::Processing, .. }
        );
        assert_matches!(
            &notifications[1],
            Notification::AdminStatusChanged { old_status: OrderStatus::Processing, .. }
        );
    }

    #[tokio::test]
    async fn persistent_conflicts_give_up_after_the_attempt_budget() {
        let calls = AtomicU32::new(0);
        let order_id = Uuid::new_v4();

        let result: Result<(), _> = retry_on_conflict(WEBHOOK_TRANSITION_ATTEMPTS, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(ServiceError::ConcurrentModification(order_id)) }
        })
        .await;

        assert_matches!(result, Err(ServiceError::ConcurrentModification(id)) if id == order_id);
        assert_eq!(calls.load(Ordering::SeqCst), WEBHOOK_TRANSITION_ATTEMPTS);
    }

    #[tokio::test]
    async fn conflict_resolved_on_last_attempt_succeeds() {
        let calls = AtomicU32::new(0);

        let result = retry_on_conflict(3, || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err(ServiceError::ConcurrentModification(Uuid::nil()))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_on_conflict(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::InternalError("boom".into())) }
        })
        .await;

        assert_matches!(result, Err(ServiceError::InternalError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
