use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::entities::order::{self, Column, Entity as Order};
use crate::entities::{
    bouquet, order_item, payment, DeliveryMethod, OrderStatus, PaymentMethod, PaymentStatus,
};
use crate::errors::ServiceError;
use crate::models::{CartLine, OrderDetails, OrderLine};

/// Order header fields supplied at placement time
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub delivery_method: DeliveryMethod,
    pub delivery_city: Option<String>,
    pub delivery_street: Option<String>,
    pub delivery_house: Option<String>,
    pub delivery_apartment: Option<String>,
    pub delivery_floor: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_time_from: Option<DateTime<Utc>>,
    pub delivery_time_to: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub greeting_card_text: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Result of a status transition: the statuses before the write and the order after it
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub previous_order_status: OrderStatus,
    pub previous_payment_status: Option<PaymentStatus>,
    pub order: order::Model,
    pub payment_status: Option<PaymentStatus>,
}

impl StatusTransition {
    /// True when the order status differs from the one before the write
    pub fn order_status_changed(&self) -> bool {
        self.previous_order_status != self.order.status
    }

    pub fn payment_status_changed(&self) -> bool {
        self.previous_payment_status != self.payment_status
    }
}

/// Persistence for the order aggregate (order, items, payment)
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: Arc<DatabaseConnection>,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists the order header, one item per cart line and a pending payment
    /// for `total_amount`, all in one transaction.
    #[instrument(skip(self, new_order, lines), fields(lines = lines.len()))]
    pub async fn create_with_items(
        &self,
        new_order: NewOrder,
        lines: &[CartLine],
        total_amount: Decimal,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let header = order::ActiveModel {
            id: Set(order_id),
            customer_name: Set(new_order.customer_name),
            customer_phone: Set(new_order.customer_phone),
            customer_email: Set(new_order.customer_email),
            recipient_name: Set(new_order.recipient_name),
            recipient_phone: Set(new_order.recipient_phone),
            delivery_method: Set(new_order.delivery_method),
            delivery_city: Set(new_order.delivery_city),
            delivery_street: Set(new_order.delivery_street),
            delivery_house: Set(new_order.delivery_house),
            delivery_apartment: Set(new_order.delivery_apartment),
            delivery_floor: Set(new_order.delivery_floor),
            delivery_date: Set(new_order.delivery_date),
            delivery_time_from: Set(new_order.delivery_time_from),
            delivery_time_to: Set(new_order.delivery_time_to),
            comment: Set(new_order.comment),
            greeting_card_text: Set(new_order.greeting_card_text),
            total_amount: Set(total_amount),
            status: Set(OrderStatus::Pending),
            is_active: Set(false),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        for line in lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                bouquet_id: Set(line.bouquet_id),
                quantity: Set(line.quantity),
                price: Set(line.unit_price),
            }
            .insert(&txn)
            .await?;
        }

        payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            amount: Set(total_amount),
            payment_method: Set(new_order.payment_method),
            status: Set(PaymentStatus::Pending),
            transaction_id: Set(None),
            payment_date: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        debug!(order_id = %order_id, "order persisted");

        Ok(header)
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        Ok(Order::find_by_id(order_id).one(&*self.db).await?)
    }

    /// Loads the order with its items (and their bouquets) and payment.
    /// Absence is not an error here.
    pub async fn get_with_relations(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderDetails>, ServiceError> {
        let Some(order) = Order::find_by_id(order_id).one(&*self.db).await? else {
            return Ok(None);
        };

        let items = order
            .find_related(order_item::Entity)
            .find_also_related(bouquet::Entity)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(item, bouquet)| OrderLine { item, bouquet })
            .collect();

        let payment = order.find_related(payment::Entity).one(&*self.db).await?;

        Ok(Some(OrderDetails {
            order,
            items,
            payment,
        }))
    }

    /// Applies the given statuses; `None` leaves that status untouched.
    ///
    /// Returns `Ok(None)` when the order does not exist. The order row is written
    /// with a version check, so a concurrent writer makes this fail with
    /// `ConcurrentModification` and nothing is committed. Passing
    /// `expected_version` extends the check to a version the caller read earlier.
    #[instrument(skip(self))]
    pub async fn apply_status_transition(
        &self,
        order_id: Uuid,
        new_order_status: Option<OrderStatus>,
        new_payment_status: Option<PaymentStatus>,
        expected_version: Option<i32>,
    ) -> Result<Option<StatusTransition>, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(current) = Order::find_by_id(order_id).one(&txn).await? else {
            return Ok(None);
        };
        if expected_version.is_some_and(|v| v != current.version) {
            return Err(ServiceError::ConcurrentModification(order_id));
        }
        let current_payment = current.find_related(payment::Entity).one(&txn).await?;

        let previous_order_status = current.status;
        let previous_payment_status = current_payment.as_ref().map(|p| p.status);

        if let Some(status) = new_order_status {
            write_order_status(&txn, order_id, current.version, status).await?;
        }

        let mut payment_status = previous_payment_status;
        if let (Some(status), Some(existing)) = (new_payment_status, current_payment) {
            let mut active: payment::ActiveModel = existing.into();
            active.status = Set(status);
            if status == PaymentStatus::Paid {
                active.payment_date = Set(Some(Utc::now()));
            }
            active.update(&txn).await?;
            payment_status = Some(status);
        } else if new_payment_status.is_some() {
            warn!(order_id = %order_id, "order has no payment record; payment status left unset");
        }

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?;

        txn.commit().await?;

        Ok(Some(StatusTransition {
            previous_order_status,
            previous_payment_status,
            order,
            payment_status,
        }))
    }

    /// Hard delete; items and payment go with it through the cascading keys.
    /// Returns false when nothing was deleted.
    pub async fn delete(&self, order_id: Uuid) -> Result<bool, ServiceError> {
        let result = Order::delete_by_id(order_id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Newest first
    pub async fn list(&self, limit: u64, offset: u64) -> Result<Vec<order::Model>, ServiceError> {
        Ok(Order::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?)
    }

    /// Sets the soft-archival flag. Returns `None` when the order does not exist.
    pub async fn set_active(
        &self,
        order_id: Uuid,
        is_active: bool,
    ) -> Result<Option<order::Model>, ServiceError> {
        let Some(existing) = Order::find_by_id(order_id).one(&*self.db).await? else {
            return Ok(None);
        };
        let mut active: order::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        Ok(Some(active.update(&*self.db).await?))
    }
}

/// Conditional status write: only succeeds while the row still carries `expected_version`.
pub async fn write_order_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    expected_version: i32,
    status: OrderStatus,
) -> Result<(), ServiceError> {
    let result = Order::update_many()
        .col_expr(Column::Status, Expr::value(status.to_value()))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .col_expr(Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(Column::Id.eq(order_id))
        .filter(Column::Version.eq(expected_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(order_id = %order_id, expected_version, "order version changed underneath status write");
        return Err(ServiceError::ConcurrentModification(order_id));
    }
    Ok(())
}
