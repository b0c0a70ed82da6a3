use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::blocked_customer::{self, Entity as BlockedCustomer};
use crate::entities::order;
use crate::errors::ServiceError;

/// A distinct customer contact pair taken from placed orders
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct CustomerRow {
    pub email: String,
    pub phone: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: Arc<DatabaseConnection>,
}

impl CustomerRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// A block entry matches on email. When both the entry and the lookup carry a
    /// phone, the phones must match too; an entry without a phone covers every phone.
    pub async fn is_blocked(&self, email: &str, phone: Option<&str>) -> Result<bool, ServiceError> {
        let mut condition = Condition::all().add(blocked_customer::Column::Email.eq(email));
        if let Some(phone) = phone {
            condition = condition.add(
                Condition::any()
                    .add(blocked_customer::Column::Phone.is_null())
                    .add(blocked_customer::Column::Phone.eq(phone)),
            );
        }

        let count = BlockedCustomer::find()
            .filter(condition)
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }

    /// Inserts a block entry unless an identical one already exists
    pub async fn block(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<blocked_customer::Model, ServiceError> {
        let phone_condition = match phone {
            Some(phone) => blocked_customer::Column::Phone.eq(phone),
            None => blocked_customer::Column::Phone.is_null(),
        };
        if let Some(existing) = BlockedCustomer::find()
            .filter(blocked_customer::Column::Email.eq(email))
            .filter(phone_condition)
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        Ok(blocked_customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            phone: Set(phone.map(str::to_string)),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }

    /// Removes every block entry for the email; returns how many were removed
    pub async fn unblock(&self, email: &str) -> Result<u64, ServiceError> {
        let result = BlockedCustomer::delete_many()
            .filter(blocked_customer::Column::Email.eq(email))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Distinct `(email, phone)` pairs from orders with a display name
    pub async fn list_contacts(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<CustomerRow>, ServiceError> {
        Ok(order::Entity::find()
            .select_only()
            .column_as(order::Column::CustomerEmail, "email")
            .column_as(order::Column::CustomerPhone, "phone")
            .column_as(Expr::col(order::Column::CustomerName).max(), "name")
            .group_by(order::Column::CustomerEmail)
            .group_by(order::Column::CustomerPhone)
            .order_by_asc(order::Column::CustomerEmail)
            .limit(limit)
            .offset(offset)
            .into_model::<CustomerRow>()
            .all(&*self.db)
            .await?)
    }

    /// Block entries for any of the given emails
    pub async fn blocked_for_emails(
        &self,
        emails: Vec<String>,
    ) -> Result<Vec<blocked_customer::Model>, ServiceError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        Ok(BlockedCustomer::find()
            .filter(blocked_customer::Column::Email.is_in(emails))
            .all(&*self.db)
            .await?)
    }
}

/// Same matching rule as [`CustomerRepository::is_blocked`], applied in memory
pub fn entry_matches(entry: &blocked_customer::Model, email: &str, phone: Option<&str>) -> bool {
    if entry.email != email {
        return false;
    }
    match (entry.phone.as_deref(), phone) {
        (Some(blocked), Some(phone)) => blocked == phone,
        _ => true,
    }
}
