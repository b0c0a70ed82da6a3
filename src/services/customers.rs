use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::entities::blocked_customer;
use crate::errors::ServiceError;
use crate::repositories::customer_repository::entry_matches;
use crate::repositories::CustomerRepository;

/// A customer as seen by the admin: contact pair, name and block flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    pub email: String,
    pub phone: String,
    pub name: Option<String>,
    pub is_blocked: bool,
}

/// Emails are stored and compared lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct CustomerService {
    customers: CustomerRepository,
}

impl CustomerService {
    pub fn new(customers: CustomerRepository) -> Self {
        Self { customers }
    }

    pub async fn is_blocked(&self, email: &str, phone: Option<&str>) -> Result<bool, ServiceError> {
        self.customers
            .is_blocked(&normalize_email(email), phone.map(str::trim))
            .await
    }

    #[instrument(skip(self))]
    pub async fn block_customer(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<blocked_customer::Model, ServiceError> {
        let entry = self
            .customers
            .block(&normalize_email(email), phone.map(str::trim).filter(|p| !p.is_empty()))
            .await?;
        info!(email, "customer blocked");
        Ok(entry)
    }

    /// Fails with `NotFound` when the email has no block entry
    #[instrument(skip(self))]
    pub async fn unblock_customer(&self, email: &str) -> Result<(), ServiceError> {
        if self.customers.unblock(&normalize_email(email)).await? == 0 {
            return Err(ServiceError::NotFound(format!(
                "Blocked customer with email {} not found",
                email
            )));
        }
        info!(email, "customer unblocked");
        Ok(())
    }

    pub async fn list_customers(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<CustomerSummary>, ServiceError> {
        let rows = self.customers.list_contacts(limit, offset).await?;
        let emails = rows.iter().map(|row| row.email.clone()).collect();
        let blocked = self.customers.blocked_for_emails(emails).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let is_blocked = blocked
                    .iter()
                    .any(|entry| entry_matches(entry, &row.email, Some(row.phone.as_str())));
                CustomerSummary {
                    email: row.email,
                    phone: row.phone,
                    name: row.name,
                    is_blocked,
                }
            })
            .collect())
    }
}
