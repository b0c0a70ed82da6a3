pub mod cart_resolver;
pub mod catalog;
pub mod customers;
pub mod flowers;
pub mod order_status;
pub mod orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::notifications::NotificationDispatcher;
use crate::payments::{PaymentGateway, WebhookVerifier};
use crate::repositories::{
    BouquetRepository, BouquetTypeRepository, CustomerRepository, FlowerTypeRepository,
    OrderRepository,
};

pub use cart_resolver::{CartRequestLine, CartResolver};
pub use catalog::{BouquetDetail, CatalogService, CreateBouquet, UpdateBouquet};
pub use customers::{CustomerService, CustomerSummary};
pub use flowers::{CreateCatalogType, FlowerService};
pub use orders::{OrderCreated, OrderWorkflow, PlaceOrder, WebhookOutcome};

/// Services shared by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderWorkflow>,
    pub customers: Arc<CustomerService>,
    pub catalog: Arc<CatalogService>,
    pub flowers: Arc<FlowerService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        notifications: NotificationDispatcher,
    ) -> Self {
        let bouquets = BouquetRepository::new(db.clone());
        let customers = CustomerRepository::new(db.clone());
        let flowers = FlowerService::new(FlowerTypeRepository::new(db.clone()));
        let bouquet_types = BouquetTypeRepository::new(db.clone());
        let orders = OrderRepository::new(db);

        Self {
            orders: Arc::new(OrderWorkflow::new(
                orders,
                CartResolver::new(bouquets.clone()),
                customers.clone(),
                gateway,
                notifications,
                verifier,
            )),
            customers: Arc::new(CustomerService::new(customers)),
            catalog: Arc::new(CatalogService::new(bouquets, bouquet_types, flowers.clone())),
            flowers: Arc::new(flowers),
        }
    }
}
