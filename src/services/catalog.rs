use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::flowers::{dedup_ids, CreateCatalogType, FlowerService};
use crate::entities::{bouquet, bouquet_type, flower_type};
use crate::errors::ServiceError;
use crate::repositories::{
    BouquetChanges, BouquetFilter, BouquetRepository, BouquetTypeRepository, NewBouquet,
};

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Price must be greater than 0".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBouquet {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "1000.00")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    pub bouquet_type_id: Option<Uuid>,
    #[serde(default)]
    pub flower_type_ids: Vec<Uuid>,
}

/// Admin edit. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBouquet {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>, example = "1000.00")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub bouquet_type_id: Option<Uuid>,
    /// Replaces the bouquet's flowers when present
    pub flower_type_ids: Option<Vec<Uuid>>,
}

/// Product page: the bouquet plus its type and flowers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BouquetDetail {
    #[serde(flatten)]
    pub bouquet: bouquet::Model,
    pub bouquet_type: Option<bouquet_type::Model>,
    pub flower_types: Vec<flower_type::Model>,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    bouquets: BouquetRepository,
    bouquet_types: BouquetTypeRepository,
    flowers: FlowerService,
}

impl CatalogService {
    pub fn new(
        bouquets: BouquetRepository,
        bouquet_types: BouquetTypeRepository,
        flowers: FlowerService,
    ) -> Self {
        Self {
            bouquets,
            bouquet_types,
            flowers,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_bouquet(&self, request: CreateBouquet) -> Result<bouquet::Model, ServiceError> {
        request.validate()?;
        self.validate_bouquet_type(request.bouquet_type_id).await?;
        let flower_type_ids = dedup_ids(request.flower_type_ids);
        self.flowers.validate_flower_types(&flower_type_ids).await?;

        let created = self
            .bouquets
            .create(NewBouquet {
                name: request.name,
                description: request.description,
                price: request.price.round_dp(2),
                quantity: request.quantity,
                bouquet_type_id: request.bouquet_type_id,
                flower_type_ids,
            })
            .await?;
        info!(bouquet_id = %created.id, "bouquet created");
        Ok(created)
    }

    /// Active bouquet by id, without touching its view counter
    pub async fn get_bouquet(&self, id: Uuid) -> Result<bouquet::Model, ServiceError> {
        self.bouquets
            .find_active(id)
            .await?
            .ok_or_else(|| bouquet_not_found(id))
    }

    /// Storefront product page. Each call counts as one view.
    #[instrument(skip(self))]
    pub async fn view_bouquet(&self, id: Uuid) -> Result<BouquetDetail, ServiceError> {
        if !self.bouquets.increment_view_count(id).await? {
            return Err(bouquet_not_found(id));
        }
        let bouquet = self.get_bouquet(id).await?;
        let bouquet_type = self.bouquets.bouquet_type(&bouquet).await?;
        let flower_types = self.bouquets.flower_types(id).await?;
        Ok(BouquetDetail {
            bouquet,
            bouquet_type,
            flower_types,
        })
    }

    pub async fn list_bouquets(&self, limit: u64, offset: u64) -> Result<Vec<bouquet::Model>, ServiceError> {
        self.bouquets.list(limit, offset).await
    }

    pub async fn popular_bouquets(&self, limit: u64, offset: u64) -> Result<Vec<bouquet::Model>, ServiceError> {
        self.bouquets.popular(limit, offset).await
    }

    pub async fn search_bouquets(
        &self,
        filter: BouquetFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<bouquet::Model>, ServiceError> {
        if let (Some(min), Some(max)) = (filter.price_min, filter.price_max) {
            if min > max {
                return Err(ServiceError::ValidationError(
                    "price_min must not exceed price_max".to_string(),
                ));
            }
        }
        self.bouquets.search(&filter, limit, offset).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_bouquet(
        &self,
        id: Uuid,
        request: UpdateBouquet,
    ) -> Result<bouquet::Model, ServiceError> {
        request.validate()?;
        self.validate_bouquet_type(request.bouquet_type_id).await?;
        let flower_type_ids = request.flower_type_ids.map(dedup_ids);
        if let Some(ids) = &flower_type_ids {
            self.flowers.validate_flower_types(ids).await?;
        }

        let updated = self
            .bouquets
            .update(
                id,
                BouquetChanges {
                    name: request.name,
                    description: request.description,
                    price: request.price.map(|price| price.round_dp(2)),
                    quantity: request.quantity,
                    bouquet_type_id: request.bouquet_type_id,
                    flower_type_ids,
                },
            )
            .await?
            .ok_or_else(|| bouquet_not_found(id))?;
        info!(bouquet_id = %id, "bouquet updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_stock(&self, id: Uuid, quantity: i32) -> Result<bouquet::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Stock quantity cannot be negative".to_string(),
            ));
        }
        self.bouquets
            .set_quantity(id, quantity)
            .await?
            .ok_or_else(|| bouquet_not_found(id))
    }

    /// Hides the bouquet from the storefront and from new orders
    #[instrument(skip(self))]
    pub async fn archive_bouquet(&self, id: Uuid) -> Result<bouquet::Model, ServiceError> {
        let archived = self
            .bouquets
            .set_active(id, false)
            .await?
            .ok_or_else(|| bouquet_not_found(id))?;
        info!(bouquet_id = %id, "bouquet archived");
        Ok(archived)
    }

    /// Bouquets that appear on past orders can only be archived
    #[instrument(skip(self))]
    pub async fn delete_bouquet(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.bouquets.find_by_id(id).await?.is_none() {
            return Err(bouquet_not_found(id));
        }
        let order_lines = self.bouquets.order_line_count(id).await?;
        if order_lines > 0 {
            warn!(bouquet_id = %id, order_lines, "refusing to delete an ordered bouquet");
            return Err(ServiceError::Conflict(format!(
                "Bouquet {} is referenced by {} order line(s); archive it instead",
                id, order_lines
            )));
        }
        if !self.bouquets.delete(id).await? {
            return Err(bouquet_not_found(id));
        }
        info!(bouquet_id = %id, "bouquet deleted");
        Ok(())
    }

    pub async fn list_bouquet_types(&self) -> Result<Vec<bouquet_type::Model>, ServiceError> {
        self.bouquet_types.list().await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_bouquet_type(
        &self,
        request: CreateCatalogType,
    ) -> Result<bouquet_type::Model, ServiceError> {
        let name = request.normalized_name()?;
        if self.bouquet_types.find_by_name(&name).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Bouquet type {} already exists",
                name
            )));
        }
        let created = self.bouquet_types.create(name).await?;
        info!(bouquet_type_id = %created.id, "bouquet type created");
        Ok(created)
    }

    async fn validate_bouquet_type(&self, id: Option<Uuid>) -> Result<(), ServiceError> {
        let Some(id) = id else {
            return Ok(());
        };
        match self.bouquet_types.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!(
                "Bouquet type with ID {} not found",
                id
            ))),
        }
    }
}

fn bouquet_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Bouquet with ID {} not found", id))
}
