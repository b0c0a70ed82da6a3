use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::flower_type;
use crate::errors::ServiceError;
use crate::repositories::{FlowerTypeRepository, FlowerTypeRow};

/// Name of a new flower or bouquet type
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCatalogType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

impl CreateCatalogType {
    /// Validated name with surrounding whitespace removed
    pub fn normalized_name(&self) -> Result<String, ServiceError> {
        self.validate()?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("Name must not be blank".to_string()));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FlowerService {
    flowers: FlowerTypeRepository,
}

impl FlowerService {
    pub fn new(flowers: FlowerTypeRepository) -> Self {
        Self { flowers }
    }

    pub async fn get_all(&self) -> Result<Vec<FlowerTypeRow>, ServiceError> {
        self.flowers.list_with_bouquet_count().await
    }

    /// Fails with `NotFound` naming the ids that do not exist
    pub async fn validate_flower_types(&self, ids: &[Uuid]) -> Result<(), ServiceError> {
        let requested: HashSet<Uuid> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(());
        }
        let found: HashSet<Uuid> = self
            .flowers
            .find_many(requested.iter().copied().collect())
            .await?
            .into_iter()
            .map(|flower| flower.id)
            .collect();

        let mut missing: Vec<String> = requested
            .difference(&found)
            .map(Uuid::to_string)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ServiceError::NotFound(format!(
            "Flower types with IDs [{}] not found",
            missing.join(", ")
        )))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_flower_type(
        &self,
        request: CreateCatalogType,
    ) -> Result<flower_type::Model, ServiceError> {
        let name = request.normalized_name()?;
        if self.flowers.find_by_name(&name).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Flower type {} already exists",
                name
            )));
        }
        let created = self.flowers.create(name).await?;
        info!(flower_type_id = %created.id, "flower type created");
        Ok(created)
    }
}

/// Removes repeated ids, keeping first-occurrence order
pub fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
