use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::bouquet_type::{self, Column, Entity as BouquetType};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct BouquetTypeRepository {
    db: Arc<DatabaseConnection>,
}

impl BouquetTypeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<bouquet_type::Model>, ServiceError> {
        Ok(BouquetType::find()
            .order_by_asc(Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<bouquet_type::Model>, ServiceError> {
        Ok(BouquetType::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<bouquet_type::Model>, ServiceError> {
        Ok(BouquetType::find()
            .filter(Column::Name.eq(name))
            .one(&*self.db)
            .await?)
    }

    pub async fn create(&self, name: String) -> Result<bouquet_type::Model, ServiceError> {
        Ok(bouquet_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }
}
