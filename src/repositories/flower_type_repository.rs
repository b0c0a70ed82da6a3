use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::bouquet_flower_type;
use crate::entities::flower_type::{self, Column, Entity as FlowerType};
use crate::errors::ServiceError;

/// A flower with the number of bouquets that contain it
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, ToSchema)]
pub struct FlowerTypeRow {
    pub id: Uuid,
    pub name: String,
    pub bouquets_count: i64,
}

#[derive(Debug, Clone)]
pub struct FlowerTypeRepository {
    db: Arc<DatabaseConnection>,
}

impl FlowerTypeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Every flower, including ones no bouquet uses yet (count 0)
    pub async fn list_with_bouquet_count(&self) -> Result<Vec<FlowerTypeRow>, ServiceError> {
        Ok(FlowerType::find()
            .select_only()
            .column(Column::Id)
            .column(Column::Name)
            .column_as(
                Expr::col((
                    bouquet_flower_type::Entity,
                    bouquet_flower_type::Column::BouquetId,
                ))
                .count(),
                "bouquets_count",
            )
            .join(
                JoinType::LeftJoin,
                flower_type::Relation::BouquetFlowerType.def(),
            )
            .group_by(Column::Id)
            .group_by(Column::Name)
            .order_by_asc(Column::Name)
            .into_model::<FlowerTypeRow>()
            .all(&*self.db)
            .await?)
    }

    pub async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<flower_type::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(FlowerType::find()
            .filter(Column::Id.is_in(ids))
            .all(&*self.db)
            .await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<flower_type::Model>, ServiceError> {
        Ok(FlowerType::find()
            .filter(Column::Name.eq(name))
            .one(&*self.db)
            .await?)
    }

    pub async fn create(&self, name: String) -> Result<flower_type::Model, ServiceError> {
        Ok(flower_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }
}
