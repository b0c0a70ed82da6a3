use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "flower_types")]
#[schema(as = FlowerType)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bouquet_flower_type::Entity")]
    BouquetFlowerType,
}

impl Related<super::bouquet_flower_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BouquetFlowerType.def()
    }
}

impl Related<super::bouquet::Entity> for Entity {
    fn to() -> RelationDef {
        super::bouquet_flower_type::Relation::Bouquet.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::bouquet_flower_type::Relation::FlowerType.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
