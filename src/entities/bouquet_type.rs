use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of arrangement (basket, box, classic bouquet). A bouquet has at most one.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bouquet_types")]
#[schema(as = BouquetType)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bouquet::Entity")]
    Bouquet,
}

impl Related<super::bouquet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bouquet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
