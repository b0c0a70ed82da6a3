use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Join row linking a bouquet to one of the flowers it contains
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bouquet_flower_types")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bouquet_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub flower_type_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bouquet::Entity",
        from = "Column::BouquetId",
        to = "super::bouquet::Column::Id",
        on_delete = "Cascade"
    )]
    Bouquet,
    #[sea_orm(
        belongs_to = "super::flower_type::Entity",
        from = "Column::FlowerTypeId",
        to = "super::flower_type::Column::Id",
        on_delete = "Cascade"
    )]
    FlowerType,
}

impl Related<super::bouquet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bouquet.def()
    }
}

impl Related<super::flower_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlowerType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
