use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog product. `quantity` is the stock available for new orders; archived
/// bouquets (`is_active = false`) stay in the table for past orders but are
/// hidden from the storefront.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bouquets")]
#[schema(as = Bouquet)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "1000.00")]
    pub price: Decimal,
    pub quantity: i32,
    pub purchase_count: i32,
    pub view_count: i32,
    pub is_active: bool,
    pub bouquet_type_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(
        belongs_to = "super::bouquet_type::Entity",
        from = "Column::BouquetTypeId",
        to = "super::bouquet_type::Column::Id",
        on_delete = "SetNull"
    )]
    BouquetType,
    #[sea_orm(has_many = "super::bouquet_flower_type::Entity")]
    BouquetFlowerType,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::bouquet_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BouquetType.def()
    }
}

impl Related<super::bouquet_flower_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BouquetFlowerType.def()
    }
}

impl Related<super::flower_type::Entity> for Entity {
    fn to() -> RelationDef {
        super::bouquet_flower_type::Relation::FlowerType.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::bouquet_flower_type::Relation::Bouquet.def().rev())
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        } else {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
