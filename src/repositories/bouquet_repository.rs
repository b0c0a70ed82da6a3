use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::bouquet::{self, Column, Entity as Bouquet};
use crate::entities::{bouquet_flower_type, bouquet_type, flower_type, order_item};
use crate::errors::ServiceError;

/// Fields of a bouquet about to be inserted
#[derive(Debug, Clone)]
pub struct NewBouquet {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub bouquet_type_id: Option<Uuid>,
    pub flower_type_ids: Vec<Uuid>,
}

/// Partial update; `None` leaves the column as it is
#[derive(Debug, Clone, Default)]
pub struct BouquetChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub bouquet_type_id: Option<Uuid>,
    /// Replaces every flower link when present
    pub flower_type_ids: Option<Vec<Uuid>>,
}

/// Storefront search filters. Empty id lists and missing bounds match everything.
#[derive(Debug, Clone, Default)]
pub struct BouquetFilter {
    pub bouquet_type_ids: Vec<Uuid>,
    pub flower_type_ids: Vec<Uuid>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct BouquetRepository {
    db: Arc<DatabaseConnection>,
}

impl BouquetRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// One query for all ids; missing and archived ids are simply absent from the result
    pub async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<bouquet::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Bouquet::find()
            .filter(Column::Id.is_in(ids))
            .filter(Column::IsActive.eq(true))
            .all(&*self.db)
            .await?)
    }

    /// Looks the bouquet up whether or not it is archived
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<bouquet::Model>, ServiceError> {
        Ok(Bouquet::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn find_active(&self, id: Uuid) -> Result<Option<bouquet::Model>, ServiceError> {
        Ok(Bouquet::find_by_id(id)
            .filter(Column::IsActive.eq(true))
            .one(&*self.db)
            .await?)
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<Vec<bouquet::Model>, ServiceError> {
        Ok(Bouquet::find()
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?)
    }

    /// Best sellers first, ties broken by views
    pub async fn popular(&self, limit: u64, offset: u64) -> Result<Vec<bouquet::Model>, ServiceError> {
        Ok(Bouquet::find()
            .filter(Column::IsActive.eq(true))
            .order_by_desc(Column::PurchaseCount)
            .order_by_desc(Column::ViewCount)
            .order_by_asc(Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?)
    }

    /// A bouquet matches the flower filter when it contains any of the listed flowers
    pub async fn search(
        &self,
        filter: &BouquetFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<bouquet::Model>, ServiceError> {
        let mut condition = Condition::all().add(Column::IsActive.eq(true));
        if !filter.bouquet_type_ids.is_empty() {
            condition = condition.add(Column::BouquetTypeId.is_in(filter.bouquet_type_ids.clone()));
        }
        if !filter.flower_type_ids.is_empty() {
            condition = condition.add(
                Column::Id.in_subquery(
                    Query::select()
                        .column(bouquet_flower_type::Column::BouquetId)
                        .from(bouquet_flower_type::Entity)
                        .and_where(
                            bouquet_flower_type::Column::FlowerTypeId
                                .is_in(filter.flower_type_ids.clone()),
                        )
                        .to_owned(),
                ),
            );
        }
        if let Some(min) = filter.price_min {
            condition = condition.add(Column::Price.gte(min));
        }
        if let Some(max) = filter.price_max {
            condition = condition.add(Column::Price.lte(max));
        }

        Ok(Bouquet::find()
            .filter(condition)
            .order_by_asc(Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?)
    }

    /// Inserts the bouquet and its flower links in one transaction
    pub async fn create(&self, new: NewBouquet) -> Result<bouquet::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let created = bouquet::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            quantity: Set(new.quantity),
            purchase_count: Set(0),
            view_count: Set(0),
            is_active: Set(true),
            bouquet_type_id: Set(new.bouquet_type_id),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;
        link_flowers(&txn, created.id, &new.flower_type_ids).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Returns `None` when the bouquet does not exist
    pub async fn update(
        &self,
        id: Uuid,
        changes: BouquetChanges,
    ) -> Result<Option<bouquet::Model>, ServiceError> {
        let txn = self.db.begin().await?;
        let Some(existing) = Bouquet::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active: bouquet::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(bouquet_type_id) = changes.bouquet_type_id {
            active.bouquet_type_id = Set(Some(bouquet_type_id));
        }
        let updated = active.update(&txn).await?;

        if let Some(flower_type_ids) = changes.flower_type_ids {
            bouquet_flower_type::Entity::delete_many()
                .filter(bouquet_flower_type::Column::BouquetId.eq(id))
                .exec(&txn)
                .await?;
            link_flowers(&txn, id, &flower_type_ids).await?;
        }

        txn.commit().await?;
        Ok(Some(updated))
    }

    /// Returns `None` when the bouquet does not exist
    pub async fn set_quantity(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<bouquet::Model>, ServiceError> {
        self.update(
            id,
            BouquetChanges {
                quantity: Some(quantity),
                ..Default::default()
            },
        )
        .await
    }

    /// Returns `None` when the bouquet does not exist
    pub async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<bouquet::Model>, ServiceError> {
        let Some(existing) = Bouquet::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        let mut active: bouquet::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        Ok(Some(active.update(&*self.db).await?))
    }

    /// Bumps `view_count` of an active bouquet; false when there is none
    pub async fn increment_view_count(&self, id: Uuid) -> Result<bool, ServiceError> {
        let result = Bouquet::update_many()
            .col_expr(Column::ViewCount, Expr::col(Column::ViewCount).add(1))
            .filter(Column::Id.eq(id))
            .filter(Column::IsActive.eq(true))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// How many order lines reference the bouquet
    pub async fn order_line_count(&self, id: Uuid) -> Result<u64, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::BouquetId.eq(id))
            .count(&*self.db)
            .await?)
    }

    /// Deletes the bouquet and, by cascade, its flower links; false when nothing was deleted
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let result = Bouquet::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn bouquet_type(
        &self,
        bouquet: &bouquet::Model,
    ) -> Result<Option<bouquet_type::Model>, ServiceError> {
        match bouquet.bouquet_type_id {
            Some(type_id) => Ok(bouquet_type::Entity::find_by_id(type_id)
                .one(&*self.db)
                .await?),
            None => Ok(None),
        }
    }

    pub async fn flower_types(&self, bouquet_id: Uuid) -> Result<Vec<flower_type::Model>, ServiceError> {
        Ok(flower_type::Entity::find()
            .filter(
                flower_type::Column::Id.in_subquery(
                    Query::select()
                        .column(bouquet_flower_type::Column::FlowerTypeId)
                        .from(bouquet_flower_type::Entity)
                        .and_where(bouquet_flower_type::Column::BouquetId.eq(bouquet_id))
                        .to_owned(),
                ),
            )
            .order_by_asc(flower_type::Column::Name)
            .all(&*self.db)
            .await?)
    }
}

async fn link_flowers<C: sea_orm::ConnectionTrait>(
    conn: &C,
    bouquet_id: Uuid,
    flower_type_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if flower_type_ids.is_empty() {
        return Ok(());
    }
    let links = flower_type_ids
        .iter()
        .map(|flower_type_id| bouquet_flower_type::ActiveModel {
            bouquet_id: Set(bouquet_id),
            flower_type_id: Set(*flower_type_id),
        });
    bouquet_flower_type::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
