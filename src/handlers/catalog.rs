use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::PageQuery;
use crate::entities::{bouquet, bouquet_type, flower_type};
use crate::errors::ServiceError;
use crate::repositories::{BouquetFilter, FlowerTypeRow};
use crate::services::{BouquetDetail, CreateBouquet, CreateCatalogType, UpdateBouquet};
use crate::{ApiResponse, ApiResult, AppState};

const DEFAULT_BOUQUET_PAGE_SIZE: u64 = 20;
const DEFAULT_POPULAR_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateStockRequest {
    pub quantity: i32,
}

/// Storefront search. Id lists are comma separated.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BouquetSearchQuery {
    /// Bouquet type ids, e.g. `bouquet_type_ids=<uuid>,<uuid>`
    pub bouquet_type_ids: Option<String>,
    /// Flower type ids; a bouquet matches when it contains any of them
    pub flower_type_ids: Option<String>,
    #[param(value_type = Option<String>)]
    pub price_min: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub price_max: Option<Decimal>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl BouquetSearchQuery {
    pub fn filter(&self) -> Result<BouquetFilter, ServiceError> {
        Ok(BouquetFilter {
            bouquet_type_ids: parse_id_list("bouquet_type_ids", self.bouquet_type_ids.as_deref())?,
            flower_type_ids: parse_id_list("flower_type_ids", self.flower_type_ids.as_deref())?,
            price_min: self.price_min,
            price_max: self.price_max,
        })
    }

    pub fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

fn parse_id_list(field: &str, raw: Option<&str>) -> Result<Vec<Uuid>, ServiceError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Uuid::parse_str(token).map_err(|_| {
                ServiceError::ValidationError(format!("{} contains an invalid id: {}", field, token))
            })
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/bouquets",
    summary = "List bouquets",
    params(PageQuery),
    responses((status = 200, description = "Bouquets retrieved", body = ApiResponse<Vec<bouquet::Model>>)),
    tag = "catalog"
)]
pub async fn list_bouquets(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<bouquet::Model>> {
    let bouquets = state
        .services
        .catalog
        .list_bouquets(page.limit_or(DEFAULT_BOUQUET_PAGE_SIZE), page.offset())
        .await?;
    Ok(Json(ApiResponse::success(bouquets)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bouquets/popular",
    summary = "Popular bouquets",
    description = "Most purchased first, then most viewed",
    params(PageQuery),
    responses((status = 200, description = "Bouquets retrieved", body = ApiResponse<Vec<bouquet::Model>>)),
    tag = "catalog"
)]
pub async fn popular_bouquets(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<bouquet::Model>> {
    let bouquets = state
        .services
        .catalog
        .popular_bouquets(page.limit_or(DEFAULT_POPULAR_PAGE_SIZE), page.offset())
        .await?;
    Ok(Json(ApiResponse::success(bouquets)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bouquets/search",
    summary = "Search bouquets",
    params(BouquetSearchQuery),
    responses(
        (status = 200, description = "Matching bouquets", body = ApiResponse<Vec<bouquet::Model>>),
        (status = 400, description = "Malformed filter", body = crate::errors::ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn search_bouquets(
    State(state): State<AppState>,
    Query(query): Query<BouquetSearchQuery>,
) -> ApiResult<Vec<bouquet::Model>> {
    let page = query.page();
    let bouquets = state
        .services
        .catalog
        .search_bouquets(
            query.filter()?,
            page.limit_or(DEFAULT_BOUQUET_PAGE_SIZE),
            page.offset(),
        )
        .await?;
    Ok(Json(ApiResponse::success(bouquets)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bouquets/{id}",
    summary = "Get bouquet",
    description = "Product page with type and flowers; counts one view",
    params(("id" = Uuid, Path, description = "Bouquet ID")),
    responses(
        (status = 200, description = "Bouquet retrieved", body = ApiResponse<BouquetDetail>),
        (status = 404, description = "Bouquet not found", body = crate::errors::ErrorResponse),
    ),
    tag = "catalog"
)]
pub async fn get_bouquet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BouquetDetail> {
    let bouquet = state.services.catalog.view_bouquet(id).await?;
    Ok(Json(ApiResponse::success(bouquet)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bouquets/types",
    summary = "List bouquet types",
    responses((status = 200, description = "Bouquet types", body = ApiResponse<Vec<bouquet_type::Model>>)),
    tag = "catalog"
)]
pub async fn list_bouquet_types(State(state): State<AppState>) -> ApiResult<Vec<bouquet_type::Model>> {
    let types = state.services.catalog.list_bouquet_types().await?;
    Ok(Json(ApiResponse::success(types)))
}

#[utoipa::path(
    get,
    path = "/api/v1/flowers",
    summary = "List flowers",
    description = "Every flower type with the number of bouquets containing it",
    responses((status = 200, description = "Flower types", body = ApiResponse<Vec<FlowerTypeRow>>)),
    tag = "catalog"
)]
pub async fn list_flowers(State(state): State<AppState>) -> ApiResult<Vec<FlowerTypeRow>> {
    let flowers = state.services.flowers.get_all().await?;
    Ok(Json(ApiResponse::success(flowers)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bouquets",
    summary = "Create bouquet",
    request_body = CreateBouquet,
    responses(
        (status = 201, description = "Bouquet created", body = ApiResponse<bouquet::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown bouquet or flower type", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn create_bouquet(
    State(state): State<AppState>,
    Json(request): Json<CreateBouquet>,
) -> Result<(StatusCode, Json<ApiResponse<bouquet::Model>>), ServiceError> {
    let bouquet = state.services.catalog.create_bouquet(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(bouquet))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/bouquets/{id}",
    summary = "Update bouquet",
    params(("id" = Uuid, Path, description = "Bouquet ID")),
    request_body = UpdateBouquet,
    responses(
        (status = 200, description = "Bouquet updated", body = ApiResponse<bouquet::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Bouquet or referenced type not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn update_bouquet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBouquet>,
) -> ApiResult<bouquet::Model> {
    let bouquet = state.services.catalog.update_bouquet(id, request).await?;
    Ok(Json(ApiResponse::success(bouquet)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/bouquets/{id}/stock",
    summary = "Set bouquet stock",
    params(("id" = Uuid, Path, description = "Bouquet ID")),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<bouquet::Model>),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Bouquet not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStockRequest>,
) -> ApiResult<bouquet::Model> {
    let bouquet = state
        .services
        .catalog
        .update_stock(id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(bouquet)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bouquets/{id}/archive",
    summary = "Archive bouquet",
    description = "Hides the bouquet from the storefront and new orders; past orders keep it",
    params(("id" = Uuid, Path, description = "Bouquet ID")),
    responses(
        (status = 200, description = "Bouquet archived", body = ApiResponse<bouquet::Model>),
        (status = 404, description = "Bouquet not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn archive_bouquet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bouquet::Model> {
    let bouquet = state.services.catalog.archive_bouquet(id).await?;
    Ok(Json(ApiResponse::success(bouquet)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/bouquets/{id}",
    summary = "Delete bouquet",
    params(("id" = Uuid, Path, description = "Bouquet ID")),
    responses(
        (status = 204, description = "Bouquet deleted"),
        (status = 404, description = "Bouquet not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Bouquet appears on orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_bouquet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.catalog.delete_bouquet(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bouquet-types",
    summary = "Create bouquet type",
    request_body = CreateCatalogType,
    responses(
        (status = 201, description = "Bouquet type created", body = ApiResponse<bouquet_type::Model>),
        (status = 400, description = "Blank name", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn create_bouquet_type(
    State(state): State<AppState>,
    Json(request): Json<CreateCatalogType>,
) -> Result<(StatusCode, Json<ApiResponse<bouquet_type::Model>>), ServiceError> {
    let created = state.services.catalog.create_bouquet_type(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/flowers",
    summary = "Create flower type",
    request_body = CreateCatalogType,
    responses(
        (status = 201, description = "Flower type created", body = ApiResponse<flower_type::Model>),
        (status = 400, description = "Blank name", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn create_flower_type(
    State(state): State<AppState>,
    Json(request): Json<CreateCatalogType>,
) -> Result<(StatusCode, Json<ApiResponse<flower_type::Model>>), ServiceError> {
    let created = state.services.flowers.create_flower_type(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn id_lists_are_comma_separated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let query = BouquetSearchQuery {
            flower_type_ids: Some(format!("{}, {},", a, b)),
            price_max: Some(dec!(3000)),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.bouquet_type_ids.is_empty());
        assert_eq!(filter.flower_type_ids, vec![a, b]);
        assert_eq!(filter.price_max, Some(dec!(3000)));
    }

    #[test]
    fn malformed_ids_are_a_validation_error() {
        let query = BouquetSearchQuery {
            bouquet_type_ids: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert_matches!(query.filter(), Err(ServiceError::ValidationError(msg)) if msg.contains("bouquet_type_ids"));
    }
}
