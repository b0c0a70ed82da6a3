//! Storefront catalog: flower and bouquet types, search, popularity, view
//! counting and the admin edit/archive/delete endpoints.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use flower_shop_api::entities::bouquet;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use uuid::Uuid;

async fn admin_post(app: &TestApp, uri: &str, body: Value) -> Value {
    let response = app.request_authenticated(Method::POST, uri, Some(body)).await;
    assert_eq!(response.status(), 201, "POST {uri}");
    response_json(response).await["data"].clone()
}

async fn create_type(app: &TestApp, uri: &str, name: &str) -> String {
    admin_post(app, uri, json!({ "name": name })).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn get_data(app: &TestApp, uri: &str) -> Value {
    let response = app.request(Method::GET, uri, None, None).await;
    assert_eq!(response.status(), 200, "GET {uri}");
    response_json(response).await["data"].clone()
}

fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect()
}

/// Roses (classic, rose) 1500, Mix (basket, rose + tulip) 3200, Tulips (classic, tulip) 900
struct Catalog {
    app: TestApp,
    classic: String,
    basket: String,
    rose: String,
    tulip: String,
    peony: String,
}

async fn seeded_catalog() -> Catalog {
    let app = TestApp::new().await;
    let classic = create_type(&app, "/api/v1/admin/bouquet-types", "Classic").await;
    let basket = create_type(&app, "/api/v1/admin/bouquet-types", "Basket").await;
    let rose = create_type(&app, "/api/v1/admin/flowers", "Rose").await;
    let tulip = create_type(&app, "/api/v1/admin/flowers", "Tulip").await;
    let peony = create_type(&app, "/api/v1/admin/flowers", "Peony").await;

    for (name, price, bouquet_type, flowers) in [
        ("Roses", "1500", &classic, vec![&rose]),
        ("Mix", "3200", &basket, vec![&rose, &tulip]),
        ("Tulips", "900", &classic, vec![&tulip]),
    ] {
        admin_post(
            &app,
            "/api/v1/admin/bouquets",
            json!({
                "name": name,
                "price": price,
                "quantity": 5,
                "bouquet_type_id": bouquet_type,
                "flower_type_ids": flowers,
            }),
        )
        .await;
    }

    Catalog {
        app,
        classic,
        basket,
        rose,
        tulip,
        peony,
    }
}

#[tokio::test]
async fn flowers_are_listed_with_bouquet_counts() {
    let catalog = seeded_catalog().await;

    let flowers = get_data(&catalog.app, "/api/v1/flowers").await;
    let counts: Vec<(&str, i64)> = flowers
        .as_array()
        .unwrap()
        .iter()
        .map(|f| (f["name"].as_str().unwrap(), f["bouquets_count"].as_i64().unwrap()))
        .collect();
    assert_eq!(counts, vec![("Peony", 0), ("Rose", 2), ("Tulip", 2)]);

    let types = get_data(&catalog.app, "/api/v1/bouquets/types").await;
    assert_eq!(names(&types), vec!["Basket", "Classic"]);

    let response = catalog
        .app
        .request_authenticated(
            Method::POST,
            "/api/v1/admin/flowers",
            Some(json!({ "name": "Rose" })),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn unknown_flower_or_type_ids_are_not_found() {
    let catalog = seeded_catalog().await;
    let missing = Uuid::new_v4();

    let response = catalog
        .app
        .request_authenticated(
            Method::POST,
            "/api/v1/admin/bouquets",
            Some(json!({
                "name": "Ghost",
                "price": "100",
                "quantity": 1,
                "flower_type_ids": [catalog.rose, missing],
            })),
        )
        .await;
    assert_eq!(response.status(), 404);
    let body = response_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(&missing.to_string()));
    assert!(!message.contains(&catalog.rose));

    let response = catalog
        .app
        .request_authenticated(
            Method::POST,
            "/api/v1/admin/bouquets",
            Some(json!({ "name": "Ghost", "price": "100", "quantity": 1, "bouquet_type_id": missing })),
        )
        .await;
    assert_eq!(response.status(), 404);

    assert_eq!(get_data(&catalog.app, "/api/v1/bouquets").await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_combines_type_flower_and_price_filters() {
    let catalog = seeded_catalog().await;
    let app = &catalog.app;

    let all = get_data(app, "/api/v1/bouquets/search").await;
    assert_eq!(names(&all), vec!["Mix", "Roses", "Tulips"]);

    let roses = get_data(app, &format!("/api/v1/bouquets/search?flower_type_ids={}", catalog.rose)).await;
    assert_eq!(names(&roses), vec!["Mix", "Roses"]);

    let any_of = get_data(
        app,
        &format!(
            "/api/v1/bouquets/search?flower_type_ids={},{}",
            catalog.peony, catalog.tulip
        ),
    )
    .await;
    assert_eq!(names(&any_of), vec!["Mix", "Tulips"]);

    let classic_with_tulips = get_data(
        app,
        &format!(
            "/api/v1/bouquets/search?bouquet_type_ids={}&flower_type_ids={}",
            catalog.classic, catalog.tulip
        ),
    )
    .await;
    assert_eq!(names(&classic_with_tulips), vec!["Tulips"]);

    let baskets = get_data(app, &format!("/api/v1/bouquets/search?bouquet_type_ids={}", catalog.basket)).await;
    assert_eq!(names(&baskets), vec!["Mix"]);

    let mid_range = get_data(app, "/api/v1/bouquets/search?price_min=1000&price_max=3200").await;
    assert_eq!(names(&mid_range), vec!["Mix", "Roses"]);

    let paged = get_data(app, "/api/v1/bouquets/search?limit=1&offset=1").await;
    assert_eq!(names(&paged), vec!["Roses"]);

    let response = app
        .request(Method::GET, "/api/v1/bouquets/search?price_min=500&price_max=100", None, None)
        .await;
    assert_eq!(response.status(), 400);
    let response = app
        .request(Method::GET, "/api/v1/bouquets/search?flower_type_ids=rose", None, None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn popular_orders_by_purchases_then_views() {
    let app = TestApp::new().await;
    for (name, purchases, views) in [("Daisies", 5, 0), ("Lilies", 5, 3), ("Orchids", 9, 0), ("Asters", 0, 50)] {
        let seeded = app.seed_bouquet(name, dec!(1000), 3).await;
        let mut active: bouquet::ActiveModel = seeded.into();
        active.purchase_count = Set(purchases);
        active.view_count = Set(views);
        active.update(&*app.state.db).await.unwrap();
    }

    let popular = get_data(&app, "/api/v1/bouquets/popular").await;
    assert_eq!(names(&popular), vec!["Orchids", "Lilies", "Daisies", "Asters"]);

    let page = get_data(&app, "/api/v1/bouquets/popular?limit=2&offset=1").await;
    assert_eq!(names(&page), vec!["Lilies", "Daisies"]);
}

#[tokio::test]
async fn product_page_counts_views_and_carries_type_and_flowers() {
    let catalog = seeded_catalog().await;
    let app = &catalog.app;
    let mix = get_data(app, &format!("/api/v1/bouquets/search?bouquet_type_ids={}", catalog.basket)).await[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let first = get_data(app, &format!("/api/v1/bouquets/{}", mix)).await;
    assert_eq!(first["view_count"], 1);
    assert_eq!(first["bouquet_type"]["name"], "Basket");
    let flowers: Vec<&str> = first["flower_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(flowers, vec!["Rose", "Tulip"]);

    let second = get_data(app, &format!("/api/v1/bouquets/{}", mix)).await;
    assert_eq!(second["view_count"], 2);

    // listings do not count as views
    get_data(app, "/api/v1/bouquets").await;
    let stored = app
        .state
        .services
        .catalog
        .get_bouquet(Uuid::parse_str(&mix).unwrap())
        .await
        .unwrap();
    assert_eq!(stored.view_count, 2);
}

#[tokio::test]
async fn partial_update_keeps_omitted_fields_and_replaces_flowers() {
    let catalog = seeded_catalog().await;
    let app = &catalog.app;
    let roses = app.seed_bouquet("Garden", dec!(1200), 4).await;

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/admin/bouquets/{}", roses.id),
            Some(json!({ "price": "1350.555", "flower_type_ids": [catalog.peony, catalog.peony] })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated = response_json(response).await["data"].clone();
    assert_eq!(updated["name"], "Garden");
    assert_eq!(updated["quantity"], 4);
    let price: Decimal = updated["price"].as_str().unwrap().parse().unwrap();
    assert_eq!(price, dec!(1350.56));

    let detail = get_data(app, &format!("/api/v1/bouquets/{}", roses.id)).await;
    assert_eq!(detail["flower_types"].as_array().unwrap().len(), 1);
    assert_eq!(detail["flower_types"][0]["name"], "Peony");

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/admin/bouquets/{}", roses.id),
            Some(json!({ "quantity": -2 })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/admin/bouquets/{}", roses.id),
            Some(json!({ "flower_type_ids": [Uuid::new_v4()] })),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/admin/bouquets/{}", Uuid::new_v4()),
            Some(json!({ "name": "Nobody" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn archived_bouquets_leave_the_storefront_and_cannot_be_ordered() {
    let app = TestApp::new().await;
    let lilies = app.seed_bouquet("Lilies", dec!(2000), 3).await;
    app.seed_bouquet("Asters", dec!(700), 3).await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/admin/bouquets/{}/archive", lilies.id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["is_active"], false);

    assert_eq!(names(&get_data(&app, "/api/v1/bouquets").await), vec!["Asters"]);
    assert_eq!(names(&get_data(&app, "/api/v1/bouquets/popular").await), vec!["Asters"]);
    let response = app
        .request(Method::GET, &format!("/api/v1/bouquets/{}", lilies.id), None, None)
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(common::order_payload(json!([{ "bouquet_id": lilies.id, "quantity": 1 }]))),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(app.row_counts().await, (0, 0, 0));

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/admin/bouquets/{}/archive", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn delete_is_refused_for_ordered_bouquets() {
    let app = TestApp::new().await;
    let ordered = app.seed_bouquet("Ordered", dec!(1000), 5).await;
    let spare = app.seed_bouquet("Spare", dec!(1000), 5).await;
    app.place_order(json!([{ "bouquet_id": ordered.id, "quantity": 1 }]))
        .await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/admin/bouquets/{}", ordered.id),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
    assert!(app.state.services.catalog.get_bouquet(ordered.id).await.is_ok());

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/admin/bouquets/{}", spare.id), None)
        .await;
    assert_eq!(response.status(), 204);
    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/admin/bouquets/{}", spare.id), None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn catalog_writes_need_the_catalog_permission() {
    let app = TestApp::new().await;
    let token = common::mint_token(&[], &["orders:read"], 3600);

    for (method, uri) in [
        (Method::POST, "/api/v1/admin/flowers".to_string()),
        (Method::POST, "/api/v1/admin/bouquet-types".to_string()),
        (Method::PATCH, format!("/api/v1/admin/bouquets/{}", Uuid::new_v4())),
        (Method::DELETE, format!("/api/v1/admin/bouquets/{}", Uuid::new_v4())),
    ] {
        let response = app
            .request(method.clone(), &uri, Some(json!({ "name": "x" })), Some(&token))
            .await;
        assert_eq!(response.status(), 403, "{method} {uri}");
    }
}
