//! End-to-end tests against the full router with an in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use bazaar_api::auth::Role;
use bazaar_api::distance::{DistanceError, DistanceProvider};
use bazaar_api::{build_router, ApiConfig, AppState};
use bazaar_core::{GeoPoint, RouteEstimate};
use bazaar_db::{Database, DbConfig};

const TENANT: &str = "tenant-1";

/// Every address is 5 km and 15 minutes from the store.
struct FixedRoute;

#[async_trait]
impl DistanceProvider for FixedRoute {
    async fn route(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
    ) -> Result<RouteEstimate, DistanceError> {
        Ok(RouteEstimate {
            distance_meters: 5000,
            duration_seconds: 900,
        })
    }
}

struct TestApp {
    router: Router,
    admin: String,
    user: String,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// An app configured with extra environment values.
    async fn with_env(env: &[(&str, &str)]) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig::from_lookup(|key| {
            if key == "JWT_SECRET" {
                return Some("test-secret".to_string());
            }
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();

        let state = Arc::new(AppState::new(db, config, Arc::new(FixedRoute)));
        let admin = state
            .jwt
            .generate_access_token("admin-1", TENANT, Role::Admin)
            .unwrap();
        let user = state
            .jwt
            .generate_access_token("user-1", TENANT, Role::User)
            .unwrap();

        TestApp {
            router: build_router(state),
            admin,
            user,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_product(&self, code: &str, price_cents: i64) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/admin/products",
                Some(&self.admin),
                Some(json!({
                    "name": format!("Product {code}"),
                    "productCode": code,
                    "priceCents": price_cents,
                    "gstBps": 500
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn add_to_cart(&self, product_id: &str, quantity: i64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/cart/update",
            Some(&self.user),
            Some(json!({ "items": [{ "productId": product_id, "quantity": quantity }] })),
        )
        .await
    }

    async fn create_address(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/addresses",
                Some(&self.user),
                Some(json!({
                    "label": "Home",
                    "line": "12 MG Road",
                    "latitude": 12.98,
                    "longitude": 77.6
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_negotiate_offer(&self, product_id: &str, floor_cents: i64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/admin/offers",
            Some(&self.admin),
            Some(json!({
                "terms": {
                    "type": "negotiate",
                    "successBps": 1000,
                    "failureBps": 500,
                    "items": [{ "productId": product_id, "floorPriceCents": floor_cents }]
                }
            })),
        )
        .await
    }

    /// Places an order for whatever is in the cart; returns the order number.
    async fn place_order(&self) -> String {
        let address = self.create_address().await;
        let (status, body) = self
            .send(
                Method::POST,
                "/orders",
                Some(&self.user),
                Some(json!({ "addressId": address })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["orderNumber"].as_str().unwrap().to_string()
    }

    async fn set_order_status(&self, number: &str, status: &str) -> (StatusCode, Value) {
        self.send(
            Method::PATCH,
            &format!("/admin/orders/{number}/status"),
            Some(&self.admin),
            Some(json!({ "status": status })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_reports_database_and_migrations() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["database"], "ok");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/cart", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_admin_routes_reject_users() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/admin/coupons", Some(&app.user), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cart_prices_items_with_tax_and_platform_fee() {
    let app = TestApp::new().await;
    let product = app.create_product("RICE-5KG", 10000).await;

    let (status, body) = app.add_to_cart(&product, 2).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app.send(Method::GET, "/cart", Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK);

    let cart = &body["data"]["cart"];
    assert_eq!(cart["subtotalCents"], 20000);
    assert_eq!(cart["taxCents"], 1000);
    assert_eq!(cart["deliveryFeeCents"], 0);
    assert_eq!(cart["platformFeeCents"], 500);
    assert_eq!(cart["totalCents"], 21500);
    assert_eq!(cart["items"][0]["unitPriceCents"], 10000);
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.add_to_cart("missing-product", 1).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_cart_count_and_clear() {
    let app = TestApp::new().await;
    let rice = app.create_product("RICE", 10000).await;
    let dal = app.create_product("DAL", 5000).await;
    app.add_to_cart(&rice, 1).await;
    app.add_to_cart(&dal, 3).await;

    let (_, body) = app
        .send(Method::GET, "/cart/count", Some(&app.user), None)
        .await;
    assert_eq!(body["data"]["count"], 2);

    let (status, _) = app
        .send(Method::DELETE, "/cart/removeall", Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, "/cart/count", Some(&app.user), None)
        .await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_product_in_two_catalog_offers_conflicts() {
    let app = TestApp::new().await;
    let product = app.create_product("OIL-1L", 20000).await;

    let discount = json!({
        "terms": { "type": "discount", "items": [{ "productId": product, "discountBps": 1000 }] }
    });
    let (status, body) = app
        .send(Method::POST, "/admin/offers", Some(&app.admin), Some(discount))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let mrp = json!({
        "terms": { "type": "mrp", "items": [{ "productId": product, "mrpReductionCents": 500 }] }
    });
    let (status, body) = app
        .send(Method::POST, "/admin/offers", Some(&app.admin), Some(mrp))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn test_negotiated_price_flows_into_cart() {
    let app = TestApp::new().await;
    let product = app.create_product("GHEE", 10000).await;

    let offer = json!({
        "terms": {
            "type": "negotiate",
            "successBps": 1000,
            "failureBps": 500,
            "maxAttempts": 2,
            "items": [{ "productId": product, "floorPriceCents": 8000 }]
        }
    });
    let (status, body) = app
        .send(Method::POST, "/admin/offers", Some(&app.admin), Some(offer))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            "/offers/negotiate",
            Some(&app.user),
            Some(json!({ "productId": product, "amountCents": 9000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["outcome"], "accepted");
    assert_eq!(body["data"]["resultingPriceCents"], 9000);
    assert_eq!(body["data"]["remainingAttempts"], 1);

    app.add_to_cart(&product, 1).await;
    let (_, body) = app.send(Method::GET, "/cart", Some(&app.user), None).await;
    let cart = &body["data"]["cart"];
    assert_eq!(cart["items"][0]["unitPriceCents"], 9000);
    // 9000 + 450 GST + 500 platform
    assert_eq!(cart["totalCents"], 9950);

    // Below the floor: 5% off the last negotiated price
    let (status, body) = app
        .send(
            Method::POST,
            "/offers/negotiate",
            Some(&app.user),
            Some(json!({ "productId": product, "amountCents": 1000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["outcome"], "rejected");
    assert_eq!(body["data"]["resultingPriceCents"], 8550);

    let (status, _) = app
        .send(
            Method::POST,
            "/offers/negotiate",
            Some(&app.user),
            Some(json!({ "productId": product, "amountCents": 9000 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_negotiating_without_offer_is_rejected() {
    let app = TestApp::new().await;
    let product = app.create_product("SALT", 2000).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/offers/negotiate",
            Some(&app.user),
            Some(json!({ "productId": product, "amountCents": 1500 })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_place_order_completes_cart() {
    let app = TestApp::new().await;
    let product = app.create_product("ATTA-10KG", 10000).await;
    let address = app.create_address().await;
    app.add_to_cart(&product, 2).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/orders",
            Some(&app.user),
            Some(json!({ "addressId": address, "paymentMethod": "cash_on_delivery" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let order = &body["data"];
    assert_eq!(order["deliveryFeeCents"], 5000);
    assert_eq!(order["totalCents"], 26500);
    assert_eq!(order["paymentMethod"], "cash_on_delivery");
    let number = order["orderNumber"].as_str().unwrap().to_string();
    assert!(number.starts_with("ORD-"));

    let (status, body) = app
        .send(Method::GET, &format!("/orders/{number}"), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderNumber"], number.as_str());

    // The completed cart is no longer active
    let (_, body) = app.send(Method::GET, "/cart", Some(&app.user), None).await;
    assert_eq!(body["message"], "Cart is empty");

    let (status, body) = app
        .send(
            Method::POST,
            "/orders",
            Some(&app.user),
            Some(json!({ "addressId": address })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
}

#[tokio::test]
async fn test_place_order_with_unknown_address_is_not_found() {
    let app = TestApp::new().await;
    let product = app.create_product("TEA", 3000).await;
    app.add_to_cart(&product, 1).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/orders",
            Some(&app.user),
            Some(json!({ "addressId": "no-such-address" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_coupon_discount_applies_when_requested() {
    let app = TestApp::new().await;
    let product = app.create_product("COFFEE", 10000).await;
    app.add_to_cart(&product, 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/admin/coupons",
            Some(&app.admin),
            Some(json!({
                "code": "save10",
                "discountBps": 1000,
                "minPriceCents": 0,
                "maxPriceCents": 100000
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["code"], "SAVE10");
    let coupon = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/cart?couponId={coupon}"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["cart"]["couponDiscountCents"].as_i64().unwrap() > 0);
    assert_eq!(body["data"]["cart"]["couponId"], coupon.as_str());
}

#[tokio::test]
async fn test_removing_last_line_zeroes_amounts() {
    let app = TestApp::new().await;
    let product = app.create_product("JAGGERY", 10000).await;
    app.add_to_cart(&product, 2).await;

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/cart/remove-product/{product}"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let cart = &body["data"]["cart"];
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(cart["subtotalCents"], 0);
    assert_eq!(cart["taxCents"], 0);
    assert_eq!(cart["totalCents"], 0);
}

#[tokio::test]
async fn test_deleted_product_blocks_mutation_without_changing_cart() {
    let app = TestApp::new().await;
    let rice = app.create_product("RICE-1KG", 10000).await;
    let dal = app.create_product("DAL-1KG", 5000).await;
    app.add_to_cart(&rice, 1).await;
    app.add_to_cart(&dal, 1).await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/admin/products/{dal}"),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/cart/updatequantity",
            Some(&app.user),
            Some(json!({ "productId": rice, "quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (_, body) = app
        .send(Method::GET, "/cart/count", Some(&app.user), None)
        .await;
    assert_eq!(body["data"]["count"], 2);

    // Dropping the deleted line prices the rest; rice kept its quantity
    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/cart/remove-product/{dal}"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart = &body["data"]["cart"];
    assert_eq!(cart["items"][0]["quantity"], 1);
    assert_eq!(cart["subtotalCents"], 10000);
}

#[tokio::test]
async fn test_deleted_address_reprices_without_delivery() {
    let app = TestApp::new().await;
    let product = app.create_product("POHA", 10000).await;
    let address = app.create_address().await;
    app.add_to_cart(&product, 1).await;

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/cart?addressId={address}"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cart"]["deliveryFeeCents"], 5000);
    assert_eq!(body["data"]["cart"]["addressId"], address.as_str());

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/addresses/{address}"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/cart", Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart = &body["data"]["cart"];
    assert_eq!(cart["deliveryFeeCents"], 0);
    assert_eq!(cart["distanceMeters"], 0);
    assert_eq!(cart["durationSeconds"], 0);
    assert!(cart["addressId"].is_null());
    assert_eq!(body["data"]["deliveryMinutes"], 0);
}

#[tokio::test]
async fn test_delivery_fee_and_free_delivery_threshold() {
    let app = TestApp::with_env(&[("FREE_DELIVERY_THRESHOLD_CENTS", "15000")]).await;
    let product = app.create_product("FLOUR", 10000).await;
    let address = app.create_address().await;
    app.add_to_cart(&product, 1).await;

    let uri = format!("/cart?addressId={address}");

    // 5 km at ₹10/km, below the threshold
    let (status, body) = app.send(Method::GET, &uri, Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart = &body["data"]["cart"];
    assert_eq!(cart["deliveryFeeCents"], 5000);
    assert_eq!(cart["distanceMeters"], 5000);
    assert_eq!(cart["durationSeconds"], 900);
    assert_eq!(body["data"]["deliveryMinutes"], 15);
    // 10000 + 500 GST + 5000 delivery + 500 platform
    assert_eq!(cart["totalCents"], 16000);

    // Subtotal 20000 reaches the threshold
    app.add_to_cart(&product, 2).await;
    let (status, body) = app.send(Method::GET, &uri, Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart = &body["data"]["cart"];
    assert_eq!(cart["subtotalCents"], 20000);
    assert_eq!(cart["deliveryFeeCents"], 0);
    assert_eq!(cart["distanceMeters"], 5000);
}

#[tokio::test]
async fn test_negotiate_floor_above_price_is_rejected() {
    let app = TestApp::new().await;
    let product = app.create_product("HONEY", 10000).await;

    let (status, body) = app.create_negotiate_offer(&product, 15000).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = app.create_negotiate_offer(&product, 10000).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let offer = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/admin/offers/{offer}/items"),
            Some(&app.admin),
            Some(json!({
                "items": [{ "type": "negotiate", "productId": product, "floorPriceCents": 12000 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
}

#[tokio::test]
async fn test_negotiated_price_never_exceeds_list_price() {
    let app = TestApp::new().await;
    let product = app.create_product("CASHEW", 10000).await;
    let (status, body) = app.create_negotiate_offer(&product, 10000).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    // The product gets cheaper after the offer was set up
    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/admin/products/{product}"),
            Some(&app.admin),
            Some(json!({ "priceCents": 8000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            "/offers/negotiate",
            Some(&app.user),
            Some(json!({ "productId": product, "amountCents": 20000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["resultingPriceCents"], 8000);
}

#[tokio::test]
async fn test_price_above_maximum_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/admin/products",
            Some(&app.admin),
            Some(json!({
                "name": "Gold Bar",
                "productCode": "GOLD",
                "priceCents": i64::MAX / 2,
                "gstBps": 300
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn test_admin_moves_order_through_fulfilment() {
    let app = TestApp::new().await;
    let product = app.create_product("BREAD", 4000).await;
    app.add_to_cart(&product, 1).await;
    let number = app.place_order().await;

    let (status, body) = app
        .send(Method::GET, "/admin/orders?status=pending", Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Skipping ahead is not allowed
    let (status, body) = app.set_order_status(&number, "delivered").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    for next in ["accepted", "picked", "delivered"] {
        let (status, body) = app.set_order_status(&number, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, _) = app.set_order_status(&number, "cancelled").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = app
        .send(Method::GET, &format!("/orders/{number}"), Some(&app.user), None)
        .await;
    assert_eq!(body["data"]["status"], "delivered");

    // Users cannot change status
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/admin/orders/{number}/status"),
            Some(&app.user),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_cancels_only_pending_orders() {
    let app = TestApp::new().await;
    let product = app.create_product("MILK", 3000).await;

    app.add_to_cart(&product, 1).await;
    let pending = app.place_order().await;
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/orders/{pending}/cancel"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    app.add_to_cart(&product, 1).await;
    let accepted = app.place_order().await;
    let (status, _) = app.set_order_status(&accepted, "accepted").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/orders/{accepted}/cancel"),
            Some(&app.user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, _) = app
        .send(Method::POST, "/orders/ORD-NOSUCH/cancel", Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorites_add_list_remove() {
    let app = TestApp::new().await;
    let product = app.create_product("SAFFRON", 50000).await;

    for _ in 0..2 {
        let (status, body) = app
            .send(
                Method::POST,
                "/favorites",
                Some(&app.user),
                Some(json!({ "productId": product })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = app
        .send(Method::GET, "/favorites", Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let favorites = body["data"].as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["id"], product.as_str());

    let (status, _) = app
        .send(
            Method::POST,
            "/favorites",
            Some(&app.user),
            Some(json!({ "productId": "no-such-product" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/favorites/{product}");
    let (status, _) = app.send(Method::DELETE, &uri, Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&app.user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app
        .send(Method::GET, "/favorites", Some(&app.user), None)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
