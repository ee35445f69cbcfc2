//! Request handlers.
//!
//! Handlers stay thin: they extract the caller's identity, hand the work to the matching engine API object, and
//! let [`ServerError`](crate::errors::ServerError) translate failures into HTTP responses. Customer routes act on
//! the authenticated owner only; fulfilment and catalog routes extract [`AdminUser`] instead and refuse callers
//! without the proxy's admin assertion.

use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse};
use checkout_engine::{
    db_types::NewCoupon,
    traits::{CheckoutDatabase, CheckoutError, InventoryError, OrderLifecycleError},
    CartApi,
    CheckoutApi,
    CheckoutRequest,
    InventoryApi,
    OrderLifecycleApi,
    SqliteDatabase,
    VerificationApi,
};
use log::*;
use serde_json::json;

use crate::{
    auth::{AdminUser, AuthenticatedCustomer},
    config::ServerConfig,
    data_objects::{
        AddItemRequest,
        BuyNowRequest,
        CancelRequest,
        RefundRequest,
        ShippingRequest,
        StockAdjustment,
        TransitionRequest,
        UpdateQuantityRequest,
        VerifyPaymentRequest,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{RestAddressBook, RestPaymentGateway},
};

type Carts = web::Data<CartApi<SqliteDatabase>>;
type Checkout = web::Data<CheckoutApi<SqliteDatabase, RestPaymentGateway, RestAddressBook>>;
type Verifier = web::Data<VerificationApi<SqliteDatabase>>;
type Orders = web::Data<OrderLifecycleApi<SqliteDatabase>>;
type Inventory = web::Data<InventoryApi<SqliteDatabase>>;

// ----------------------------------------------   Health   ----------------------------------------------------------

#[get("/health")]
pub async fn health() -> HttpResponse {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------    Cart    ----------------------------------------------------------

#[get("/cart")]
pub async fn get_cart(customer: AuthenticatedCustomer, carts: Carts) -> Result<HttpResponse, ServerError> {
    let cart = carts.cart(customer.owner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[post("/cart/items")]
pub async fn add_cart_item(
    customer: AuthenticatedCustomer,
    body: web::Json<AddItemRequest>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let cart = carts.add_item(customer.owner(), req.product_id, req.quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[patch("/cart/items/{product_id}")]
pub async fn update_cart_item(
    customer: AuthenticatedCustomer,
    path: web::Path<i64>,
    body: web::Json<UpdateQuantityRequest>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let cart = carts.update_item_quantity(customer.owner(), product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[delete("/cart/items/{product_id}")]
pub async fn remove_cart_item(
    customer: AuthenticatedCustomer,
    path: web::Path<i64>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let cart = carts.remove_item(customer.owner(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[delete("/cart")]
pub async fn clear_cart(customer: AuthenticatedCustomer, carts: Carts) -> Result<HttpResponse, ServerError> {
    let cart = carts.clear(customer.owner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[post("/cart/coupons")]
pub async fn apply_coupon(
    customer: AuthenticatedCustomer,
    body: web::Json<NewCoupon>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let cart = carts.apply_coupon(customer.owner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[delete("/cart/coupons/{code}")]
pub async fn remove_coupon(
    customer: AuthenticatedCustomer,
    path: web::Path<String>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let cart = carts.remove_coupon(customer.owner(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

#[post("/cart/shipping")]
pub async fn set_shipping(
    customer: AuthenticatedCustomer,
    body: web::Json<ShippingRequest>,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let cart = carts.set_shipping(customer.owner(), body.method).await?;
    Ok(HttpResponse::Ok().json(cart))
}

// ----------------------------------------------  Checkout   ----------------------------------------------------------

#[post("/checkout")]
pub async fn checkout(
    customer: AuthenticatedCustomer,
    body: web::Json<CheckoutRequest>,
    api: Checkout,
) -> Result<HttpResponse, ServerError> {
    let result = api.checkout(customer.profile(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(result))
}

#[post("/checkout/single")]
pub async fn checkout_single(
    customer: AuthenticatedCustomer,
    body: web::Json<BuyNowRequest>,
    api: Checkout,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let result = api.checkout_single_item(customer.profile(), req.product_id, req.quantity, req.details).await?;
    Ok(HttpResponse::Created().json(result))
}

#[post("/checkout/verify")]
pub async fn verify_payment(
    req: HttpRequest,
    customer: AuthenticatedCustomer,
    body: web::Json<VerifyPaymentRequest>,
    verifier: Verifier,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let payload = body.into_inner();
    let result = verifier
        .verify_payment(
            customer.owner(),
            payload.order_id,
            &payload.gateway_order_id,
            &payload.gateway_payment_id,
            &payload.signature,
        )
        .await;
    if matches!(result, Err(CheckoutError::SignatureMismatch)) {
        let ip = get_remote_ip(&req, config.use_x_forwarded_for, config.use_forwarded)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        warn!("🔐️ Rejected payment callback with a bad signature for order {} from {ip}", payload.order_id);
    }
    let (order, newly_confirmed) = result?;
    Ok(HttpResponse::Ok().json(json!({"order": order, "newly_confirmed": newly_confirmed})))
}

// ----------------------------------------------   Orders    ----------------------------------------------------------

#[get("/orders/{id}")]
pub async fn get_order(
    customer: AuthenticatedCustomer,
    path: web::Path<i64>,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let order = db.fetch_order(path.into_inner(), customer.owner()).await?;
    match order {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(CheckoutError::OrderNotFound.into()),
    }
}

#[get("/orders/{id}/timeline")]
pub async fn get_order_timeline(
    customer: AuthenticatedCustomer,
    path: web::Path<i64>,
    db: web::Data<SqliteDatabase>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    // ownership check first, so other customers' timelines are indistinguishable from absent ones
    if db.fetch_order(order_id, customer.owner()).await?.is_none() {
        return Err(CheckoutError::OrderNotFound.into());
    }
    let timeline = orders.timeline(order_id).await?;
    Ok(HttpResponse::Ok().json(timeline))
}

#[post("/orders/{id}/cancel")]
pub async fn request_cancellation(
    customer: AuthenticatedCustomer,
    path: web::Path<i64>,
    body: web::Json<CancelRequest>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let order = orders.request_cancellation(path.into_inner(), customer.owner(), &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

// ----------------------------------------------    Admin    ----------------------------------------------------------

#[get("/admin/orders/{id}")]
pub async fn admin_get_order(
    _admin: AdminUser,
    path: web::Path<i64>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let order = orders.order(order_id).await?.ok_or(OrderLifecycleError::OrderNotFound(order_id))?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{id}/status")]
pub async fn transition_order(
    admin: AdminUser,
    path: web::Path<i64>,
    body: web::Json<TransitionRequest>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let actor = admin.0.owner.to_string();
    let order = orders.advance_status(path.into_inner(), req.to, &req.note, &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{id}/cancel/approve")]
pub async fn approve_cancellation(
    _admin: AdminUser,
    path: web::Path<i64>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let order = orders.approve_cancellation(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[post("/orders/{id}/refund")]
pub async fn record_refund(
    _admin: AdminUser,
    path: web::Path<i64>,
    body: web::Json<RefundRequest>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let order = orders.record_refund(path.into_inner(), body.amount).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[get("/admin/products/{id}")]
pub async fn get_product(
    _admin: AdminUser,
    path: web::Path<i64>,
    inventory: Inventory,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let product = inventory.product(product_id).await?.ok_or(InventoryError::ProductNotFound(product_id))?;
    Ok(HttpResponse::Ok().json(product))
}

#[post("/admin/products/{id}/stock")]
pub async fn adjust_stock(
    _admin: AdminUser,
    path: web::Path<i64>,
    body: web::Json<StockAdjustment>,
    inventory: Inventory,
) -> Result<HttpResponse, ServerError> {
    let product = inventory.adjust_stock(path.into_inner(), body.delta).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[cfg(test)]
mod test {
    use actix_web::{test, App};

    use super::*;

    #[actix_web::test]
    async fn health_answers_without_credentials() {
        let app = test::init_service(App::new().service(health)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let response = test::call_service(&app, req).await;
        assert!(response.status().is_success());
    }
}
