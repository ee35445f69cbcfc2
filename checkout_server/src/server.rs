use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderAnnulledEvent, OrderConfirmedEvent},
    traits::NotificationService,
    CartApi,
    CheckoutApi,
    InventoryApi,
    OrderLifecycleApi,
    SqliteDatabase,
    VerificationApi,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{RestAddressBook, RestNotificationService, RestPaymentGateway},
    routes::{
        add_cart_item,
        adjust_stock,
        admin_get_order,
        apply_coupon,
        approve_cancellation,
        checkout,
        checkout_single,
        clear_cart,
        get_cart,
        get_order,
        get_order_timeline,
        get_product,
        health,
        record_refund,
        remove_cart_item,
        remove_coupon,
        request_cancellation,
        set_shipping,
        transition_order,
        update_cart_item,
        verify_payment,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = start_event_handlers(&config).await?;
    start_expiry_worker(db.clone(), config.pricing.clone(), config.cart_expiry_interval_secs);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires up the event side-effects and starts the handler tasks, returning the producer set to hand to the API
/// objects. Notification delivery is strictly post-commit: a failure here is logged and never propagated into
/// the payment flow.
async fn start_event_handlers(config: &ServerConfig) -> Result<EventProducers, ServerError> {
    let mut hooks = EventHooks::default();
    if config.notifier.base_url.is_empty() {
        warn!("📧️ CHECKOUT_NOTIFIER_URL is not set. Order confirmation messages will not be sent.");
    } else {
        let svc = RestNotificationService::new(&config.notifier)?;
        hooks.on_order_confirmed(move |ev: OrderConfirmedEvent| {
            let svc = svc.clone();
            Box::pin(async move {
                let order = ev.order;
                if order.customer_email.is_empty() {
                    debug!("📧️ Order {} has no customer email on file. Skipping confirmation message.", order.id);
                    return;
                }
                match svc.send_order_confirmation(&order.customer_email, &order.customer_name, &order).await {
                    Ok(id) => debug!("📧️ Confirmation for order {} queued as {id}", order.id),
                    Err(e) => warn!("📧️ Could not send confirmation for order {}. {e}", order.id),
                }
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        hooks.on_order_annulled(move |ev: OrderAnnulledEvent| {
            Box::pin(async move {
                info!("📧️ Order {} was annulled ({})", ev.order.id, ev.order.status);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    Ok(producers)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway = RestPaymentGateway::new(&config.gateway)?;
    let address_book = RestAddressBook::new(&config.profiles)?;
    let app_config = config.clone();
    let srv = HttpServer::new(move || {
        let carts_api = CartApi::new(db.clone(), app_config.pricing.clone());
        let checkout_api =
            CheckoutApi::new(db.clone(), gateway.clone(), address_book.clone(), app_config.pricing.clone());
        let verify_api =
            VerificationApi::new(db.clone(), app_config.callback_secret.clone(), producers.clone());
        let orders_api = OrderLifecycleApi::new(db.clone(), producers.clone());
        let inventory_api = InventoryApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("checkout::access_log"))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(carts_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(verify_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api))
            .service(health)
            .service(get_cart)
            .service(add_cart_item)
            .service(update_cart_item)
            .service(remove_cart_item)
            .service(clear_cart)
            .service(apply_coupon)
            .service(remove_coupon)
            .service(set_shipping)
            .service(checkout)
            .service(checkout_single)
            .service(verify_payment)
            .service(get_order)
            .service(get_order_timeline)
            .service(request_cancellation)
            .service(admin_get_order)
            .service(transition_order)
            .service(approve_cancellation)
            .service(record_refund)
            .service(get_product)
            .service(adjust_stock)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
