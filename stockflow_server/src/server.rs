use std::time::Duration;

use actix_web::{dev::Server, error::JsonPayloadError, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use stockflow_engine::{OrderFlowApi, SqliteDatabase};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::notifications::create_notification_event_handlers,
    middleware::{AdminTokenMiddlewareFactory, HmacMiddlewareFactory},
    routes::{
        health,
        AwaitingPaymentRoute,
        CancelOrderRoute,
        CheckoutRoute,
        ExpireOrdersRoute,
        OrderByIdRoute,
        PaymentFailedWebhookRoute,
        PaymentWebhookRoute,
        QuoteRoute,
        RefundOrderRoute,
        UpdateOrderStatusRoute,
    },
};

const KEEP_ALIVE: Duration = Duration::from_secs(600);

/// Opens the database, starts the event handlers and the expiry worker, and serves requests until the server is
/// stopped.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🗃️ Database ready at {}", config.database_url);

    let handlers = create_notification_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers();

    let api = OrderFlowApi::new(db, config.checkout_config(), producers);
    let worker = start_expiry_worker(api.clone(), config.expiry_sweep_interval);
    let srv = create_server_instance(config, api)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("💻️ Server stopped. Waiting for the expiry worker to finish.");
    worker.stop().await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    api: OrderFlowApi<SqliteDatabase>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let webhook = config.webhook.clone();
    let admin_token = config.admin_token.clone();
    let srv = HttpServer::new(move || {
        let json_config = web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req| {
            debug!("💻️ Rejecting malformed request body. {err}");
            ServerError::InvalidRequestBody(err.to_string()).into()
        });
        let api_scope = web::scope("/api")
            .service(QuoteRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(AwaitingPaymentRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(&webhook.hmac_header, webhook.hmac_secret.clone(), webhook.hmac_checks))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(PaymentFailedWebhookRoute::<SqliteDatabase>::new());
        let admin_scope = web::scope("/admin")
            .wrap(AdminTokenMiddlewareFactory::new(admin_token.clone()))
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(RefundOrderRoute::<SqliteDatabase>::new())
            .service(ExpireOrdersRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(web::Data::new(api.clone()))
            .app_data(web::Data::new(options))
            .app_data(json_config)
            .service(health)
            .service(api_scope)
            .service(webhook_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(KEEP_ALIVE))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
