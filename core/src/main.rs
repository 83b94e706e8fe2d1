mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::{env_config::Config, nowpayments::PaymentGateway};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();
    let logger_enabled = config.console_logging_enabled;

    // init logger
    if logger_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    if config.nowpayments.api_key.is_empty() {
        log::warn!("NOWPAYMENTS_API_KEY is not set, invoice creation will fail");
    }
    if config.nowpayments.ipn_key.is_empty() && is_production {
        log::warn!("NOWPAYMENTS_IPN_KEY is not set, production webhooks will be rejected");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    // init payment gateway client
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        common::nowpayments::create_client(&config.nowpayments)
            .expect("Failed to create NOWPayments client"),
    );

    log::info!(
        "Starting payment service on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .wrap(limiter::global_middleware(config_data.rate_limit_per_second)) // 4th
            .wrap(logger::middleware(logger_enabled)) // 3rd
            .wrap(extractor::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api").service(
                    web::scope("/payments")
                        .service(api_pay::mount_webhook())
                        .service(api_pay::mount_pay().wrap(extractor::auth_middleware())),
                ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
