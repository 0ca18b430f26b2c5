mod config;
mod errors;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;

use models::common::GatewayKind;
use services::{
    checkout::CheckoutService, database::DatabaseService, gateway::GatewayRegistry,
    notify::NotificationService, otp::OtpService, phonepe::PhonePeGateway,
    razorpay::RazorpayGateway, token::TokenService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env().expect("Failed to load configuration");

    let database_service = DatabaseService::new(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let notifier = NotificationService::new();
    let otp_service = OtpService::new(
        database_service.clone(),
        notifier.clone(),
        config.auth.otp_ttl_secs,
    );
    let token_service = TokenService::new(&config.auth);

    let phonepe = PhonePeGateway::new(config.phonepe.clone(), config.app.gateway_timeout_secs)
        .expect("Failed to build PhonePe client");
    let razorpay = RazorpayGateway::new(config.razorpay.clone(), config.app.gateway_timeout_secs)
        .expect("Failed to build Razorpay client");
    let default_gateway =
        GatewayKind::parse(&config.app.default_gateway).expect("Unknown DEFAULT_GATEWAY");
    let checkout_service = CheckoutService::new(
        database_service.clone(),
        GatewayRegistry::new(phonepe, razorpay),
        notifier.clone(),
        default_gateway,
    );

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    println!("🚀 Starting Substore API on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(database_service.clone()))
            .app_data(web::Data::new(otp_service.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(checkout_service.clone()))
            .service(
                web::scope("/api/v1")
                    // OTP + token exchange
                    .service(
                        web::scope("/auth")
                            .service(handlers::auth::send_otp)
                            .service(handlers::auth::signup)
                            .service(handlers::auth::login)
                            .service(handlers::auth::admin_signup)
                            .service(handlers::auth::admin_login),
                    )
                    // Cart management
                    .service(
                        web::scope("/cart")
                            .service(handlers::cart::get_cart)
                            .service(handlers::cart::add_item)
                            .service(handlers::cart::remove_item),
                    )
                    // Catalog
                    .service(
                        web::scope("/plans")
                            .service(handlers::plan::list_plans)
                            .service(handlers::plan::create_plan)
                            .service(handlers::plan::update_plan)
                            .service(handlers::plan::get_plan),
                    )
                    // Checkout + verification
                    .service(
                        web::scope("/payments")
                            .service(handlers::payment::checkout)
                            .service(handlers::payment::razorpay_webhook)
                            .service(handlers::payment::verify_payment)
                            .service(handlers::payment::list_payments)
                            .service(handlers::payment::payment_details),
                    )
                    // Health check
                    .route("/health", web::get().to(handlers::health::health_check)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
