mod auth;
mod clients;
mod database;
mod handlers;
mod models;

use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use std::env;

use crate::auth::SessionGuard;
use crate::clients::notify::Mailer;
use crate::database::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    let database_url = env::var("DATABASE_URL").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL must be set in environment",
        )
    })?;

    let db = Database::connect(&database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    let session_key = match env::var("SESSION_KEY") {
        Ok(raw) if raw.len() >= 64 => Key::from(raw.as_bytes()),
        Ok(_) => {
            log::warn!("SESSION_KEY is shorter than 64 bytes, generating an ephemeral key");
            Key::generate()
        }
        Err(_) => {
            log::warn!("SESSION_KEY is not set, sessions will not survive a restart");
            Key::generate()
        }
    };

    let mailer = Mailer::new(
        env::var("RESEND_API_KEY").ok(),
        env::var("APP_FROM_EMAIL").ok(),
        env::var("RESEND_TEST_EMAIL").ok(),
    );
    if !mailer.is_configured() {
        log::warn!("RESEND_API_KEY is not set, registration notices will not be delivered");
    }

    let db_data = web::Data::new(db);
    let mailer_data = web::Data::new(mailer);

    log::info!("Starting Venture Directory Service on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(mailer_data.clone())
            .wrap(SessionGuard)
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                session_key.clone(),
            ))
            .wrap(cors)
            .wrap(Logger::default())
            // Health
            .service(handlers::health_check)
            // Auth
            .service(auth::login)
            .service(auth::logout)
            .service(auth::session_info)
            // Registration workflow
            .service(handlers::submit_registration)
            .service(handlers::list_registrations)
            .service(handlers::approve_registration)
            .service(handlers::reject_registration)
            .service(handlers::relay_notification)
            // Business directory
            .service(handlers::list_businesses)
            .service(handlers::create_business)
            .service(handlers::update_business)
            .service(handlers::delete_business)
            // Blog
            .service(handlers::list_published_posts)
            .service(handlers::get_published_post)
            .service(handlers::list_all_posts)
            .service(handlers::create_post)
            .service(handlers::update_post)
            .service(handlers::delete_post)
            // Committee roster
            .service(handlers::list_committee_members)
            .service(handlers::create_committee_member)
            .service(handlers::update_committee_member)
            .service(handlers::delete_committee_member)
            // Gallery
            .service(handlers::list_gallery_images)
            .service(handlers::create_gallery_image)
            .service(handlers::update_gallery_image)
            .service(handlers::delete_gallery_image)
            // Admin dashboard
            .service(handlers::admin_dashboard)
    })
    .bind(&bind_address)?
    .run()
    .await
}
