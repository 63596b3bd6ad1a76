// src/main.rs

mod app_state;
mod auth;
mod bookings;
mod cascade;
mod config;
mod dispatcher;
mod errors;
mod favorites;
mod feed_hub;
mod feed_socket;
mod listings;
mod messages;
mod models;
mod notifications;
mod push;
mod reviews;
mod store;
mod users;

use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::auth::Authentication;
use crate::push::FcmGateway;
use crate::store::MongoStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let store = Arc::new(MongoStore::init(&config.mongo_uri, &config.database_name).await);
    let push = Arc::new(FcmGateway::new(&config));
    let feed = feed_hub::FeedHub::new().start();

    let state = AppState {
        store,
        push,
        feed,
        config: config.clone(),
    };

    info!("Server running at http://0.0.0.0:8080");
    info!("Allowed CORS origin: {}", config.frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&state.config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication::new(state.config.jwt_secret.clone()))
            .app_data(web::Data::new(state.clone()))
            // LISTINGS (products, accommodations, services)
            .service(
                web::scope("/listings/{listing_type}")
                    .route("", web::post().to(listings::create_listing))
                    .route("", web::get().to(listings::list_listings))
                    .service(
                        web::scope("/{listing_id}")
                            .route("", web::get().to(listings::get_listing))
                            .route("", web::put().to(listings::update_listing))
                            .route("", web::delete().to(listings::delete_listing))
                            .route("/images", web::get().to(listings::list_images))
                            .route("/images", web::post().to(listings::add_image)),
                    ),
            )
            // FAVORITES
            .service(
                web::scope("/favorites")
                    .route("", web::get().to(favorites::list_favorites))
                    .route("", web::post().to(favorites::add_favorite))
                    .route(
                        "/{item_type}/{item_id}",
                        web::delete().to(favorites::remove_favorite),
                    ),
            )
            // REVIEWS
            .service(
                web::scope("/reviews")
                    .route("", web::post().to(reviews::create_review))
                    .route("", web::get().to(reviews::list_reviews))
                    .route("/{review_id}", web::delete().to(reviews::delete_review)),
            )
            // BOOKINGS (accommodations only)
            .service(
                web::scope("/bookings")
                    .route("", web::post().to(bookings::create_booking))
                    .route("", web::get().to(bookings::list_bookings))
                    .route(
                        "/{booking_id}/status",
                        web::put().to(bookings::update_booking_status),
                    ),
            )
            // MESSAGES
            .service(
                web::scope("/messages")
                    .route("", web::post().to(messages::send_message))
                    .route("", web::get().to(messages::list_messages)),
            )
            // NOTIFICATIONS
            .service(
                web::scope("/notifications")
                    .route("", web::get().to(notifications::list_notifications))
                    .route("", web::post().to(notifications::broadcast))
                    .route("/read_all", web::post().to(notifications::mark_all_read))
                    .route(
                        "/{notification_id}/read",
                        web::post().to(notifications::mark_read),
                    )
                    .route(
                        "/{notification_id}",
                        web::delete().to(notifications::delete_notification),
                    ),
            )
            // USERS
            .service(
                web::scope("/users")
                    .route(
                        "/me/device_token",
                        web::put().to(users::update_device_token),
                    )
                    .route("/{user_id}", web::get().to(users::get_user)),
            )
            // WEBSOCKET feed for real-time updates
            .service(web::resource("/ws").route(web::get().to(feed_socket::feed_index)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
