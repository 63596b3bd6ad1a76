use std::env;

const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub frontend_origin: String,
    pub fcm_endpoint: String,
    /// Absent when the push gateway is not configured; push delivery then
    /// degrades to "unavailable" instead of failing requests.
    pub fcm_server_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            mongo_uri: env::var("MONGO_URI").expect("MONGO_URI must be set"),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "campus_market".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            fcm_endpoint: env::var("FCM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_FCM_ENDPOINT.to_string()),
            fcm_server_key: env::var("FCM_SERVER_KEY").ok(),
        }
    }
}
