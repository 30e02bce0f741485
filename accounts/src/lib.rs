pub mod auth;
pub mod pin;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod time;
pub mod validation;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use secrecy::{ExposeSecret, SecretBox};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

use payloads::Policy;
use payloads::token::RevocationCache;

use crate::auth::{InternalKey, TokenVerifier};
use crate::time::TimeSource;

/// Revocation lookups are remembered this long.
const REVOCATION_CACHE_TTL_SECS: i64 = 60;

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub async fn build(
    config: &mut Config,
    time_source: TimeSource,
) -> std::io::Result<Server> {
    let db_pool = web::Data::new(
        PgPoolOptions::new()
            .max_connections(16)
            .connect(&config.database_url)
            .await
            .expect("Failed to connect to accounts_db"),
    );
    let time_source = web::Data::new(time_source);
    let policy = web::Data::new(Policy::standard());
    let token_verifier = web::Data::new(TokenVerifier {
        signing_key: SecretBox::new(Box::new(
            config.token_signing_key.expose_secret().clone(),
        )),
        revocations: RevocationCache::new(
            config.auth_base_url.clone(),
            REVOCATION_CACHE_TTL_SECS,
        ),
    });
    let internal_key = web::Data::new(InternalKey(SecretBox::new(
        Box::new(config.internal_api_key.expose_secret().clone()),
    )));

    let allowed_origins = config.allowed_origins.clone();

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        let cors = if allowed_origins.contains(&"*".to_string()) {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            let mut cors = Cors::default()
                .allow_any_method()
                .allow_any_header();
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .wrap(cors)
            .service(routes::api_services())
            .app_data(db_pool.clone())
            .app_data(time_source.clone())
            .app_data(policy.clone())
            .app_data(token_verifier.clone())
            .app_data(internal_key.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Configuration loaded from environment variables at startup.
pub struct Config {
    pub database_url: String,
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// List of allowed CORS origins. Use "*" to allow any origin
    /// (development only)
    pub allowed_origins: Vec<String>,
    /// Shared HMAC secret for verifying bearer tokens issued by the Auth
    /// service.
    pub token_signing_key: SecretBox<String>,
    /// Shared key presented by the Transactions service on
    /// `/api/v1/internal`.
    pub internal_api_key: SecretBox<String>,
    /// Base URL of the Auth service for best-effort revocation lookups.
    /// Unset disables the lookup (tokens are still checked for signature
    /// and expiry).
    pub auth_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            database_url: var("DATABASE_URL").unwrap(),
            ip: var("IP_ADDRESS").unwrap(),
            port: var("PORT").unwrap().parse().unwrap(),
            allowed_origins,
            token_signing_key: SecretBox::new(Box::new(
                var("TOKEN_SIGNING_KEY")
                    .expect("TOKEN_SIGNING_KEY must be set"),
            )),
            internal_api_key: SecretBox::new(Box::new(
                var("INTERNAL_API_KEY")
                    .expect("INTERNAL_API_KEY must be set"),
            )),
            auth_base_url: var("AUTH_BASE_URL").ok(),
        }
    }
}
