use transactions::{
    Config, build,
    telemetry::{get_subscriber, init_subscriber},
    time::TimeSource,
};

/// Transactions service
///
/// Environment variables can be set directly or loaded from a .env file in
/// the project root.
///
/// Required environment variables:
/// - DATABASE_URL: PostgreSQL connection string for transactions_db
/// - IP_ADDRESS: Server bind address (127.0.0.1 for local, 0.0.0.0 for public)
/// - PORT: Server port (reference deployment: 8002)
/// - ACCOUNTS_BASE_URL: base URL of the Accounts service
/// - INTERNAL_API_KEY: shared key for the Accounts internal surface
/// - TOKEN_SIGNING_KEY: shared HMAC secret for bearer tokens
///
/// Optional:
/// - ALLOWED_ORIGINS: CORS origins ("*" by default)
/// - AUTH_BASE_URL: Auth service base URL for revocation lookups
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let subscriber = get_subscriber("info".into());
    init_subscriber(subscriber);

    let mut config = Config::from_env();

    let pool = sqlx::PgPool::connect(&config.database_url).await.unwrap();

    // Run database migrations embedded in the binary
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    #[cfg(not(feature = "mock-time"))]
    let time_source = TimeSource::new();
    #[cfg(feature = "mock-time")]
    let time_source = TimeSource::new(jiff::Timestamp::now());

    let server = build(&mut config, time_source).await?;
    server.await
}
