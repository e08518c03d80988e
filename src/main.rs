use actix_web::{web, App, HttpServer};
use sse_service::{
    config::Config,
    error::AppError,
    handlers::stream::register_routes,
    logging, metrics,
    sse::{pubsub, ClientRegistry},
};

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Config::from_env()?;
    tracing::info!("starting sse-service");

    let redis_client = redis::Client::open(config.redis.url())?;

    // Fail fast if the broker is unreachable.
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
    tracing::info!(%pong, "connected to redis");

    let registry = ClientRegistry::new();

    let subscriber_registry = registry.clone();
    let subscriber_client = redis_client.clone();
    let channel = config.sse.channel.clone();
    tokio::spawn(async move {
        match pubsub::run_subscriber(subscriber_client, channel, subscriber_registry).await {
            Ok(()) => tracing::error!("broker subscription ended, delivery halted until restart"),
            Err(err) => tracing::error!(%err, "broker subscription failed"),
        }
    });

    let addr = config.sse.bind_addr();
    tracing::info!(%addr, "SSE server listening");

    let registry_data = web::Data::new(registry);
    HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(register_routes)
    })
    .bind(&addr)?
    .run()
    .await?;

    Ok(())
}
