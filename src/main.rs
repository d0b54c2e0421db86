use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tablebook::config::AppConfig;
use tablebook::db;
use tablebook::handlers;
use tablebook::services::messaging::telegram::TelegramClient;
use tablebook::services::{janitor, polling, reminders};
use tablebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = AppConfig::from_env();
    config.validate()?;

    let webhook_mode = !config.webhook_url.is_empty();
    if webhook_mode && config.webhook_secret.is_empty() {
        config.webhook_secret = uuid::Uuid::new_v4().simple().to_string();
        tracing::info!("generated a webhook secret for this run");
    }

    let conn = db::init_db(&config.database_url)?;
    tracing::info!(database = %config.database_url, "database ready");

    let bot = TelegramClient::new(config.bot_token.clone());
    let state = Arc::new(AppState::new(
        conn,
        config.clone(),
        Box::new(TelegramClient::new(config.bot_token.clone())),
    ));

    tokio::spawn(reminders::run(Arc::clone(&state)));
    tokio::spawn(janitor::run(Arc::clone(&state)));

    if webhook_mode {
        let url = format!(
            "{}/webhook/telegram",
            config.webhook_url.trim_end_matches('/')
        );
        bot.set_webhook(&url, &config.webhook_secret).await?;
        tracing::info!(url = %url, "webhook registered");
    } else {
        bot.delete_webhook().await?;
        tokio::spawn(polling::run(Arc::clone(&state), bot));
    }

    let mut app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route("/api/admin/bookings/:id", get(handlers::admin::get_booking))
        .route("/api/admin/reviews", get(handlers::admin::get_reviews));
    if webhook_mode {
        app = app.route("/webhook/telegram", post(handlers::webhook::telegram_webhook));
    }
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
