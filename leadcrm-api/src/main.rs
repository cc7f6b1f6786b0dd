//! # LeadCRM API Server
//!
//! JSON API for organizers and agents working a shared pool of leads.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/leadcrm JWT_SECRET=... cargo run -p leadcrm-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use leadcrm_api::{
    app::{build_router, AppState},
    config::Config,
};
use leadcrm_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    notify::{LogNotifier, Notifier, SmtpNotifier},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "leadcrm_api=debug,leadcrm_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "LeadCRM API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let notifier: Arc<dyn Notifier> = match config.mail.smtp_settings() {
        Some(settings) => Arc::new(
            SmtpNotifier::new(&settings).context("Failed to configure SMTP notifier")?,
        ),
        None => {
            tracing::warn!("MAIL_SMTP_HOST not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, notifier));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
