use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use flower_shop_api as api;
use api::notifications::{
    email::HttpEmailChannel, telegram::TelegramChatChannel, NotificationDispatcher,
    NotificationWorker,
};
use api::payments::{PaymentGateway, WebhookVerifier, YandexPayClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::init_start_time();

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Notifications go through a bounded queue drained by a single worker
    let (notifications, notification_rx) =
        NotificationDispatcher::channel(cfg.notification_queue_capacity);
    let email = HttpEmailChannel::new(cfg.email.clone()).context("failed to build email channel")?;
    let chat =
        TelegramChatChannel::new(cfg.telegram.clone()).context("failed to build chat channel")?;
    if cfg.email.api_url.is_none() {
        warn!("Email relay not configured; customer emails will only be logged");
    }
    let worker = NotificationWorker::new(
        Arc::new(email),
        Arc::new(chat),
        cfg.email.shop_name.clone(),
    );
    tokio::spawn(worker.run(notification_rx));

    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        YandexPayClient::new(cfg.payment.clone()).context("failed to build payment client")?,
    );
    let verifier = WebhookVerifier::from_config(&cfg.payment)
        .context("failed to build webhook verifier")?;
    if !verifier.is_enabled() {
        warn!("Webhook signature verification disabled; provider callbacks are not authenticated");
    }

    let cors = api::cors_layer(&cfg)?;
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let app_state = api::AppState::new(db_arc, cfg, gateway, verifier, notifications);
    let app = api::build_app(app_state).layer(cors);

    info!("flower-shop-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
