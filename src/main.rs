mod appointments;
mod auth;
mod calendar;
mod catalog;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::appointments::{lifecycle::BookingService, pg_store::PgAppointmentStore, store::AppointmentStore};
use crate::calendar::{outbox::{CalendarOutbox, CalendarWorker}, webhook::WebhookCalendar};
use crate::catalog::{Catalog, PgCatalog};
use crate::{config::Config, models::AppState};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;

    if cfg.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let store: Arc<dyn AppointmentStore> = Arc::new(PgAppointmentStore::new(pool.clone()));
    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(pool.clone()));

    let outbox = match &cfg.calendar_webhook_url {
        Some(url) => {
            let mirror = WebhookCalendar::new(url.as_str(), cfg.calendar_timeout)?;
            let (outbox, rx) = CalendarOutbox::channel(cfg.calendar_queue_capacity);
            let worker = CalendarWorker::new(Arc::new(mirror), store.clone(), catalog.clone(), cfg.clinic_offset);
            tokio::spawn(worker.run(rx));
            tracing::info!(%url, "calendar mirror enabled");
            outbox
        }
        None => {
            tracing::info!("calendar mirror disabled");
            CalendarOutbox::disabled()
        }
    };

    let booking = BookingService::new(store, catalog, outbox, cfg.booking_policy());

    let state = AppState {
        db: pool,
        session_ttl_hours: cfg.session_ttl_hours,
        booking: Arc::new(booking),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
