use std::sync::Arc;

use storefront_api::{
    app_router, config, db, events, gateway::StripeGateway, handlers::AppServices, logging, schema,
    AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config()?;
    logging::init(&config);

    let db = Arc::new(db::establish_connection(&config).await?);
    if config.auto_migrate {
        schema::ensure_schema(&db).await?;
        info!("Schema ensured");
    }

    let gateway = StripeGateway::from_config(&config).map(Arc::new);
    if gateway.is_none() {
        info!("No gateway credential configured; online payments run in demo mode");
    }

    let (event_sender, _event_task) = events::event_channel(config.event_channel_capacity);

    let services = AppServices::build(db.clone(), event_sender.clone(), gateway.clone(), &config);
    let state = AppState {
        db,
        config: config.clone(),
        event_sender,
        gateway,
        services,
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
