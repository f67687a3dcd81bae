use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use post_summarizer::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing credentials stop the process before any request is served
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Refusing to start");
            return Err(err.into());
        }
    };
    let server_addr = config.server_addr;
    info!(
        proxy = %config.proxy.endpoint(),
        model = %config.gemini.model,
        max_video_bytes = config.limits.max_video_bytes,
        "Configuration loaded"
    );

    let app_state = AppState::new(config)?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    info!("Listening on http://{}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
