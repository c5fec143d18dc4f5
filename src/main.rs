use tokio::net::TcpListener;
use tracing::info;
use portfolio_chat::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    portfolio_chat::setup_logging();

    let config = Config::load()?;
    let server_addr = config.server_addr;
    info!(mode = %config.prompt_mode, model = %config.model, "Starting server on {}", server_addr);

    let app_state = AppState::new(config)?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
