use mock_server::{MockEtherpad, DEV_API_KEY};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "9001".to_string());
    let api_key = std::env::var("ETHERPAD_API_KEY").unwrap_or_else(|_| DEV_API_KEY.to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock Etherpad listening");
    mock_server::run(listener, MockEtherpad::new(api_key)).await
}
