use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use hub_server::config::Config;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hub_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    if let Err(e) = hub_server::serve(config).await {
        tracing::error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
