use wisecow::config::Config;
use wisecow::fortune::{self, FortunePage, Renderer, Source};
use wisecow::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    fortune::check_prerequisites(&cfg)?;

    let page = FortunePage::new(Source::from_config(&cfg), Renderer::from_config(&cfg));
    let server = Server::bind(&cfg, page).await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
