use clap::Parser;
use regdash::Configuration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Opt {
    /// Extra configuration files, later ones win.
    #[clap(short, long, value_parser)]
    pub config: Vec<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup the logger
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse the parameters passed by arguments.
    let options = Opt::parse();

    let config = Configuration::config(Configuration::figment(options.config))?;

    let mut tasks = regdash::start(config).await?;

    tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                error!("Unable to listen for shutdown signal: {err}");
            }
            info!("Shutting down");
        }
        Some(res) = tasks.join_next() => {
            match res {
                Ok(Err(err)) => error!("Listener stopped: {err:#}"),
                Err(err) => error!("Listener task failed: {err}"),
                Ok(Ok(())) => {}
            }
        }
    }

    tasks.shutdown().await;

    Ok(())
}
