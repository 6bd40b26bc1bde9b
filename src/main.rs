// src/main.rs

use tracing::info;

use runwaiter::{cli, config, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("runwaiter error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let config_path = args.config.clone();
    let cfg = config::load_and_validate(&config_path)?;
    logging::init_logging(args.log_level, cfg.config.debug)?;
    if !config_path.exists() {
        info!(path = %config_path.display(), "config file not found; using default values");
    }
    run(args, cfg).await?;
    Ok(())
}
