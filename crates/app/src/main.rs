use std::io::{self, BufWriter};

use anyhow::Context;

use prodload_infra::AppConfig;
use prodload_infra::config::load_dotenv;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    prodload_observability::init();

    if let Err(err) = start().await {
        let _ = prodload_app::report_failure(&err, &mut io::stderr().lock());
        std::process::exit(1);
    }
}

async fn start() -> anyhow::Result<()> {
    let env_file = load_dotenv(None).context("failed to load .env")?;
    tracing::debug!(path = %env_file.display(), "loaded environment file");

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        dsn = %config.database.redacted_dsn(),
        rows = config.load.rows,
        batch_size = config.load.batch_size.get(),
        streaming = config.load.streaming,
        "starting product load"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    prodload_app::run(&config, &mut out).await
}
