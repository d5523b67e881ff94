//! ontopic Gateway - Main entry point.

use anyhow::Result;
use ontopic_common::config::Config;
use ontopic_common::logging::init_logging;
use ontopic_common::Validate;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration, then apply environment overrides
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("ontopic Gateway v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    ontopic_gateway::start_server(&config).await
}
