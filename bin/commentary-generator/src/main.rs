use pulsecast::app::CommentaryGenerator;
use pulsecast::config::AppConfig;
use pulsecast_core::task::runner::Runner;
use std::env;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Install global log collector.
    pulsecast::install_tracing();

    // Setup environment variables
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|err| {
        error!("env variable CONFIG_PATH should be set: {:?}", err);
        process::exit(1);
    });

    let config = AppConfig::load(config_path).unwrap_or_else(|err| {
        error!("{:?}", err);
        process::exit(1);
    });

    // Comment on enriched events until the stream ends or Ctrl-C.
    CommentaryGenerator { config }.run().await.unwrap_or_else(|err| {
        error!("{:?}", err);
        process::exit(1);
    });
}
