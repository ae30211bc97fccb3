// Logging and AWS client setup

use clap::ValueEnum;
use web_portal::StackProps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Initialize tracing. `RUST_LOG` wins over `--log-level` when set.
pub fn init_tracing(log_level: &str, log_format: LogFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // logs go to stderr, stdout is reserved for command output
    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match log_format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json().with_writer(std::io::stderr)))
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().with_writer(std::io::stderr)))
        }
    };
}

/// shared AWS config for every client the CLI creates. The configured stack
/// region wins over the environment.
pub async fn aws_config_for(props: &StackProps) -> aws_config::SdkConfig {
    let mut loader = aws_config::from_env();
    if let Some(region) = &props.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    let config = loader.load().await;
    tracing::info!(
        region = ?config.region().map(|r| r.as_ref()),
        account = ?props.account,
        "loaded AWS configuration"
    );
    config
}
