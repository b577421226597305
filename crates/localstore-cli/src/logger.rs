use clap::ValueEnum;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

#[derive(Default)]
pub(super) struct LoggerConfig {
    pub format: LoggerFormat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LoggerFormat {
    #[default]
    Pretty,
    Json,
}

pub(super) fn init_logger(config: LoggerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = SubscriberBuilder::default().with_env_filter(filter).with_writer(std::io::stderr);

    match config.format {
        LoggerFormat::Json => builder.json().init(),
        LoggerFormat::Pretty => builder.init(),
    }
}
