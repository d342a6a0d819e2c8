//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::params::{Model, Orient};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Plugin settings shared by every command invocation.
#[derive(Clone, Debug)]
pub struct PluginConfig {
    /// Base URL of the generation API.
    pub endpoint: String,
    /// API token passed along with every generation.
    pub token: String,
    /// Model used when the user does not pick one.
    pub model: Model,
    /// Orientation used when the user does not pick one.
    pub orient: Orient,
    /// Tags appended to every prompt, exempt from filtering.
    pub base_prompt: String,
    /// Raw forbidden word configuration.
    pub forbidden: String,
    /// Delay before sent results are recalled, zero disables recall.
    pub recall_timeout: Duration,
    /// Timeout applied to every outbound request.
    pub request_timeout: Duration,
    /// Upscaling predict endpoint.
    pub upscale_api: String,
}

impl PluginConfig {
    /// Config with the documented defaults for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: String::new(),
            model: Model::default(),
            orient: Orient::default(),
            base_prompt: "masterpiece".to_string(),
            forbidden: String::new(),
            recall_timeout: Duration::ZERO,
            request_timeout: Duration::from_secs(120),
            upscale_api: crate::constants::DEFAULT_UPSCALE_API.to_string(),
        }
    }
}

impl From<&CliOptions> for PluginConfig {
    fn from(cli: &CliOptions) -> Self {
        Self {
            endpoint: cli.endpoint.clone(),
            token: cli.token.clone(),
            model: cli.model,
            orient: cli.orient,
            base_prompt: cli.base_prompt.trim().to_string(),
            forbidden: cli.forbidden.clone(),
            recall_timeout: Duration::from_secs(cli.recall_timeout),
            request_timeout: Duration::from_secs(cli.request_timeout),
            upscale_api: cli.upscale_api.clone(),
        }
    }
}
