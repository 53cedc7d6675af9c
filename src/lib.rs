pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use pipeline::coding::{
    CodePredictor, CodingError, CodingRequest, CodingResult, LlmClient, OpenAiClient,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over [`config::default_log_filter`]. Returns `false` if a
/// subscriber was already installed.
pub fn init_tracing() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
    installed
}

/// Build a predictor backed by the OpenAI transport, configured from the environment.
pub fn predictor_from_env() -> Result<CodePredictor, CodingError> {
    let config = config::CodingConfig::from_env();
    let client = OpenAiClient::from_config(&config)?;
    Ok(CodePredictor::new(Box::new(client), config))
}
