use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::TDMError;

pub const LOG_ENV: &str = "TDM_LOG";

/// Install the file subscriber. The terminal belongs to the tui, so without a
/// log file nothing is installed and all events are dropped.
pub fn init(log_file: Option<&Path>, level: &str) -> Result<(), TDMError> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| TDMError::InvalidConfig(format!("log level {level:?}: {e}")))?;

    let file = File::create(path)?;
    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| TDMError::InvalidConfig(format!("logging: {e}")))
}
