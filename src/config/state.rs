// Application state module
// Everything a request handler needs, shared read-only across connections

use crate::asset::Assets;
use crate::logger::AccessLogFormat;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    pub assets: Assets,
    pub access_log: Option<AccessLogFormat>,
}

impl AppState {
    pub fn new(config: &Config, assets: Assets) -> Self {
        let access_log = config
            .logging
            .access_log
            .then(|| AccessLogFormat::parse(&config.logging.access_log_format));

        Self {
            config: config.clone(),
            assets,
            access_log,
        }
    }
}
