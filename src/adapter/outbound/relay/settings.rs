//! Transfer relay configuration.

use serde::Deserialize;

use crate::adapter::outbound::http::HttpConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Relay base URL. Overridden by `RELAY_URL`.
    #[serde(default = "default_relay_url")]
    pub url: String,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:8787".into()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            http: HttpConfig::default(),
        }
    }
}
