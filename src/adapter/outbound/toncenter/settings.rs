//! toncenter API configuration.

use serde::Deserialize;

use crate::adapter::outbound::http::HttpConfig;

/// Connection settings for the toncenter v2 HTTP API.
#[derive(Clone, Deserialize)]
pub struct ToncenterConfig {
    /// API base URL, without a trailing method name.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key sent as `X-API-Key`. Read from `TONCENTER_API_KEY`, never the file.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Request archival nodes.
    #[serde(default)]
    pub archival: bool,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_api_url() -> String {
    "https://toncenter.com/api/v2".into()
}

impl Default for ToncenterConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            archival: false,
            http: HttpConfig::default(),
        }
    }
}

impl std::fmt::Debug for ToncenterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToncenterConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("archival", &self.archival)
            .field("http", &self.http)
            .finish()
    }
}
