// ── Runtime connection configuration ──
//
// Describes *how* to reach a WebControl server. Callers construct a
// `WmsConfig` and hand it in; the library never reads config files.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Connection settings for a single WebControl server.
#[derive(Debug, Clone)]
pub struct WmsConfig {
    /// Server base URL. The device announces itself as
    /// `http://webcontrol.local` on the LAN.
    pub target: Url,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for WmsConfig {
    fn default() -> Self {
        Self {
            target: Url::parse("http://webcontrol.local")
                .expect("default target URL is valid"),
            timeout: Duration::from_secs(10),
        }
    }
}

impl WmsConfig {
    /// Config pointing at a specific server address.
    pub fn with_target(target: &str) -> Result<Self, Error> {
        Ok(Self {
            target: Url::parse(target)?,
            ..Self::default()
        })
    }

    /// Build a `reqwest::Client` from this config.
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("warema-wms/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)
    }
}
