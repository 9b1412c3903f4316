//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// Path of the REST API below the web console host.
pub const API_PATH: &str = "commandcenter/api";

/// Configuration for a Commcell session.
#[derive(Debug, Clone)]
pub struct CommcellConfig {
    /// Web console host name, optionally with a port.
    pub host: String,

    /// Explicit web service URL, overriding the derived one.
    pub web_service_url: Option<String>,

    /// Only try HTTPS during service discovery.
    pub force_https: bool,

    /// PEM certificate used to verify the server.
    pub certificate_path: Option<PathBuf>,

    /// Whether to verify TLS certificates.
    pub tls_verify: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Device id sent with login and token renewal.
    pub device_id: String,

    /// Optional proxy URL.
    pub proxy: Option<String>,
}

impl CommcellConfig {
    /// Creates a new configuration for the given web console host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim().trim_end_matches('/').to_string(),
            web_service_url: None,
            force_https: false,
            certificate_path: None,
            tls_verify: true,
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            user_agent: crate::USER_AGENT.to_string(),
            device_id: Uuid::new_v4().to_string(),
            proxy: None,
        }
    }

    /// Sets an explicit web service URL.
    #[must_use]
    pub fn with_web_service_url(mut self, url: impl Into<String>) -> Self {
        self.web_service_url = Some(url.into());
        self
    }

    /// Restricts service discovery to HTTPS.
    #[must_use]
    pub fn with_force_https(mut self, force: bool) -> Self {
        self.force_https = force;
        self
    }

    /// Sets the certificate used to verify the server. Implies HTTPS only.
    #[must_use]
    pub fn with_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self.force_https = true;
        self
    }

    /// Sets whether to verify TLS certificates.
    #[must_use]
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the device id.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Sets the proxy URL.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Returns the base URLs to probe, in order.
    ///
    /// Every candidate ends with a slash so endpoint paths can be appended.
    #[must_use]
    pub fn candidate_urls(&self) -> Vec<String> {
        let https_only = self.force_https || self.certificate_path.is_some();

        if let Some(url) = self.web_service_url.as_deref() {
            let url = url.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                return vec![with_trailing_slash(url)];
            }
            return schemes(https_only)
                .map(|scheme| with_trailing_slash(&format!("{scheme}://{url}")))
                .collect();
        }

        schemes(https_only)
            .map(|scheme| format!("{scheme}://{}/{API_PATH}/", self.host))
            .collect()
    }
}

fn schemes(https_only: bool) -> impl Iterator<Item = &'static str> {
    let http = if https_only { None } else { Some("http") };
    std::iter::once("https").chain(http)
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

impl Default for CommcellConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}
