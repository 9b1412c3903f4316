//! Session builder for fluent configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::auth::{AuthToken, Credentials};
use crate::error::{Error, Result};

use super::config::CommcellConfig;
use super::Commcell;

/// Builder for opening a [`Commcell`] session.
///
/// # Example
///
/// ```rust,no_run
/// use commcell_sdk::Commcell;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), commcell_sdk::Error> {
/// let commcell = Commcell::builder()
///     .host("webconsole.example.com")
///     .token("QSDK 3a1f...")
///     .timeout(Duration::from_secs(60))
///     .force_https(true)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CommcellBuilder {
    host: Option<String>,
    web_service_url: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    token: Option<AuthToken>,
    force_https: Option<bool>,
    certificate_path: Option<PathBuf>,
    tls_verify: Option<bool>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    device_id: Option<String>,
    proxy: Option<String>,
}

impl CommcellBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the web console host name.
    ///
    /// This is required and must be called before [`build()`](Self::build).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets an explicit web service URL instead of the one derived from the host.
    #[must_use]
    pub fn web_service_url(mut self, url: impl Into<String>) -> Self {
        self.web_service_url = Some(url.into());
        self
    }

    /// Sets the user name for password login.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for password login.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Sets an existing session token.
    ///
    /// The token is validated first; if the server rejects it and a user name
    /// and password are also set, a password login follows.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(AuthToken::new(token));
        self
    }

    /// Sets the credentials directly.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        match credentials {
            Credentials::Password { username, password } => {
                self.username = Some(username);
                self.password = Some(password);
            }
            Credentials::Token(token) => self.token = Some(token),
        }
        self
    }

    /// Only try HTTPS while discovering the web service.
    #[must_use]
    pub fn force_https(mut self, force: bool) -> Self {
        self.force_https = Some(force);
        self
    }

    /// Sets a PEM certificate used to verify the server. Implies HTTPS only.
    #[must_use]
    pub fn certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Sets whether to verify TLS certificates.
    ///
    /// Default: true.
    ///
    /// # Security Warning
    ///
    /// Disabling TLS verification is insecure and should only be used
    /// against lab CommServes with self-signed certificates.
    #[must_use]
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = Some(verify);
        self
    }

    /// Sets the request timeout.
    ///
    /// Default: 120 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// Default: 10 seconds.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the user agent string.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the device id sent with login. A random id is used otherwise.
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the proxy URL.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    fn into_parts(self) -> Result<(CommcellConfig, Vec<Credentials>)> {
        let host = self
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::config("host is required"))?;

        let mut config = CommcellConfig::new(host);

        if let Some(url) = self.web_service_url {
            if url.contains("://") {
                url::Url::parse(url.trim())?;
            }
            config = config.with_web_service_url(url);
        }
        if let Some(force) = self.force_https {
            config = config.with_force_https(force);
        }
        if let Some(path) = self.certificate_path {
            config = config.with_certificate_path(path);
        }
        if let Some(verify) = self.tls_verify {
            config = config.with_tls_verify(verify);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            config = config.with_connect_timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        if let Some(device_id) = self.device_id {
            config = config.with_device_id(device_id);
        }
        if let Some(proxy) = self.proxy {
            config = config.with_proxy(proxy);
        }

        let mut credentials = Vec::new();
        if let Some(token) = self.token {
            credentials.push(Credentials::Token(token));
        }
        if let (Some(username), Some(password)) = (self.username, self.password) {
            credentials.push(Credentials::Password { username, password });
        }
        if credentials.is_empty() {
            return Err(Error::CredentialsMissing);
        }

        Ok((config, credentials))
    }

    /// Discovers the web service, logs in and loads the CommServ details.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no host is set,
    /// [`Error::CredentialsMissing`] without a token or a user name and
    /// password, and [`Error::Unreachable`] when no web service answers.
    pub async fn build(self) -> Result<Commcell> {
        let (config, credentials) = self.into_parts()?;
        Commcell::open(config, credentials).await
    }
}
