//! HTTP dispatcher with token renewal.

use parking_lot::RwLock;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::auth::{Authenticator, SessionToken};
use crate::error::{Error, ErrorDomain, Result};
use crate::response::{self, RawResponse};

use super::config::CommcellConfig;

/// Maximum number of token renewals for one dispatched request.
pub const MAX_RENEWAL_ATTEMPTS: u32 = 3;

/// Request body.
#[derive(Debug, Clone)]
pub enum Payload {
    /// JSON body.
    Json(Value),
    /// String body, sent as XML when it parses as XML and as plain text otherwise.
    Text(String),
    /// Form-urlencoded fields.
    Form(Vec<(String, String)>),
}

impl Payload {
    /// Serializes a value into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// Internal HTTP client shared by the session and all feature wrappers.
pub struct HttpClient {
    client: Client,
    token: SessionToken,
    device_id: String,
    renew_url: RwLock<Option<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new(config: &CommcellConfig, token: SessionToken) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true);

        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref path) = config.certificate_path {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::config(format!("Invalid certificate {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::config(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            device_id: config.device_id.clone(),
            renew_url: RwLock::new(None),
        })
    }

    /// The session token used by this client.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Device id sent with login and renewal requests.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Enables token renewal against the given endpoint.
    pub fn set_renew_url(&self, url: impl Into<String>) {
        *self.renew_url.write() = Some(url.into());
    }

    /// Probes a web service base URL. Returns true on a 200 answer.
    ///
    /// Transport errors are returned to the caller, which decides whether to
    /// try the next candidate.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &str) -> Result<bool> {
        let response = self.client.get(url).send().await?;
        debug!(status = %response.status(), "Service probe answered");
        Ok(response.status() == StatusCode::OK)
    }

    /// Sends a request and returns `(ok, response)`; `ok` is true exactly for 200.
    ///
    /// A 401 while a token is held renews the token and re-sends the request,
    /// at most [`MAX_RENEWAL_ATTEMPTS`] times.
    pub async fn dispatch(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Payload>,
    ) -> Result<(bool, RawResponse)> {
        let mut attempts = 0;

        loop {
            let generation = self.token.generation();
            let response = self.execute_once(method.clone(), url, payload).await?;

            if response.status == StatusCode::UNAUTHORIZED && self.token.is_set() {
                if attempts >= MAX_RENEWAL_ATTEMPTS {
                    return Err(Error::RenewalExhausted { attempts });
                }
                attempts += 1;
                warn!(attempt = attempts, "Request unauthorized, renewing token");
                self.renew_token(generation).await?;
                continue;
            }

            return Ok((response.status == StatusCode::OK, response));
        }
    }

    /// Makes a GET request and returns the classified JSON body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str, domain: ErrorDomain) -> Result<Value> {
        self.request(Method::GET, url, None, domain).await
    }

    /// Makes a POST request with a JSON body.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        domain: ErrorDomain,
    ) -> Result<Value> {
        let payload = Payload::Json(serde_json::to_value(body)?);
        self.request(Method::POST, url, Some(&payload), domain).await
    }

    /// Makes a PUT request with a JSON body.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        domain: ErrorDomain,
    ) -> Result<Value> {
        let payload = Payload::Json(serde_json::to_value(body)?);
        self.request(Method::PUT, url, Some(&payload), domain).await
    }

    /// Makes a DELETE request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn delete(&self, url: &str, domain: ErrorDomain) -> Result<Value> {
        self.request(Method::DELETE, url, None, domain).await
    }

    /// Dispatches a request and classifies the response.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Payload>,
        domain: ErrorDomain,
    ) -> Result<Value> {
        let (ok, response) = self.dispatch(method, url, payload).await?;
        response::into_json(response::classify(ok, &response), domain)
    }

    /// Executes a single request.
    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Payload>,
    ) -> Result<RawResponse> {
        let mut request = self.client.request(method, url);

        request = self.token.authenticate(request).await?;
        request = request.header("Accept", "application/json");

        request = match payload {
            Some(Payload::Json(value)) => request.json(value),
            Some(Payload::Text(text)) => {
                let content_type = if looks_like_xml(text) {
                    "application/xml"
                } else {
                    "text/plain"
                };
                request
                    .header("Content-Type", content_type)
                    .body(text.clone())
            }
            Some(Payload::Form(fields)) => request.form(fields),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Renews the session token unless another task already did.
    async fn renew_token(&self, seen_generation: u64) -> Result<()> {
        let _guard = self.token.lock_renewal().await;

        if self.token.generation() != seen_generation {
            debug!("Token already renewed by a concurrent request");
            return Ok(());
        }

        let current = self.token.get().ok_or(Error::LoggedOut)?;
        if current.starts_with("SAML ") {
            return Err(Error::TokenExpired);
        }

        let url = self
            .renew_url
            .read()
            .clone()
            .ok_or(Error::TokenExpired)?;

        let body = Payload::Json(json!({
            "sessionId": current,
            "deviceId": self.device_id,
        }));

        let response = self.execute_once(Method::POST, &url, Some(&body)).await?;
        if response.status != StatusCode::OK {
            return Err(Error::response(
                response.status.as_u16(),
                response::extract_title(&response.text()),
            ));
        }

        let value = response
            .json()
            .ok()
            .flatten()
            .ok_or(Error::EmptyResponse { detail: None })?;

        match value.get("token").and_then(Value::as_str) {
            Some(token) => {
                self.token.set_raw(token);
                debug!("Token renewed");
                Ok(())
            }
            None => Err(Error::LoginFailed {
                message: value
                    .pointer("/error/errLogMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("token renewal rejected")
                    .to_string(),
            }),
        }
    }
}

/// Returns true if `text` is a well formed XML document.
pub(crate) fn looks_like_xml(text: &str) -> bool {
    let mut reader = Reader::from_str(text);
    let mut saw_element = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                saw_element = true;
                depth += 1;
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Ok(Event::Empty(_)) => saw_element = true,
            Ok(Event::Text(t)) => {
                if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) {
                    return false;
                }
            }
            Ok(Event::Eof) => return saw_element && depth == 0,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
