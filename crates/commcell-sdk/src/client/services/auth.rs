//! Login, logout and token validation.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::auth::encode_password;
use crate::client::endpoints::Endpoint;
use crate::client::http::Payload;
use crate::error::{Error, Result};
use crate::models::{LoginRequest, LoginResponse};
use crate::response::{self, RawResponse};

use super::ApiContext;

/// Session level authentication calls.
#[derive(Clone)]
pub(crate) struct AuthService {
    ctx: ApiContext,
}

impl AuthService {
    pub(crate) fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    /// Logs in and stores the returned token. Returns the user name.
    #[instrument(skip(self, password))]
    pub(crate) async fn login(&self, username: &str, password: &SecretString) -> Result<String> {
        let request = LoginRequest::new(
            username,
            encode_password(password),
            self.ctx.http.device_id(),
        );
        let url = self.ctx.endpoints.url(Endpoint::Login);
        let (ok, response) = self
            .ctx
            .http
            .dispatch(Method::POST, url, Some(&Payload::json(&request)?))
            .await?;
        if !ok {
            return Err(not_success(&response));
        }

        let value = response.json()?.ok_or(Error::EmptyResponse { detail: None })?;
        match serde_json::from_value::<LoginResponse>(value.clone()) {
            Ok(login) => {
                self.ctx.http.token().set_raw(login.token);
                debug!(user = %login.user_name, "Logged in");
                Ok(login.user_name)
            }
            Err(_) => Err(Error::LoginFailed {
                message: value
                    .pointer("/errList/0/errLogMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("Login response carried no token")
                    .to_string(),
            }),
        }
    }

    /// Returns the user the current token belongs to.
    pub(crate) async fn who_am_i(&self) -> Result<String> {
        let url = self.ctx.endpoints.url(Endpoint::WhoAmI);
        let (ok, response) = self.ctx.http.dispatch(Method::POST, url, None).await?;
        if !ok {
            return Err(not_success(&response));
        }

        let text = response.text();
        let user = if response.is_json() || text.trim_start().starts_with('{') {
            user_from_json(&response)?
        } else {
            user_from_xml(&text)
        };
        user.ok_or(Error::UnknownToken)
    }

    /// Ends the session on the server and clears the token.
    pub(crate) async fn logout(&self) -> Result<String> {
        let url = self.ctx.endpoints.url(Endpoint::Logout);
        let (ok, response) = self.ctx.http.dispatch(Method::POST, url, None).await?;
        if !ok {
            return Err(not_success(&response));
        }
        self.ctx.http.token().clear();
        debug!("Logged out");
        Ok(response.text())
    }
}

fn not_success(response: &RawResponse) -> Error {
    Error::response(
        response.status.as_u16(),
        response::extract_title(&response.text()),
    )
}

fn user_from_json(response: &RawResponse) -> Result<Option<String>> {
    let Some(value) = response.json()? else {
        return Ok(None);
    };
    let code = value.get("errorCode").and_then(response::error_code_value);
    if code.is_some_and(|c| c != 0) {
        return Ok(None);
    }
    Ok(value
        .pointer("/user/userName")
        .and_then(Value::as_str)
        .map(String::from))
}

/// Reads `userName` from the `user` element of a processing instruction reply.
pub(crate) fn user_from_xml(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside_info = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = e.name();
                if name.as_ref() == b"CvEntities_ProcessingInstructionInfo" {
                    inside_info = true;
                } else if inside_info && name.as_ref() == b"user" {
                    return e
                        .try_get_attribute("userName")
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.into_owned());
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"CvEntities_ProcessingInstructionInfo" => {
                inside_info = false;
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
