//! Authentication handling for the Commcell SDK.
//!
//! A session authenticates every request with the `Authtoken` header. The
//! token is either obtained by logging in with a username and password or
//! supplied up front as a `QSDK`, `SAML` or `Bearer` token.

mod provider;
mod token;

pub(crate) use provider::encode_password;
pub use provider::{AuthToken, Credentials};
pub use token::SessionToken;

use async_trait::async_trait;
use reqwest::RequestBuilder;

use crate::error::Result;

/// Name of the header carrying the session token.
pub const AUTH_HEADER: &str = "Authtoken";

/// Trait for request authenticators.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Apply authentication to a request.
    async fn authenticate(&self, request: RequestBuilder) -> Result<RequestBuilder>;

    /// Returns true if requests will carry a token.
    fn is_authenticated(&self) -> bool;
}
