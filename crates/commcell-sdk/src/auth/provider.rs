//! Credential types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};

/// Prefixes the web service accepts on a token as-is.
const TOKEN_PREFIXES: [&str; 3] = ["QSDK ", "SAML ", "Bearer "];

/// A session token in the form the `Authtoken` header expects.
#[derive(Clone)]
pub struct AuthToken {
    value: SecretString,
}

impl AuthToken {
    /// Creates a token, adding the `QSDK ` prefix unless a known prefix is present.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let value = if TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
            token
        } else {
            format!("QSDK {token}")
        };
        Self {
            value: SecretString::new(value),
        }
    }

    /// Returns the header value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Returns true for SAML tokens, which cannot be renewed.
    #[must_use]
    pub fn is_saml(&self) -> bool {
        self.expose().starts_with("SAML ")
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Credentials used to open a session.
#[derive(Clone)]
pub enum Credentials {
    /// Username and password login.
    Password {
        /// Commcell user name.
        username: String,
        /// Plain text password; encoded before it is sent.
        password: SecretString,
    },
    /// An existing token.
    Token(AuthToken),
}

impl Credentials {
    /// Creates password credentials.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// Creates token credentials.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(AuthToken::new(token))
    }

    /// Returns the user name, if known before login.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::Token(_) => None,
        }
    }
}

/// Encodes a password the way the `Login` endpoint expects it.
pub(crate) fn encode_password(password: &SecretString) -> String {
    STANDARD.encode(password.expose_secret().as_bytes())
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Credentials::Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Token(token) => write!(f, "Credentials::Token({token:?})"),
        }
    }
}
