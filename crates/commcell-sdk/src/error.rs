//! Error types for the Commcell SDK.
//!
//! Every failure surfaces as a variant of [`Error`]. Each variant maps to a
//! `(domain, code)` pair via [`Error::code`], so callers that key on the
//! legacy `"Response/101"` style identifiers can keep doing so.

use std::fmt;

/// Feature area an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Transport level response handling.
    Response,
    /// Session bootstrap and CommServ details.
    Commcell,
    /// Login, token renewal and request dispatch.
    Session,
    /// Clients.
    Client,
    /// Client groups.
    ClientGroup,
    /// Storage policies.
    Storage,
    /// Schedules and schedule patterns.
    Schedules,
    /// Entity tags.
    EntityTags,
    /// Block level replication pairs.
    BlrPairs,
    /// Datacube and data sources.
    Datacube,
    /// eDiscovery clients and crawl jobs.
    EdiscoveryClients,
}

impl ErrorDomain {
    /// Returns the wire name of the domain.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "Response",
            Self::Commcell => "Commcell",
            Self::Session => "Session",
            Self::Client => "Client",
            Self::ClientGroup => "ClientGroup",
            Self::Storage => "Storage",
            Self::Schedules => "Schedules",
            Self::EntityTags => "EntityTags",
            Self::BlrPairs => "BLRPairs",
            Self::Datacube => "Datacube",
            Self::EdiscoveryClients => "EdiscoveryClients",
        }
    }

    /// Code used for "not found" conditions in this domain.
    fn not_found_code(self) -> u16 {
        match self {
            Self::Schedules | Self::EntityTags => 105,
            _ => 102,
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(domain, code)` pair identifying an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Feature area.
    pub domain: ErrorDomain,
    /// Numeric code within the domain.
    pub code: u16,
}

impl ErrorCode {
    const fn new(domain: ErrorDomain, code: u16) -> Self {
        Self { domain, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.code)
    }
}

/// The main error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-200 status.
    #[error("Response was not success: {message}")]
    ResponseNotSuccess {
        /// HTTP status code.
        status: u16,
        /// HTML title or raw body of the response.
        message: String,
    },

    /// The response body was empty, not JSON, or missing an expected key.
    #[error("Response received is empty{}", detail_suffix(.detail))]
    EmptyResponse {
        /// What was missing, if known.
        detail: Option<String>,
    },

    /// The server reported an error inside a 200 response.
    #[error("{message}")]
    Api {
        /// Feature area of the failing call.
        domain: ErrorDomain,
        /// Server error code, when one was supplied.
        server_code: Option<i64>,
        /// Server message, verbatim.
        message: String,
    },

    /// A feature call failed with a code specific to its domain.
    #[error("{message}")]
    Operation {
        /// Feature area.
        domain: ErrorDomain,
        /// Code within the domain.
        code: u16,
        /// Server message or description.
        message: String,
    },

    /// A named entity is not present in the last fetched list.
    #[error("No {resource_type} exists with name: {name}")]
    NotFound {
        /// Feature area.
        domain: ErrorDomain,
        /// Kind of entity (e.g. "client", "tag").
        resource_type: &'static str,
        /// Name or id that was looked up.
        name: String,
    },

    /// An entity with the same name already exists.
    #[error("{resource_type} \"{name}\" already exists")]
    AlreadyExists {
        /// Feature area.
        domain: ErrorDomain,
        /// Kind of entity.
        resource_type: &'static str,
        /// Conflicting name.
        name: String,
    },

    /// An argument was rejected before any request was made.
    #[error("Data type of the input(s) is not valid: {message}")]
    InvalidInput {
        /// Feature area.
        domain: ErrorDomain,
        /// What was wrong.
        message: String,
    },

    /// None of the candidate web service URLs answered.
    #[error("Commcell is not reachable. Please check the commcell name and services again")]
    Unreachable {
        /// Base URLs that were probed.
        attempted: Vec<String>,
    },

    /// No token could be obtained from the supplied credentials.
    #[error("Credentials not received. Please try again.")]
    CredentialsMissing,

    /// The CommServ details response lacked a required key.
    #[error("Failed to get the CommServ details: {message}")]
    CommServDetails {
        /// Missing key or server message.
        message: String,
    },

    /// Login was rejected.
    #[error("Failed to Login with the credentials provided: {message}")]
    LoginFailed {
        /// Server message.
        message: String,
    },

    /// Token renewal did not recover from repeated 401 responses.
    #[error("Reached the maximum attempts limit")]
    RenewalExhausted {
        /// Number of renewals performed.
        attempts: u32,
    },

    /// The token has expired and cannot be renewed.
    #[error("The token has expired. Please login again")]
    TokenExpired,

    /// The token does not map to any user.
    #[error("No mapping exists for the given token for any user")]
    UnknownToken,

    /// The session was logged out; feature handles are no longer available.
    #[error("This session has expired. Please login again")]
    LoggedOut,

    /// A crawl job could not be started.
    #[error("Failed to start crawl job")]
    JobNotStarted,

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Error building the client configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// Error serializing request or deserializing response.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid profile file.
    #[error("Profile parse error: {0}")]
    Profile(#[from] toml::de::Error),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error reading certificates or profiles.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl Error {
    /// Creates a non-success response error.
    pub fn response(status: u16, message: impl Into<String>) -> Self {
        Self::ResponseNotSuccess {
            status,
            message: message.into(),
        }
    }

    /// Creates an empty response error with detail.
    pub fn empty(detail: impl Into<String>) -> Self {
        Self::EmptyResponse {
            detail: Some(detail.into()),
        }
    }

    /// Creates a server-reported error.
    pub fn api(domain: ErrorDomain, server_code: Option<i64>, message: impl Into<String>) -> Self {
        Self::Api {
            domain,
            server_code,
            message: message.into(),
        }
    }

    /// Creates an error with an explicit domain code.
    pub fn operation(domain: ErrorDomain, code: u16, message: impl Into<String>) -> Self {
        Self::Operation {
            domain,
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(
        domain: ErrorDomain,
        resource_type: &'static str,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            domain,
            resource_type,
            name: name.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(
        domain: ErrorDomain,
        resource_type: &'static str,
        name: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            domain,
            resource_type,
            name: name.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            domain,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns the `(domain, code)` pair for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        use ErrorDomain as D;
        match self {
            Self::ResponseNotSuccess { .. } => ErrorCode::new(D::Response, 101),
            Self::EmptyResponse { .. } | Self::Serialization(_) => {
                ErrorCode::new(D::Response, 102)
            }
            Self::Api { domain, .. } | Self::AlreadyExists { domain, .. } => {
                ErrorCode::new(*domain, 102)
            }
            Self::Operation { domain, code, .. } => ErrorCode::new(*domain, *code),
            Self::NotFound { domain, .. } => ErrorCode::new(*domain, domain.not_found_code()),
            Self::InvalidInput { domain, .. } => ErrorCode::new(*domain, 101),
            Self::Unreachable { .. } => ErrorCode::new(D::Commcell, 101),
            Self::CredentialsMissing => ErrorCode::new(D::Commcell, 102),
            Self::CommServDetails { .. } => ErrorCode::new(D::Commcell, 103),
            Self::LoginFailed { .. } => ErrorCode::new(D::Session, 101),
            Self::RenewalExhausted { .. } => ErrorCode::new(D::Session, 103),
            Self::LoggedOut => ErrorCode::new(D::Session, 104),
            Self::TokenExpired => ErrorCode::new(D::Session, 106),
            Self::UnknownToken => ErrorCode::new(D::Session, 107),
            Self::JobNotStarted => ErrorCode::new(D::EdiscoveryClients, 103),
            Self::Network(_) | Self::InvalidUrl(_) | Self::Configuration { .. } => {
                ErrorCode::new(D::Commcell, 108)
            }
            Self::Profile(_) | Self::Io(_) => ErrorCode::new(D::Commcell, 107),
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the HTTP status code if the server rejected the request.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ResponseNotSuccess { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns the server supplied message, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. }
            | Self::Operation { message, .. }
            | Self::ResponseNotSuccess { message, .. }
            | Self::LoginFailed { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
