//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;
use verify_auth::error::{Error as VerifyAuthError, ErrorKind as VerifyAuthErrorKind};

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field holds the original error that caused
/// the domain error, so operator logs keep upstream detail while `web` only
/// looks at `error_kind` to pick a status code and a user-facing message.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Verification(VerificationErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Store,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

/// Terminal outcomes of a verification attempt other than success.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum VerificationErrorKind {
    /// The restricted/full-access roles do not exist in the guild.
    RolesNotConfigured,
    /// The callback lacked `code` or `state`.
    MissingParameters,
    /// The `state` token is unknown, already used, or expired.
    InvalidOrExpired,
    ExchangeFailed,
    IdentityFetchFailed,
    /// The authorizing account is not the member who pressed the button.
    IdentityMismatch,
    ScopeNotFound,
    SubjectNotFound,
    TransitionFailed,
}

impl Error {
    pub fn verification(kind: VerificationErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Verification(kind),
        }
    }

    pub fn config() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }

    /// Re-label an error as a verification failure, keeping it as the source.
    pub fn into_verification(self, kind: VerificationErrorKind) -> Self {
        Error {
            source: Some(Box::new(self)),
            error_kind: DomainErrorKind::Verification(kind),
        }
    }

    /// The verification failure kind, if this is one.
    pub fn verification_kind(&self) -> Option<VerificationErrorKind> {
        match self.error_kind {
            DomainErrorKind::Verification(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
        }
    }
}

impl From<VerifyAuthError> for Error {
    fn from(err: VerifyAuthError) -> Self {
        let error_kind = match &err.error_kind {
            VerifyAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            VerifyAuthErrorKind::OAuth(_) => {
                DomainErrorKind::External(ExternalErrorKind::Other("OAuth error".to_string()))
            }
            VerifyAuthErrorKind::Store(_) => DomainErrorKind::Internal(InternalErrorKind::Store),
            VerifyAuthErrorKind::Signature(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
