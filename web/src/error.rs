use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{DomainErrorKind, Error as DomainError, ExternalErrorKind, VerificationErrorKind};

use crate::response::page;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Verification(kind) => match kind {
                VerificationErrorKind::MissingParameters
                | VerificationErrorKind::InvalidOrExpired
                | VerificationErrorKind::IdentityMismatch => StatusCode::BAD_REQUEST,
                VerificationErrorKind::ScopeNotFound | VerificationErrorKind::SubjectNotFound => {
                    StatusCode::NOT_FOUND
                }
                VerificationErrorKind::ExchangeFailed
                | VerificationErrorKind::IdentityFetchFailed => StatusCode::BAD_GATEWAY,
                VerificationErrorKind::RolesNotConfigured
                | VerificationErrorKind::TransitionFailed => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DomainErrorKind::External(ExternalErrorKind::Network) => StatusCode::BAD_GATEWAY,
            DomainErrorKind::External(ExternalErrorKind::Other(_))
            | DomainErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // What the member sees. Upstream detail stays in the logs.
    fn user_message(&self) -> &'static str {
        match self.0.verification_kind() {
            Some(VerificationErrorKind::MissingParameters) => "Missing parameters",
            Some(VerificationErrorKind::InvalidOrExpired) => {
                "Invalid or expired verification request"
            }
            Some(VerificationErrorKind::IdentityMismatch) => "User ID mismatch",
            Some(VerificationErrorKind::ScopeNotFound) => "Server not found",
            Some(VerificationErrorKind::SubjectNotFound) => "Member not found",
            _ => "An error occurred during verification",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Verification failed: {:?}", self.0);
        } else {
            debug!("Verification rejected: {:?}", self.0.error_kind);
        }
        (status, page::failure(self.user_message())).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::error::InternalErrorKind;

    fn verification(kind: VerificationErrorKind) -> Error {
        Error(DomainError::verification(kind))
    }

    #[test]
    fn test_verification_kinds_map_to_status_codes() {
        let cases = [
            (VerificationErrorKind::MissingParameters, StatusCode::BAD_REQUEST),
            (VerificationErrorKind::InvalidOrExpired, StatusCode::BAD_REQUEST),
            (VerificationErrorKind::IdentityMismatch, StatusCode::BAD_REQUEST),
            (VerificationErrorKind::ScopeNotFound, StatusCode::NOT_FOUND),
            (VerificationErrorKind::SubjectNotFound, StatusCode::NOT_FOUND),
            (VerificationErrorKind::ExchangeFailed, StatusCode::BAD_GATEWAY),
            (VerificationErrorKind::IdentityFetchFailed, StatusCode::BAD_GATEWAY),
            (VerificationErrorKind::RolesNotConfigured, StatusCode::INTERNAL_SERVER_ERROR),
            (VerificationErrorKind::TransitionFailed, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (kind, status) in cases {
            assert_eq!(verification(kind).status_code(), status, "{kind:?}");
        }
    }

    #[test]
    fn test_internal_errors_use_generic_message() {
        let err = Error(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "secret detail".to_string(),
            )),
        });

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "An error occurred during verification");
    }
}
