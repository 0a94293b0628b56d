use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snafu::{Location, Snafu};

use crate::auth::AuthError;
use crate::database::DatabaseQueryError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// What a visitor sees when the backend fails. Details only go to the log.
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WebError {
    #[snafu(display("the database request failed"), context(false))]
    Database {
        source: DatabaseQueryError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the upload could not be stored"), context(false))]
    Storage {
        source: StorageError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not sign in"), context(false))]
    SignIn {
        source: AuthError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the session could not be read or written"), context(false))]
    Session {
        source: SessionError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the submitted form could not be read"), context(false))]
    Multipart {
        source: MultipartError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{what} not found"))]
    NotFound { what: String },

    #[snafu(display("You do not have permission to view this page."))]
    Forbidden,

    #[snafu(display("You need to sign in first."))]
    Unauthenticated,

    #[snafu(display("Please select an image."))]
    MissingImage,

    #[snafu(display("`{field}` is invalid: {reason}"))]
    InvalidField { field: String, reason: String },
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Database { .. } | WebError::Storage { .. } | WebError::Session { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebError::SignIn {
                source: AuthError::Register { .. },
                ..
            } => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::SignIn { .. } | WebError::Unauthenticated => StatusCode::UNAUTHORIZED,
            WebError::Multipart { .. } | WebError::MissingImage | WebError::InvalidField { .. } => {
                StatusCode::BAD_REQUEST
            }
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// The message shown to the visitor.
    pub fn message(&self) -> String {
        if self.status().is_server_error() {
            GENERIC_FAILURE.to_string()
        } else {
            self.to_string()
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            _ if self.status().is_server_error() => "internal",
            WebError::SignIn { .. } => "sign_in",
            WebError::Multipart { .. } | WebError::InvalidField { .. } => "invalid_form",
            WebError::MissingImage => "missing_image",
            WebError::NotFound { .. } => "not_found",
            WebError::Forbidden => "forbidden",
            WebError::Unauthenticated => "unauthenticated",
            WebError::Database { .. } | WebError::Storage { .. } | WebError::Session { .. } => "internal",
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "{self}");
        } else {
            tracing::debug!(error = ?self, %status, "rejected request");
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status();
        let page = format!(
            "<!doctype html><html><head><title>{code}</title></head><body><main><h1>{code}</h1><p>{message}</p><p><a href=\"/\">Back home</a></p></main></body></html>",
            code = status,
            message = tera::escape_html(&self.message()),
        );

        (status, Html(page)).into_response()
    }
}

/// A [WebError] reported as JSON, for endpoints called from scripts.
#[derive(Debug)]
pub struct ApiError(pub WebError);

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(error) = self;
        error.log();

        let body = ApiErrorBody {
            error: error.kind(),
            message: error.message(),
        };

        (error.status(), Json(body)).into_response()
    }
}

impl From<WebError> for ApiError {
    fn from(error: WebError) -> Self {
        ApiError(error)
    }
}

impl From<DatabaseQueryError> for ApiError {
    fn from(error: DatabaseQueryError) -> Self {
        ApiError(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_hide_their_details() {
        let error: WebError = crate::database::query::NoResultsSnafu.build().into();

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), GENERIC_FAILURE);
    }

    #[test]
    fn client_errors_explain_themselves() {
        assert_eq!(WebError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            WebError::Forbidden.message(),
            "You do not have permission to view this page."
        );
        assert_eq!(
            NotFoundSnafu { what: "project" }.build().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(WebError::MissingImage.status(), StatusCode::BAD_REQUEST);
    }
}
