//! Maps guard errors onto HTTP responses: `{ "error": "..." }` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use ff_domain::error::Error;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Transient(_) => StatusCode::BAD_GATEWAY,
            Error::Blocked(_) => StatusCode::FORBIDDEN,
            Error::Io(_) | Error::Json(_) | Error::Config(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (Error::NotFound("p".into()), StatusCode::NOT_FOUND),
            (Error::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::Auth("key".into()), StatusCode::UNAUTHORIZED),
            (Error::Transient("503".into()), StatusCode::BAD_GATEWAY),
            (Error::Other("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
