//! Canned responses produced by the balancer itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// The uniform answer when no backend can serve a request.
pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Service not available").into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Failed to read request body").into_response()
}

pub fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_service_unavailable() {
        let response = service_unavailable();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Service not available");
    }
}
