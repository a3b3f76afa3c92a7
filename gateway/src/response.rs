//! Terminal response shaping.
//!
//! Status and headers are fixed constants: 200/`text/plain` for a
//! success, 500/`text/plain` for any failure. No content negotiation.

use crate::config::SuccessRender;
use crate::errors::GatewayError;
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;
use hyper::body::Bytes;
use shared::http::plain_text_response;

/// Render a successful core result per the deployment profile.
pub fn success_response(render: &SuccessRender, result: String) -> Response<Full<Bytes>> {
    let body = match render {
        SuccessRender::Echo => result,
        SuccessRender::Literal(text) => text.clone(),
    };
    plain_text_response(StatusCode::OK, body)
}

/// Render a pipeline failure as human-readable text. The error's own
/// rendering is all that reaches the caller; no internals leak.
pub fn failure_response(error: &GatewayError) -> Response<Full<Bytes>> {
    plain_text_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_echoes_result() {
        let response = success_response(&SuccessRender::Echo, "ran".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
    }

    #[test]
    fn test_success_literal_ignores_result() {
        let response =
            success_response(&SuccessRender::Literal("Success".to_string()), "ran".to_string());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_failure_is_a_plain_text_500() {
        let response = failure_response(&GatewayError::MissingKey("token"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "text/plain");
    }
}
