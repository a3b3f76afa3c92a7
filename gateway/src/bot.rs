use crate::bundle::ConfigBundle;
use async_trait::async_trait;
use hyper::body::Bytes;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Error value returned by the core, kept in its original JSON shape
    #[error("Bot core rejected the invocation: {0}")]
    Rejected(serde_json::Value),

    #[error("Bot core request failed: {0}")]
    Transport(String),

    #[error("Bot core invocation timed out")]
    Timeout,
}

/// The triggering request as the core sees it.
#[derive(Debug, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RequestSummary {
    pub fn new(parts: &http::request::Parts, body: &Bytes) -> Self {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        RequestSummary {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Inbound data handed to the core, as selected by the deployment's
/// invocation profile. Consumed at most once per request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorePayload {
    /// The whole triggering request.
    Request(RequestSummary),
    /// The request body parsed as JSON.
    Json(serde_json::Value),
}

/// Second invocation argument, per profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreAuth {
    /// Full credential bundle.
    Bundle(ConfigBundle),
    /// Bare shared token.
    Token(String),
}

/// Narrow seam to the external decision engine.
///
/// The gateway calls this exactly once per request and never retries;
/// any retry policy belongs on the other side of the seam.
#[async_trait]
pub trait BotCore: Send + Sync {
    async fn invoke(&self, payload: CorePayload, auth: CoreAuth) -> Result<String, CoreError>;
}

#[derive(Serialize)]
struct InvokeBody {
    payload: CorePayload,
    auth: CoreAuth,
}

/// Adapter that drives a bot core exposed over HTTP.
pub struct HttpBotCore {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl HttpBotCore {
    pub fn new(url: Url, timeout: Duration) -> Self {
        HttpBotCore {
            client: reqwest::Client::new(),
            url,
            timeout,
        }
    }
}

#[async_trait]
impl BotCore for HttpBotCore {
    async fn invoke(&self, payload: CorePayload, auth: CoreAuth) -> Result<String, CoreError> {
        let request = self
            .client
            .post(self.url.clone())
            .json(&InvokeBody { payload, auth })
            .send();

        let response = timeout(self.timeout, request)
            .await
            // First map_err: the deadline elapsed before the core answered
            .map_err(|_| CoreError::Timeout)?
            // Second map_err: connection failures, network errors, etc.
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        // A non-2xx body is the core's own error value; JSON shapes are
        // preserved as-is for the diagnostic event.
        let value =
            serde_json::from_str(&body).unwrap_or_else(|_| serde_json::Value::String(body));
        Err(CoreError::Rejected(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use serde_json::json;
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    async fn start_core_server(
        status: StatusCode,
        reply: &'static str,
        delay: Duration,
    ) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| async move {
                        // The adapter must send a JSON invocation body
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        serde_json::from_slice::<serde_json::Value>(&body).unwrap();

                        tokio::time::sleep(delay).await;
                        let mut response =
                            Response::new(Full::new(Bytes::from_static(reply.as_bytes())));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    fn test_invocation() -> (CorePayload, CoreAuth) {
        (
            CorePayload::Json(json!({"submission": "🦀"})),
            CoreAuth::Token("abc".to_string()),
        )
    }

    #[tokio::test]
    async fn test_success_returns_response_text() {
        let url = start_core_server(StatusCode::OK, "ran", Duration::ZERO).await;
        let core = HttpBotCore::new(url, Duration::from_secs(2));

        let (payload, auth) = test_invocation();
        assert_eq!(core.invoke(payload, auth).await.unwrap(), "ran");
    }

    #[tokio::test]
    async fn test_rejection_preserves_json_error_value() {
        let url =
            start_core_server(StatusCode::INTERNAL_SERVER_ERROR, r#"{"code":42}"#, Duration::ZERO)
                .await;
        let core = HttpBotCore::new(url, Duration::from_secs(2));

        let (payload, auth) = test_invocation();
        let error = core.invoke(payload, auth).await.unwrap_err();
        match error {
            CoreError::Rejected(value) => assert_eq!(value, json!({"code": 42})),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejection_wraps_non_json_bodies_as_strings() {
        let url =
            start_core_server(StatusCode::BAD_GATEWAY, "upstream exploded", Duration::ZERO).await;
        let core = HttpBotCore::new(url, Duration::from_secs(2));

        let (payload, auth) = test_invocation();
        let error = core.invoke(payload, auth).await.unwrap_err();
        match error {
            CoreError::Rejected(value) => assert_eq!(value, json!("upstream exploded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_core_times_out() {
        let url = start_core_server(StatusCode::OK, "late", Duration::from_secs(5)).await;
        let core = HttpBotCore::new(url, Duration::from_millis(100));

        let (payload, auth) = test_invocation();
        let error = core.invoke(payload, auth).await.unwrap_err();
        assert!(matches!(error, CoreError::Timeout));
    }
}
