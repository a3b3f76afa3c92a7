use async_trait::async_trait;
use http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned status {0} for key {1}")]
    UnexpectedStatus(u16, String),
}

/// Read-only, string-keyed configuration store.
///
/// The backing store gives no freshness guarantee, so values are read
/// anew on every request and never cached across requests.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch one value. `None` means the key is not provisioned.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Client for the storage REST API the deployments keep their
/// credentials in (`GET {base}/values/{key}` with a bearer token).
pub struct HttpKvStore {
    client: reqwest::Client,
    base_url: Url,
    api_token: String,
}

impl HttpKvStore {
    pub fn new(base_url: Url, api_token: String, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpKvStore {
            client,
            base_url,
            api_token,
        })
    }
}

#[async_trait]
impl KvStore for HttpKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = format!(
            "{}/values/{}",
            self.base_url.as_str().trim_end_matches('/'),
            key,
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.text().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(StoreError::UnexpectedStatus(
                status.as_u16(),
                key.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    // Serves a fixed set of keys under /values/{key}, 404 otherwise.
    async fn start_store_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    let service = service_fn(|req: Request<Incoming>| async move {
                        let mut response = Response::new(Full::new(Bytes::new()));
                        match req.uri().path() {
                            "/values/token" => {
                                assert_eq!(
                                    req.headers().get("authorization").unwrap(),
                                    "Bearer api-secret"
                                );
                                *response.body_mut() = Full::new(Bytes::from_static(b"abc"));
                            }
                            "/values/broken" => {
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            }
                            _ => *response.status_mut() = StatusCode::NOT_FOUND,
                        }
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

    fn test_store(url: Url) -> HttpKvStore {
        HttpKvStore::new(url, "api-secret".to_string(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_value_for_present_key() {
        let store = test_store(start_store_server().await);
        assert_eq!(store.get("token").await.unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_get_returns_none_for_missing_key() {
        let store = test_store(start_store_server().await);
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_maps_server_errors() {
        let store = test_store(start_store_server().await);
        let error = store.get("broken").await.unwrap_err();
        assert!(matches!(error, StoreError::UnexpectedStatus(500, key) if key == "broken"));
    }
}
