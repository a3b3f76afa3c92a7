//! The request-to-response pipeline.
//!
//! Per request: resolve the deployment's credential bundle (all store
//! reads concurrent, joined before going further), invoke the bot core
//! exactly once, and translate the outcome. On a failure the diagnostic
//! event is delivered and awaited before the response is built, so
//! delivery never races the hosting environment's teardown.

use crate::bot::{BotCore, CoreAuth, CorePayload, RequestSummary};
use crate::bundle::{self, ConfigBundle, keys};
use crate::config::{AuthMode, PayloadMode, Profile};
use crate::errors::{GatewayError, Result};
use crate::metrics_defs::{
    REQUEST_DURATION, REQUEST_FAILURES, REQUESTS, TELEMETRY_DELIVERY_FAILURES,
};
use crate::response::{failure_response, success_response};
use crate::store::KvStore;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use shared::{counter, histogram};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{ProjectCredentials, Reporter};

/// One gateway deployment: the configuration store, the core seam, the
/// telemetry reporter, and the invocation profile. Shared across all
/// request tasks; holds no per-request state.
pub struct Gateway {
    store: Arc<dyn KvStore>,
    core: Arc<dyn BotCore>,
    reporter: Reporter,
    profile: Profile,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn KvStore>,
        core: Arc<dyn BotCore>,
        reporter: Reporter,
        profile: Profile,
    ) -> Self {
        Gateway {
            store,
            core,
            reporter,
            profile,
        }
    }

    /// Drive one request to its terminal response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let started = Instant::now();
        counter!(REQUESTS).increment(1);

        let response = match self.run(req).await {
            Ok(result) => success_response(&self.profile.success, result),
            Err(error) => {
                counter!(REQUEST_FAILURES).increment(1);
                tracing::warn!(error = %error, "request failed");
                self.report(&error).await;
                failure_response(&error)
            }
        };

        histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
        response
    }

    /// Resolve the bundle and invoke the core once.
    async fn run<B>(&self, req: Request<B>) -> Result<String>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| GatewayError::RequestBody(e.to_string()))?
            .to_bytes();

        let bundle = bundle::resolve(self.profile.bundle, self.store.as_ref()).await?;
        let payload = extract_payload(self.profile.payload, &parts, body)?;
        let auth = select_auth(self.profile.auth, bundle);

        Ok(self.core.invoke(payload, auth).await?)
    }

    /// Deliver the diagnostic event for a failed request. Absorbs its
    /// own failures: reporting never produces a second event and never
    /// changes the response.
    async fn report(&self, error: &GatewayError) {
        let credentials = match tokio::try_join!(
            self.store.get(keys::SENTRY_PROJECT_ID),
            self.store.get(keys::SENTRY_KEY),
        ) {
            Ok((Some(project_id), Some(key))) => ProjectCredentials { project_id, key },
            Ok(_) | Err(_) => {
                counter!(TELEMETRY_DELIVERY_FAILURES).increment(1);
                tracing::warn!("telemetry credentials unavailable, diagnostic event dropped");
                return;
            }
        };

        if let Err(delivery) = self
            .reporter
            .send(&credentials, error.event_message())
            .await
        {
            counter!(TELEMETRY_DELIVERY_FAILURES).increment(1);
            tracing::warn!(error = %delivery, "diagnostic event delivery failed");
        }
    }
}

fn extract_payload(
    mode: PayloadMode,
    parts: &http::request::Parts,
    body: Bytes,
) -> Result<CorePayload> {
    match mode {
        PayloadMode::FullRequest => Ok(CorePayload::Request(RequestSummary::new(parts, &body))),
        PayloadMode::JsonBody => {
            let value =
                serde_json::from_slice(&body).map_err(|e| GatewayError::RequestJson(e.to_string()))?;
            Ok(CorePayload::Json(value))
        }
    }
}

fn select_auth(mode: AuthMode, bundle: ConfigBundle) -> CoreAuth {
    match (mode, bundle) {
        (AuthMode::Token, ConfigBundle::Shared(shared)) => CoreAuth::Token(shared.token),
        (_, bundle) => CoreAuth::Bundle(bundle),
    }
}

/// Hyper entry point. Infallible by construction: the triggering
/// platform always gets exactly one response.
#[derive(Clone)]
pub struct GatewayService {
    gateway: Arc<Gateway>,
}

impl GatewayService {
    pub fn new(gateway: Gateway) -> Self {
        GatewayService {
            gateway: Arc::new(gateway),
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let gateway = self.gateway.clone();
        Box::pin(async move { Ok(gateway.handle(req).await) })
    }
}
