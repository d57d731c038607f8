//! Slack request signature middleware for Actix Web.
//!
//! Slack signs every request it sends with the app's signing secret. The signature is an HMAC-SHA256 over
//! `v0:<timestamp>:<body>`, sent in the `X-Slack-Signature` header along with the timestamp in
//! `X-Slack-Request-Timestamp`. Requests with missing headers are rejected with 400, and requests with a bad or stale
//! signature with 401.
//!
//! Wrap every route that Slack calls with this middleware.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorUnauthorized},
    web,
    Error,
};
use bolt_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::helpers::{verify_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub struct SlackSignatureFactory {
    signing_secret: Secret<String>,
    // If false, then the middleware lets every request through unchecked
    enabled: bool,
}

impl SlackSignatureFactory {
    pub fn new(signing_secret: Secret<String>, enabled: bool) -> Self {
        SlackSignatureFactory { signing_secret, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SlackSignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SlackSignatureService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SlackSignatureService {
            signing_secret: self.signing_secret.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SlackSignatureService<S> {
    signing_secret: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SlackSignatureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.signing_secret.reveal().clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let timestamp = header_value(&req, TIMESTAMP_HEADER).ok_or_else(|| {
                warn!("🔐️ No request timestamp found in request. Denying access.");
                ErrorBadRequest("No request timestamp found.")
            })?;
            let signature = header_value(&req, SIGNATURE_HEADER).ok_or_else(|| {
                warn!("🔐️ No Slack signature found in request. Denying access.");
                ErrorBadRequest("No signature found.")
            })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let now = chrono::Utc::now().timestamp();
            match verify_signature(&secret, &timestamp, &signature, data.as_ref(), now) {
                Ok(()) => {
                    trace!("🔐️ Signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Rejecting request to {}. {e}", req.path());
                    Err(ErrorUnauthorized("Invalid request signature."))
                },
            }
        })
    }
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
