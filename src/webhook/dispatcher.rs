//! Webhook verification and dispatch
//!
//! One dispatcher per provider instance. An inbound request moves through
//! verification, payload parse, event extraction, and handler fan-out; every
//! outcome maps to a terse HTTP response. Handler failures are isolated: a
//! failing handler is logged and never affects other handlers or the
//! response, since the remote sender would otherwise retry-storm on a 5xx.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::signature::{verify, SignatureScheme};
use crate::Result;

/// Header names searched, in order, for a delivery identifier
const DELIVERY_ID_HEADERS: [&str; 3] = ["x-delivery-id", "x-webhook-delivery-id", "x-request-id"];

/// Header carrying the handshake secret
const HOOK_SECRET_HEADER: &str = "x-hook-secret";

/// Inbound webhook request, decoupled from any HTTP framework
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Raw request body
    pub body: String,
    /// Request headers; names are matched case-insensitively
    pub headers: HashMap<String, String>,
}

impl WebhookRequest {
    /// Create a request from a body and headers
    pub fn new(body: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            body: body.into(),
            headers,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response produced by [`WebhookDispatcher::handle_request`]
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl WebhookResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            headers: HashMap::new(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }).to_string(),
            headers: HashMap::new(),
        }
    }

    fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A verified, parsed webhook delivery
///
/// Created once per request and handed to every matching handler. The
/// delivery id supports adapter-side deduplication; the core itself does
/// not deduplicate.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: String,
    pub action: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Provider instance this event arrived on
    pub source: String,
    pub resource_type: String,
    pub resource_id: String,
    pub payload: Value,
    pub signature: Option<String>,
    pub delivery_id: Option<String>,
}

/// Event identity extracted from a parsed payload
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub event_type: String,
    pub action: Option<String>,
    pub resource_type: String,
    pub resource_id: String,
}

type EventExtractor = dyn Fn(&Value, &WebhookRequest) -> Result<EventDescriptor> + Send + Sync;

/// Handler invoked for matching webhook events
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Process one event; errors are logged and isolated per handler
    async fn handle(&self, event: WebhookEvent) -> Result<()>;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, event: WebhookEvent) -> Result<()> {
        (self.f)(event).await
    }
}

/// Token returned by [`WebhookDispatcher::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

struct Registration {
    id: u64,
    event_type: String,
    handler: Arc<dyn WebhookHandler>,
}

/// Verifies, parses, and fans out webhook deliveries for one provider
pub struct WebhookDispatcher {
    provider: String,
    secret: String,
    scheme: SignatureScheme,
    signature_header: String,
    challenge_field: Option<String>,
    extractor: Box<EventExtractor>,
    handlers: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl WebhookDispatcher {
    /// Create a dispatcher for one provider instance
    ///
    /// The extractor pulls the event type and resource identity out of a
    /// parsed payload; its shape is provider-specific and supplied by the
    /// adapter.
    pub fn new<E>(
        provider: impl Into<String>,
        secret: impl Into<String>,
        scheme: SignatureScheme,
        extractor: E,
    ) -> Self
    where
        E: Fn(&Value, &WebhookRequest) -> Result<EventDescriptor> + Send + Sync + 'static,
    {
        let signature_header = scheme.default_header().to_string();
        Self {
            provider: provider.into(),
            secret: secret.into(),
            scheme,
            signature_header,
            challenge_field: None,
            extractor: Box::new(extractor),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Override the header the signature is read from
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    /// Enable URL-verification challenge echo on the named payload field
    pub fn with_challenge_field(mut self, field: impl Into<String>) -> Self {
        self.challenge_field = Some(field.into());
        self
    }

    /// The provider instance this dispatcher serves
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Register a handler for an event type, or `"*"` for all events
    pub fn on<H>(&self, event_type: impl Into<String>, handler: H) -> HandlerId
    where
        H: WebhookHandler + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            id,
            event_type: event_type.into(),
            handler: Arc::new(handler),
        };
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.push(registration);
        HandlerId(id)
    }

    /// Register an async closure for an event type, or `"*"` for all events
    pub fn on_fn<F, Fut>(&self, event_type: impl Into<String>, f: F) -> HandlerId
    where
        F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on(event_type, FnHandler { f })
    }

    /// Remove a handler; returns whether it was registered
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = handlers.len();
        handlers.retain(|r| r.id != id.0);
        handlers.len() != before
    }

    /// Verify a signature against the raw body using this dispatcher's
    /// scheme and secret
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        verify(&self.scheme, &self.secret, body, signature)
    }

    /// Run one inbound request through verify, parse, and dispatch
    pub async fn handle_request(&self, request: &WebhookRequest) -> WebhookResponse {
        // Handshake: first contact carries the secret header and no body.
        if self.scheme == SignatureScheme::HookSecret {
            if let Some(token) = request.header(HOOK_SECRET_HEADER) {
                if request.body.trim().is_empty() {
                    debug!(provider = %self.provider, "Webhook handshake, echoing secret");
                    return WebhookResponse::ok(json!({ "ok": true }))
                        .with_header("X-Hook-Secret", token);
                }
            }
        }

        if self.scheme != SignatureScheme::None {
            let verified = match request.header(&self.signature_header) {
                Some(signature) => self.verify(request.body.as_bytes(), signature),
                None => false,
            };
            if !verified {
                warn!(provider = %self.provider, "Webhook signature rejected");
                return WebhookResponse::error(401, "invalid signature");
            }
        }

        let payload: Value = match serde_json::from_str(&request.body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "Malformed webhook payload");
                return WebhookResponse::error(400, "malformed payload");
            }
        };

        // URL-verification challenge: echo the token, skip dispatch.
        if let Some(ref field) = self.challenge_field {
            if let Some(token) = payload.get(field).and_then(Value::as_str) {
                debug!(provider = %self.provider, "Echoing webhook challenge");
                let mut body = Map::new();
                body.insert(field.clone(), json!(token));
                return WebhookResponse::ok(Value::Object(body));
            }
        }

        let descriptor = match (self.extractor)(&payload, request) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "Webhook event extraction failed");
                return WebhookResponse::error(500, "event extraction failed");
            }
        };

        let event = WebhookEvent {
            event_type: descriptor.event_type,
            action: descriptor.action,
            timestamp: Utc::now(),
            source: self.provider.clone(),
            resource_type: descriptor.resource_type,
            resource_id: descriptor.resource_id,
            payload,
            signature: request
                .header(&self.signature_header)
                .map(str::to_string),
            delivery_id: DELIVERY_ID_HEADERS
                .iter()
                .find_map(|name| request.header(name))
                .map(str::to_string),
        };

        let handled = self.dispatch(event).await;
        WebhookResponse::ok(json!({ "ok": true, "handlers": handled }))
    }

    /// Invoke all exact-type and wildcard handlers for one event
    ///
    /// All handlers complete before the response is produced; per-handler
    /// errors are logged and do not propagate.
    async fn dispatch(&self, event: WebhookEvent) -> usize {
        let matching: Vec<(u64, Arc<dyn WebhookHandler>)> = {
            let handlers = match self.handlers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            handlers
                .iter()
                .filter(|r| r.event_type == "*" || r.event_type == event.event_type)
                .map(|r| (r.id, Arc::clone(&r.handler)))
                .collect()
        };

        let invocations = matching.into_iter().map(|(id, handler)| {
            let event = event.clone();
            async move { (id, handler.handle(event).await) }
        });
        let results = join_all(invocations).await;

        let mut handled = 0;
        for (id, result) in results {
            match result {
                Ok(()) => handled += 1,
                Err(e) => {
                    warn!(
                        provider = %self.provider,
                        handler_id = id,
                        event_type = %event.event_type,
                        error = %e,
                        "Webhook handler failed"
                    );
                }
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskWeaveError;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::sync::atomic::AtomicUsize;

    fn sign_hex(secret: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn dispatcher(scheme: SignatureScheme) -> WebhookDispatcher {
        WebhookDispatcher::new("acme-tracker", "s3cret", scheme, |payload, _request| {
            let event_type = payload
                .get("event")
                .and_then(Value::as_str)
                .ok_or_else(|| TaskWeaveError::PayloadMalformed("no event field".to_string()))?;
            Ok(EventDescriptor {
                event_type: event_type.to_string(),
                action: payload
                    .get("action")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                resource_type: "task".to_string(),
                resource_id: payload
                    .get("task_id")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            })
        })
    }

    fn signed_request(body: &str) -> WebhookRequest {
        let mut headers = HashMap::new();
        headers.insert("X-Hub-Signature-256".to_string(), sign_hex("s3cret", body));
        WebhookRequest::new(body, headers)
    }

    #[tokio::test]
    async fn test_valid_delivery_dispatches() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        d.on_fn("task.updated", move |event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                assert_eq!(event.source, "acme-tracker");
                assert_eq!(event.resource_id, "T-1");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let body = r#"{"event":"task.updated","task_id":"T-1"}"#;
        let response = d.handle_request(&signed_request(body)).await;

        assert_eq!(response.status, 200);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_with_401() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        d.on_fn("*", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let mut headers = HashMap::new();
        headers.insert("X-Hub-Signature-256".to_string(), "deadbeef".to_string());
        let request = WebhookRequest::new(r#"{"event":"task.updated"}"#, headers);

        let response = d.handle_request(&request).await;
        assert_eq!(response.status, 401);
        assert!(response.body.contains("invalid signature"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let request = WebhookRequest::new(r#"{"event":"x"}"#, HashMap::new());
        assert_eq!(d.handle_request(&request).await.status, 401);
    }

    #[tokio::test]
    async fn test_malformed_payload_rejected_with_400() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let response = d.handle_request(&signed_request("{not json")).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn test_extraction_failure_maps_to_500() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        // Valid JSON, but no "event" field for the extractor.
        let response = d
            .handle_request(&signed_request(r#"{"unexpected":true}"#))
            .await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_handshake_echoes_secret_without_dispatch() {
        let d = dispatcher(SignatureScheme::HookSecret);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        d.on_fn("*", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let mut headers = HashMap::new();
        headers.insert("x-hook-secret".to_string(), "abc123".to_string());
        let request = WebhookRequest::new("", headers);

        let response = d.handle_request(&request).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("X-Hook-Secret").unwrap(), "abc123");
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hook_secret_verifies_after_handshake() {
        let d = dispatcher(SignatureScheme::HookSecret);
        let body = r#"{"event":"task.created","task_id":"T-9"}"#;

        let mut headers = HashMap::new();
        headers.insert("X-Hook-Signature".to_string(), sign_hex("s3cret", body));
        let response = d
            .handle_request(&WebhookRequest::new(body, headers))
            .await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_challenge_echo_skips_dispatch() {
        let d = dispatcher(SignatureScheme::None).with_challenge_field("challenge");
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        d.on_fn("*", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let request = WebhookRequest::new(r#"{"challenge":"tok-55"}"#, HashMap::new());
        let response = d.handle_request(&request).await;

        assert_eq!(response.status, 200);
        assert!(response.body.contains("tok-55"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let seen = Arc::new(AtomicUsize::new(0));

        d.on_fn("task.updated", |_event| async {
            Err(TaskWeaveError::Handler("boom".to_string()))
        });
        let seen_clone = Arc::clone(&seen);
        d.on_fn("task.updated", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let body = r#"{"event":"task.updated","task_id":"T-2"}"#;
        let response = d.handle_request(&signed_request(body)).await;

        assert_eq!(response.status, 200);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wildcard_and_exact_handlers_both_run() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let seen = Arc::new(AtomicUsize::new(0));

        for pattern in ["task.updated", "*"] {
            let seen_clone = Arc::clone(&seen);
            d.on_fn(pattern, move |_event| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }
        // Registered for a different event; must not run.
        let seen_clone = Arc::clone(&seen);
        d.on_fn("task.deleted", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(100, Ordering::SeqCst);
                Ok(())
            }
        });

        let body = r#"{"event":"task.updated","task_id":"T-3"}"#;
        d.handle_request(&signed_request(body)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_off_unsubscribes() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        let id = d.on_fn("task.updated", move |_event| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        assert!(d.off(id));
        assert!(!d.off(id));

        let body = r#"{"event":"task.updated","task_id":"T-4"}"#;
        d.handle_request(&signed_request(body)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delivery_id_extracted_case_insensitively() {
        let d = dispatcher(SignatureScheme::HmacSha256);
        let captured = Arc::new(std::sync::Mutex::new(None));

        let captured_clone = Arc::clone(&captured);
        d.on_fn("task.updated", move |event| {
            let captured = Arc::clone(&captured_clone);
            async move {
                *captured.lock().unwrap() = event.delivery_id.clone();
                Ok(())
            }
        });

        let body = r#"{"event":"task.updated","task_id":"T-5"}"#;
        let mut request = signed_request(body);
        request
            .headers
            .insert("X-Webhook-Delivery-Id".to_string(), "d-777".to_string());

        d.handle_request(&request).await;
        assert_eq!(captured.lock().unwrap().as_deref(), Some("d-777"));
    }
}
