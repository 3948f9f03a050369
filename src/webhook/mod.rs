//! Webhook verification and dispatch
//!
//! Inbound webhook handling shared by every provider adapter:
//!
//! - [`SignatureScheme`]: per-provider signing strategies, all verified
//!   with constant-time comparison
//! - [`WebhookDispatcher`]: verify, parse, extract, and fan out to
//!   registered handlers with per-handler error isolation
//! - [`router`]: axum mount point translating HTTP requests into the
//!   framework-neutral request/response types
//!
//! The dispatcher never persists anything; delivery ids are attached to
//! events for adapter-side deduplication.

mod dispatcher;
mod server;
mod signature;

pub use dispatcher::{
    EventDescriptor, HandlerId, WebhookDispatcher, WebhookEvent, WebhookHandler, WebhookRequest,
    WebhookResponse,
};
pub use server::router;
pub use signature::{verify, SignatureScheme};
