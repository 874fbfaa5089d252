//! Webhook HTTP listener: one route per configured provider, plus a health
//! probe. Thin by design — all review logic lives in `reviewbot-pipeline`;
//! this crate owns HTTP framing, signature validation dispatch and response
//! shaping only.

mod error;
mod health;
mod router;
mod state;
mod webhook;

pub use error::AppError;
pub use router::router;
pub use state::AppState;
