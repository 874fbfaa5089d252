//! Vendor HTTP transports for Gemini, OpenAI and Claude, behind one
//! `AgentApiClient::call(ApiRequest) -> ApiResponse` interface.
//!
//! Polymorphism over vendors is a tagged enum, not a trait object: the three
//! adapters differ enough in wire shape that a trait would either leak vendor
//! details through its signature or force a lossy common subset.

mod claude;
mod client;
mod common;
mod errors;
mod gemini;
mod openai;
mod types;

pub use client::AgentApiClient;
pub use errors::AgentApiError;
pub use types::{ApiRequest, ApiResponse, ResponseType, TransportConfig, Vendor};
