//! Shared application state handed to every route.

use std::sync::Arc;

use reviewbot_pipeline::{MrStateTable, ReviewRunner};
use reviewbot_provider::ProviderKind;

/// Everything a webhook handler needs to validate, classify and dispatch an
/// incoming event. One `AppState` serves exactly one configured provider;
/// the `:provider` path segment is checked against `provider_kind` rather
/// than used to pick between several live provider clients.
#[derive(Clone)]
pub struct AppState {
    pub provider_kind: ProviderKind,
    pub webhook_secret: Option<Arc<str>>,
    pub bot_username: Arc<str>,
    pub runner: Arc<ReviewRunner>,
    pub table: Arc<MrStateTable>,
    /// When set, the webhook handler awaits the review run to completion and
    /// reports its outcome in the response body instead of enqueuing it in
    /// the background. Mirrors the `agent.is_test` configuration flag so
    /// integration tests observe a deterministic result synchronously.
    pub synchronous: bool,
}

impl AppState {
    pub fn new(
        provider_kind: ProviderKind,
        webhook_secret: Option<String>,
        bot_username: impl Into<Arc<str>>,
        runner: Arc<ReviewRunner>,
        table: Arc<MrStateTable>,
        synchronous: bool,
    ) -> Self {
        Self {
            provider_kind,
            webhook_secret: webhook_secret.map(Arc::from),
            bot_username: bot_username.into(),
            runner,
            table,
            synchronous,
        }
    }
}
