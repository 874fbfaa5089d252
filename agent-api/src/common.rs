use crate::types::TransportConfig;

/// Builds the shared `reqwest::Client` every vendor adapter wraps: one
/// connection pool per adapter, timeout and proxy from config.
pub fn build_http_client(cfg: &TransportConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .timeout(cfg.timeout)
        .user_agent(cfg.user_agent.clone());
    if let Some(proxy_url) = &cfg.proxy_url {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }
    builder.build()
}
