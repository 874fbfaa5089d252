use std::time::Duration;

/// Tunables the pipeline reads once at startup from configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded-concurrency worker pool size for `review_code` tasks.
    pub max_concurrency: usize,
    /// Per-agent-call timeout.
    pub agent_timeout: Duration,
    /// Per-pipeline-run timeout; on expiry the run is marked `Failed` and
    /// whatever partial results exist are still posted.
    pub run_timeout: Duration,
    /// Self-imposed cap on pages walked by any provider list/update call.
    pub max_page_count: u32,
    /// How long the admission gate pauses after a `RateLimited` response.
    pub rate_limit_wait: Duration,
    /// Number of retries for errors classified transient.
    pub max_retries: u32,
    /// Backoff between retries of a transient error.
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            agent_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(600),
            max_page_count: 50,
            rate_limit_wait: Duration::from_secs(30),
            max_retries: 5,
            retry_delay: Duration::from_secs(5),
        }
    }
}
