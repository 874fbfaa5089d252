use reviewbot_model::MergeRequestState;

/// Which vendor a `ProviderClient` talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitLab,
    GitHub,
    Bitbucket,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::GitLab => "gitlab",
            ProviderKind::GitHub => "github",
            ProviderKind::Bitbucket => "bitbucket",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "gitlab" => Some(ProviderKind::GitLab),
            "github" => Some(ProviderKind::GitHub),
            "bitbucket" => Some(ProviderKind::Bitbucket),
            _ => None,
        }
    }
}

/// Runtime configuration for a concrete provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base, e.g. "https://gitlab.com/api/v4" or "https://api.github.com".
    pub base_api: String,
    /// Access token for the provider (PAT or app token).
    pub token: String,
    /// Webhook shared secret; `None` skips signature validation.
    pub webhook_secret: Option<String>,
    /// Username the bot authenticates as, used to filter out its own events
    /// and to recognize reviewer-added-bot-as-reviewer events.
    pub bot_username: String,
}

/// Filter for `list_merge_requests`.
#[derive(Debug, Clone, Default)]
pub struct MergeRequestFilter {
    pub state: Option<MergeRequestState>,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub author: Option<String>,
}

/// Self-imposed bound on pagination: a single list/update call never walks
/// more pages than this, regardless of how many the vendor reports.
pub const PAGE_CAP: u32 = 20;
