//! Rotating client identities for outbound scraping requests
//!
//! Each extraction attempt presents a user agent picked uniformly at random
//! from a fixed pool so consecutive requests are harder to correlate. The
//! choice has no effect on correctness.

use super::random_source::RandomSource;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0",
];

/// Request signature presented to the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: String,
    pub accept_language: String,
}

impl ClientIdentity {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }

    /// Shortened user agent for log lines
    pub fn short_label(&self) -> &str {
        let end = self
            .user_agent
            .char_indices()
            .nth(25)
            .map(|(i, _)| i)
            .unwrap_or(self.user_agent.len());
        &self.user_agent[..end]
    }
}

/// Fixed pool of identities with uniform random selection
#[derive(Clone)]
pub struct IdentityPool {
    identities: Vec<ClientIdentity>,
    random: RandomSource,
}

impl IdentityPool {
    /// Pool of common desktop browser signatures
    pub fn browsers(random: RandomSource) -> Self {
        Self::with_identities(
            USER_AGENTS.iter().map(|ua| ClientIdentity::new(*ua)).collect(),
            random,
        )
    }

    /// Custom pool; an empty list falls back to the browser pool
    pub fn with_identities(identities: Vec<ClientIdentity>, random: RandomSource) -> Self {
        let identities = if identities.is_empty() {
            USER_AGENTS.iter().map(|ua| ClientIdentity::new(*ua)).collect()
        } else {
            identities
        };
        Self { identities, random }
    }

    /// Pick the identity for the next attempt
    pub fn next(&self) -> ClientIdentity {
        let idx = self.random.index(self.identities.len());
        self.identities[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
