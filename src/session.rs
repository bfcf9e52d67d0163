use std::sync::Arc;
use log::debug;
use tokio::sync::RwLock;
use crate::indicator::Badge;
use crate::profile::Credentials;

/// Process-wide volatile state: the auth session and the current badge.
/// Shared by handle between the compiler and the challenge responder.
#[derive(Default)]
pub struct SessionContext {
    auth: RwLock<Option<Credentials>>,
    badge: RwLock<Badge>,
}

impl SessionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn credentials(&self) -> Option<Credentials> {
        self.auth.read().await.clone()
    }

    /// Replace the auth session, returning the previous one
    pub async fn replace_credentials(&self, creds: Option<Credentials>) -> Option<Credentials> {
        std::mem::replace(&mut *self.auth.write().await, creds)
    }

    pub async fn badge(&self) -> Badge {
        *self.badge.read().await
    }

    pub(crate) async fn set_badge(&self, badge: Badge) {
        *self.badge.write().await = badge;
    }
}

/// Authentication challenge raised by the host network layer
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    /// Set when the challenge comes from the proxy rather than the origin
    pub is_proxy: bool,
    pub host: String,
    pub realm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeResponse {
    Credentials(Credentials),
    /// Let the host apply its own policy
    Decline,
}

/// Answers proxy auth challenges from the current auth session
#[derive(Clone)]
pub struct CredentialResponder {
    ctx: Arc<SessionContext>,
}

impl CredentialResponder {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }

    pub async fn respond(&self, challenge: &AuthChallenge) -> ChallengeResponse {
        if !challenge.is_proxy {
            return ChallengeResponse::Decline;
        }
        match self.ctx.credentials().await {
            Some(creds) => {
                debug!(
                    "Answering proxy challenge from {} (realm {})",
                    challenge.host,
                    challenge.realm.as_deref().unwrap_or("-")
                );
                ChallengeResponse::Credentials(creds)
            }
            None => ChallengeResponse::Decline,
        }
    }
}
