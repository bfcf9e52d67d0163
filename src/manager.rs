use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use log::{info, warn};
use crate::compiler::ProxyPayload;
use crate::controller::ProxyPolicyCompiler;
use crate::error::{Result, SwitchError};
use crate::profile::{ProfileDraft, ProxyProfile};
use crate::store::{ProfileStore, StoreState};

/// Result of restoring the previous session at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The stored active profile was re-applied
    Applied(String),
    /// Active id points at a profile that no longer exists
    Dangling(String),
    /// Nothing was active
    Direct,
}

/// Snapshot of what is currently selected
#[derive(Debug, Clone)]
pub struct Status {
    pub active: Option<ProxyProfile>,
    pub profiles: Vec<ProxyProfile>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.active {
            Some(p) => write!(f, "{} [{}]", p.name, p.policy_mode.label()),
            None => f.write_str("Direct connection"),
        }
    }
}

/// Owns profile CRUD, the active selection and start-up restore
pub struct ProfileManager {
    store: Arc<dyn ProfileStore>,
    compiler: ProxyPolicyCompiler,
}

impl ProfileManager {
    pub fn new(store: Arc<dyn ProfileStore>, compiler: ProxyPolicyCompiler) -> Self {
        Self { store, compiler }
    }

    pub fn compiler(&self) -> &ProxyPolicyCompiler {
        &self.compiler
    }

    /// Re-apply the profile that was active before the process stopped.
    /// A dangling active id is reported but left in the store.
    pub async fn restore(&self) -> Result<RestoreOutcome> {
        let state = self.store.load().await?;
        let Some(id) = state.active_proxy_id.clone() else {
            self.compiler.mark_inactive().await;
            return Ok(RestoreOutcome::Direct);
        };

        match state.find(&id) {
            Some(profile) => {
                self.compiler.apply(profile).await?;
                info!("Restored proxy profile {} ({})", profile.name, id);
                Ok(RestoreOutcome::Applied(id))
            }
            None => {
                warn!("Active profile {} no longer exists, staying direct", id);
                self.compiler.mark_inactive().await;
                Ok(RestoreOutcome::Dangling(id))
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<ProxyProfile>> {
        Ok(self.store.load().await?.proxies)
    }

    pub async fn get(&self, id: &str) -> Result<ProxyProfile> {
        let state = self.store.load().await?;
        state.find(id).cloned().ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))
    }

    pub async fn status(&self) -> Result<Status> {
        let state = self.store.load().await?;
        Ok(Status { active: state.active().cloned(), profiles: state.proxies })
    }

    pub async fn add(&self, draft: ProfileDraft) -> Result<ProxyProfile> {
        draft.validate()?;
        let mut state = self.store.load().await?;
        let profile = ProxyProfile::from_draft(next_id(&state), draft);
        state.proxies.push(profile.clone());
        self.store.save_profiles(&state.proxies).await?;
        info!("Added profile {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Replace the editable fields of `id`. Stored credentials survive a
    /// draft that carries none. An active profile is re-applied.
    pub async fn update(&self, id: &str, draft: ProfileDraft) -> Result<ProxyProfile> {
        draft.validate()?;
        let mut state = self.store.load().await?;
        let slot = state
            .proxies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))?;

        let mut updated = ProxyProfile::from_draft(id.to_string(), draft);
        if updated.username.is_none() {
            updated.username = slot.username.take();
            updated.password = slot.password.take();
        }
        *slot = updated.clone();
        self.store.save_profiles(&state.proxies).await?;
        info!("Updated profile {} ({})", updated.name, id);

        if state.active_proxy_id.as_deref() == Some(id) {
            self.compiler.apply(&updated).await?;
        }
        Ok(updated)
    }

    pub async fn remove(&self, id: &str) -> Result<ProxyProfile> {
        let mut state = self.store.load().await?;
        let index = state
            .proxies
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SwitchError::ProfileNotFound(id.to_string()))?;
        let removed = state.proxies.remove(index);
        self.store.save_profiles(&state.proxies).await?;
        info!("Removed profile {} ({})", removed.name, id);

        if state.active_proxy_id.as_deref() == Some(id) {
            self.deactivate().await?;
        }
        Ok(removed)
    }

    /// Apply `id` and record it as active. An unknown id changes nothing
    /// and yields `None`.
    pub async fn activate(&self, id: &str) -> Result<Option<ProxyPayload>> {
        let state = self.store.load().await?;
        let Some(profile) = state.find(id) else {
            warn!("Cannot activate unknown profile {}", id);
            return Ok(None);
        };
        let payload = self.compiler.apply(profile).await?;
        self.store.save_active(Some(id)).await?;
        Ok(Some(payload))
    }

    /// Switch to direct connection and clear the active selection
    pub async fn deactivate(&self) -> Result<()> {
        self.compiler.clear().await?;
        self.store.save_active(None).await
    }
}

/// Millisecond timestamp id, bumped until unique within `state`
fn next_id(state: &StoreState) -> String {
    let mut candidate = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    while state.find(&candidate.to_string()).is_some() {
        candidate += 1;
    }
    candidate.to_string()
}
